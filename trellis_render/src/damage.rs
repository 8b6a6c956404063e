// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Output damage of one composed frame.

use kurbo::Rect;
use trellis_core::region::Region;

/// The part of the output surface that changed in a frame.
///
/// Hosts use this to present only what changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FrameDamage {
    /// The entire surface was repainted.
    #[default]
    Full,
    /// Only these rectangles, in surface pixels, were repainted. They may
    /// overlap.
    Rects(Vec<Rect>),
    /// Nothing changed; the previous frame is still current.
    None,
}

impl FrameDamage {
    /// Damage covering `region`, or [`FrameDamage::None`] if it is empty.
    #[must_use]
    pub fn from_region(region: &Region) -> Self {
        if region.is_empty() {
            Self::None
        } else {
            Self::Rects(region.rects().to_vec())
        }
    }

    /// Returns `true` if nothing needs presenting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` if the whole surface changed.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// The changed rectangles, with [`FrameDamage::Full`] expanded to
    /// `bounds`.
    #[must_use]
    pub fn rects(&self, bounds: Rect) -> Vec<Rect> {
        match self {
            Self::Full => vec![bounds],
            Self::Rects(rects) => rects.clone(),
            Self::None => Vec::new(),
        }
    }

    /// Accumulates damage of a later frame, for hosts that skip presenting
    /// some frames.
    pub fn merge(&mut self, other: &Self) {
        match (&mut *self, other) {
            (Self::Full, _) | (_, Self::None) => {}
            (_, Self::Full) => *self = Self::Full,
            (Self::None, _) => *self = other.clone(),
            (Self::Rects(a), Self::Rects(b)) => a.extend_from_slice(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_promotes_to_full() {
        let mut d = FrameDamage::None;
        d.merge(&FrameDamage::Rects(vec![Rect::new(0.0, 0.0, 1.0, 1.0)]));
        d.merge(&FrameDamage::Rects(vec![Rect::new(5.0, 5.0, 6.0, 6.0)]));
        assert_eq!(d.rects(Rect::ZERO).len(), 2);
        d.merge(&FrameDamage::None);
        assert!(!d.is_full());
        d.merge(&FrameDamage::Full);
        assert!(d.is_full());
        d.merge(&FrameDamage::Rects(vec![Rect::new(0.0, 0.0, 1.0, 1.0)]));
        assert!(d.is_full());
    }

    #[test]
    fn empty_region_is_no_damage() {
        assert!(FrameDamage::from_region(&Region::new()).is_empty());
        let full = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(FrameDamage::Full.rects(full), vec![full]);
    }
}
