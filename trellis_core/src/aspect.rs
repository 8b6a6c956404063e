// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout aspects: the unit of layout work.
//!
//! Each node's slot is computed one aspect at a time. [`AspectMask`] is the
//! bit set used for "which aspects are queued for this node" and for
//! registration requests.

use core::fmt;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not, Sub, SubAssign};

/// One component of a node's layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayoutAspect {
    /// Horizontal position inside the parent's client rectangle.
    X,
    /// Vertical position inside the parent's client rectangle.
    Y,
    /// Slot width.
    Width,
    /// Slot height.
    Height,
    /// Positions of children, for containers that arrange them.
    ArrangeChildren,
}

impl LayoutAspect {
    /// Enqueue order used when a mask expands into queue items.
    pub const ENQUEUE_ORDER: [Self; 5] = [
        Self::Width,
        Self::Height,
        Self::X,
        Self::Y,
        Self::ArrangeChildren,
    ];

    /// Short lowercase name, for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Width => "width",
            Self::Height => "height",
            Self::ArrangeChildren => "arrange",
        }
    }
}

/// A set of [`LayoutAspect`]s.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AspectMask(u8);

impl AspectMask {
    /// No aspects.
    pub const NONE: Self = Self(0);
    /// [`LayoutAspect::X`].
    pub const X: Self = Self(1 << 0);
    /// [`LayoutAspect::Y`].
    pub const Y: Self = Self(1 << 1);
    /// [`LayoutAspect::Width`].
    pub const WIDTH: Self = Self(1 << 2);
    /// [`LayoutAspect::Height`].
    pub const HEIGHT: Self = Self(1 << 3);
    /// [`LayoutAspect::ArrangeChildren`].
    pub const ARRANGE_CHILDREN: Self = Self(1 << 4);
    /// `X | Y`.
    pub const POSITIONING: Self = Self(Self::X.0 | Self::Y.0);
    /// `Width | Height`.
    pub const SIZING: Self = Self(Self::WIDTH.0 | Self::HEIGHT.0);
    /// Every aspect.
    pub const ALL: Self = Self(Self::POSITIONING.0 | Self::SIZING.0 | Self::ARRANGE_CHILDREN.0);

    /// Returns `true` if no aspect is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every aspect of `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `aspect` is set.
    #[inline]
    #[must_use]
    pub const fn has(self, aspect: LayoutAspect) -> bool {
        self.contains(Self::of(aspect))
    }

    /// The single-aspect mask for `aspect`.
    #[inline]
    #[must_use]
    pub const fn of(aspect: LayoutAspect) -> Self {
        match aspect {
            LayoutAspect::X => Self::X,
            LayoutAspect::Y => Self::Y,
            LayoutAspect::Width => Self::WIDTH,
            LayoutAspect::Height => Self::HEIGHT,
            LayoutAspect::ArrangeChildren => Self::ARRANGE_CHILDREN,
        }
    }

    /// Sets `aspect`.
    #[inline]
    pub fn insert(&mut self, aspect: LayoutAspect) {
        self.0 |= Self::of(aspect).0;
    }

    /// Clears `aspect`.
    #[inline]
    pub fn remove(&mut self, aspect: LayoutAspect) {
        self.0 &= !Self::of(aspect).0;
    }

    /// Iterates the set aspects in [`LayoutAspect::ENQUEUE_ORDER`].
    pub fn iter(self) -> impl Iterator<Item = LayoutAspect> {
        LayoutAspect::ENQUEUE_ORDER
            .into_iter()
            .filter(move |a| self.has(*a))
    }
}

impl From<LayoutAspect> for AspectMask {
    fn from(aspect: LayoutAspect) -> Self {
        Self::of(aspect)
    }
}

impl BitOr for AspectMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AspectMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for AspectMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for AspectMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Sub for AspectMask {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 & !rhs.0)
    }
}

impl SubAssign for AspectMask {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 &= !rhs.0;
    }
}

impl Not for AspectMask {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl fmt::Debug for AspectMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("AspectMask(none)");
        }
        f.write_str("AspectMask(")?;
        for (i, aspect) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(aspect.name())?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_operations() {
        let mut m = AspectMask::SIZING | AspectMask::X;
        assert!(m.has(LayoutAspect::Width));
        assert!(m.has(LayoutAspect::X));
        assert!(!m.has(LayoutAspect::Y));
        m.remove(LayoutAspect::Width);
        assert_eq!(m, AspectMask::HEIGHT | AspectMask::X);
        assert_eq!(AspectMask::ALL - AspectMask::POSITIONING, !AspectMask::POSITIONING);
    }

    #[test]
    fn iter_uses_enqueue_order() {
        let order: Vec<_> = AspectMask::ALL.iter().collect();
        assert_eq!(order, LayoutAspect::ENQUEUE_ORDER.to_vec());
    }

    #[test]
    fn debug_lists_names() {
        let s = format!("{:?}", AspectMask::WIDTH | AspectMask::ARRANGE_CHILDREN);
        assert_eq!(s, "AspectMask(width|arrange)");
        assert_eq!(format!("{:?}", AspectMask::NONE), "AspectMask(none)");
    }
}
