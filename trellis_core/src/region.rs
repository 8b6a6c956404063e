// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage regions.
//!
//! A [`Region`] is an unordered set of axis-aligned rectangles. It is used
//! both as accumulated damage (per cache boundary and for the surface) and
//! as a clip mask while painting.
//!
//! The set is kept exactly as registered: [`union_rect`](Region::union_rect)
//! drops empty and duplicate rectangles but never merges or splits the
//! others, so the covered area is always the union of what was registered.
//! Point-set queries ([`overlap`](Region::overlap),
//! [`contains_point`](Region::contains_point)) account for overlaps.

use kurbo::{Point, Rect, Vec2};

/// How a rectangle relates to a [`Region`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Overlap {
    /// Entirely covered by the region.
    In,
    /// Disjoint from the region.
    Out,
    /// Partially covered.
    Part,
}

/// An unordered set of axis-aligned rectangles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Creates an empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// Creates a region holding a single rectangle (empty if `rect` has no
    /// area).
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }

    /// Returns `true` if the region covers nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of rectangles in the set.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// The rectangles in registration order.
    #[inline]
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Removes every rectangle.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Returns the current contents and leaves the region empty.
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }

    /// Adds `rect` to the set. Rectangles without area and exact duplicates
    /// are ignored.
    pub fn union_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        if is_empty_rect(rect) || self.rects.contains(&rect) {
            return;
        }
        self.rects.push(rect);
    }

    /// Adds every rectangle of `other`.
    pub fn union(&mut self, other: &Self) {
        for r in &other.rects {
            self.union_rect(*r);
        }
    }

    /// Returns the part of the region inside `clip`.
    #[must_use]
    pub fn intersect_rect(&self, clip: Rect) -> Self {
        let mut out = Self::new();
        for r in &self.rects {
            if let Some(i) = intersection(*r, clip) {
                out.union_rect(i);
            }
        }
        out
    }

    /// Removes `hole` from the covered area, splitting rectangles that
    /// straddle it into up to four pieces.
    pub fn subtract_rect(&mut self, hole: Rect) {
        let mut out = Vec::with_capacity(self.rects.len());
        for r in self.rects.drain(..) {
            let Some(i) = intersection(r, hole) else {
                out.push(r);
                continue;
            };
            // Bands above and below the hole span the full width; the side
            // pieces only the hole's height.
            let pieces = [
                Rect::new(r.x0, r.y0, r.x1, i.y0),
                Rect::new(r.x0, i.y1, r.x1, r.y1),
                Rect::new(r.x0, i.y0, i.x0, i.y1),
                Rect::new(i.x1, i.y0, r.x1, i.y1),
            ];
            for p in pieces {
                if !is_empty_rect(p) && !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        self.rects = out;
    }

    /// Classifies `rect` against the covered area.
    #[must_use]
    pub fn overlap(&self, rect: Rect) -> Overlap {
        if !self.rects.iter().any(|r| intersection(*r, rect).is_some()) {
            return Overlap::Out;
        }
        let mut rest = Self::from_rect(rect);
        for r in &self.rects {
            rest.subtract_rect(*r);
            if rest.is_empty() {
                return Overlap::In;
            }
        }
        Overlap::Part
    }

    /// Returns `true` if `point` lies inside any rectangle (half-open on the
    /// far edges).
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        self.rects
            .iter()
            .any(|r| point.x >= r.x0 && point.x < r.x1 && point.y >= r.y0 && point.y < r.y1)
    }

    /// Smallest rectangle enclosing the region.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        let mut iter = self.rects.iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, r| acc.union(*r)))
    }

    /// Returns the region moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            rects: self.rects.iter().map(|r| *r + offset).collect(),
        }
    }
}

impl FromIterator<Rect> for Region {
    fn from_iter<I: IntoIterator<Item = Rect>>(iter: I) -> Self {
        let mut region = Self::new();
        for r in iter {
            region.union_rect(r);
        }
        region
    }
}

/// Returns `true` if `r` covers no area.
#[inline]
pub(crate) fn is_empty_rect(r: Rect) -> bool {
    !(r.x1 > r.x0 && r.y1 > r.y0)
}

/// Intersection of two rectangles, or `None` if they share no area.
#[inline]
pub(crate) fn intersection(a: Rect, b: Rect) -> Option<Rect> {
    let r = Rect::new(a.x0.max(b.x0), a.y0.max(b.y0), a.x1.min(b.x1), a.y1.min(b.y1));
    if is_empty_rect(r) { None } else { Some(r) }
}

/// Returns `true` if `outer` fully contains `inner`.
#[inline]
pub(crate) fn contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_ignores_empty_and_duplicates() {
        let mut r = Region::new();
        r.union_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        r.union_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        r.union_rect(Rect::new(5.0, 5.0, 5.0, 20.0));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn union_keeps_overlapping_rects_apart() {
        let mut r = Region::new();
        r.union_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        r.union_rect(Rect::new(5.0, 5.0, 15.0, 15.0));
        assert_eq!(r.len(), 2);
        assert_eq!(r.bounds(), Some(Rect::new(0.0, 0.0, 15.0, 15.0)));
    }

    #[test]
    fn subtract_splits_into_pieces() {
        let mut r = Region::from_rect(Rect::new(0.0, 0.0, 30.0, 30.0));
        r.subtract_rect(Rect::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(r.len(), 4);
        assert!(!r.contains_point(Point::new(15.0, 15.0)));
        assert!(r.contains_point(Point::new(5.0, 15.0)));
        assert!(r.contains_point(Point::new(25.0, 15.0)));
        assert!(r.contains_point(Point::new(15.0, 5.0)));
        assert!(r.contains_point(Point::new(15.0, 25.0)));
    }

    #[test]
    fn subtract_everything_empties() {
        let mut r = Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        r.subtract_rect(Rect::new(-5.0, -5.0, 50.0, 50.0));
        assert!(r.is_empty());
    }

    #[test]
    fn overlap_classification() {
        let mut r = Region::new();
        r.union_rect(Rect::new(0.0, 0.0, 10.0, 20.0));
        r.union_rect(Rect::new(10.0, 0.0, 20.0, 20.0));
        // Covered only by the two halves together.
        assert_eq!(r.overlap(Rect::new(5.0, 5.0, 15.0, 15.0)), Overlap::In);
        assert_eq!(r.overlap(Rect::new(15.0, 15.0, 25.0, 25.0)), Overlap::Part);
        assert_eq!(r.overlap(Rect::new(20.0, 0.0, 30.0, 10.0)), Overlap::Out);
    }

    #[test]
    fn intersect_clamps() {
        let r = Region::from_rect(Rect::new(-10.0, -10.0, 10.0, 10.0));
        let clipped = r.intersect_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(clipped.rects(), &[Rect::new(0.0, 0.0, 10.0, 10.0)]);
        assert!(r.intersect_rect(Rect::new(20.0, 20.0, 30.0, 30.0)).is_empty());
    }

    #[test]
    fn take_resets() {
        let mut r = Region::from_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        let taken = r.take();
        assert!(r.is_empty());
        assert_eq!(taken.len(), 1);
    }

    #[test]
    fn translated_moves_every_rect() {
        let r = Region::from_rect(Rect::new(0.0, 0.0, 5.0, 5.0)).translated(Vec2::new(10.0, 2.0));
        assert_eq!(r.rects(), &[Rect::new(10.0, 2.0, 15.0, 7.0)]);
    }
}
