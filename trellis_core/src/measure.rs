// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Size policies, alignment, and axes.
//!
//! A [`Measure`] is what an author asks for; the scheduler turns it into a
//! concrete pixel extent once the values it depends on are known.

use core::fmt;
use core::str::FromStr;

use kurbo::{Point, Rect, Size};

use crate::aspect::LayoutAspect;

/// A size policy along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Measure {
    /// A literal size in pixels.
    Fixed(f64),
    /// A percentage (0–100) of the parent's client extent.
    Percent(f64),
    /// Sized by content: the extent demanded by children plus margins.
    Fit,
    /// Fills the space the parent offers along this axis.
    Stretch,
    /// Follows the parent's own policy ([`Measure::policy`]).
    #[default]
    Inherit,
}

impl Measure {
    /// Returns `true` for [`Measure::Fixed`].
    #[inline]
    #[must_use]
    pub const fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    /// Returns `true` for [`Measure::Fit`].
    #[inline]
    #[must_use]
    pub const fn is_fit(self) -> bool {
        matches!(self, Self::Fit)
    }

    /// Returns `true` for [`Measure::Stretch`].
    #[inline]
    #[must_use]
    pub const fn is_stretch(self) -> bool {
        matches!(self, Self::Stretch)
    }

    /// Returns `true` when the resolved value depends on the parent's client
    /// extent ([`Percent`](Self::Percent) or [`Stretch`](Self::Stretch)).
    #[inline]
    #[must_use]
    pub const fn is_relative_to_parent(self) -> bool {
        matches!(self, Self::Percent(_) | Self::Stretch)
    }

    /// The policy a child with [`Measure::Inherit`] adopts from this measure.
    ///
    /// Only `Fit` is passed down; every other measure is seen as `Stretch`.
    #[inline]
    #[must_use]
    pub const fn policy(self) -> Self {
        if self.is_fit() { Self::Fit } else { Self::Stretch }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(px) => write!(f, "{px}"),
            Self::Percent(p) => write!(f, "{p}%"),
            Self::Fit => f.write_str("Fit"),
            Self::Stretch => f.write_str("Stretched"),
            Self::Inherit => f.write_str("Inherit"),
        }
    }
}

/// Error returned when a string is not a valid [`Measure`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseMeasureError {
    input: String,
}

impl ParseMeasureError {
    /// The text that failed to parse.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for ParseMeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid measure `{}`", self.input)
    }
}

impl core::error::Error for ParseMeasureError {}

impl FromStr for Measure {
    type Err = ParseMeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let st = s.trim();
        let err = || ParseMeasureError {
            input: s.to_owned(),
        };
        match st {
            "Fit" => Ok(Self::Fit),
            "Stretched" | "Stretch" => Ok(Self::Stretch),
            "Inherit" => Ok(Self::Inherit),
            _ => {
                if let Some(pct) = st.strip_suffix('%') {
                    let p: f64 = pct.trim().parse().map_err(|_| err())?;
                    if !(0.0..=100.0).contains(&p) {
                        return Err(err());
                    }
                    Ok(Self::Percent(p))
                } else {
                    let px: f64 = st.parse().map_err(|_| err())?;
                    if !px.is_finite() || px < 0.0 {
                        return Err(err());
                    }
                    Ok(Self::Fixed(px))
                }
            }
        }
    }
}

/// Placement of a node inside its parent's client rectangle along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Left or top edge.
    Start,
    /// Centred.
    #[default]
    Center,
    /// Right or bottom edge.
    End,
}

impl Alignment {
    /// Offset of an `extent`-sized span inside `available` pixels.
    ///
    /// Halves are truncated so that positions stay on whole pixels.
    #[must_use]
    pub fn offset(self, available: f64, extent: f64) -> f64 {
        match self {
            Self::Start => 0.0,
            Self::End => available - extent,
            Self::Center => (available / 2.0).trunc() - (extent / 2.0).trunc(),
        }
    }
}

/// One of the two layout axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Widths and X positions.
    Horizontal,
    /// Heights and Y positions.
    Vertical,
}

impl Axis {
    /// Both axes, horizontal first.
    pub const ALL: [Self; 2] = [Self::Horizontal, Self::Vertical];

    /// The size aspect along this axis.
    #[inline]
    #[must_use]
    pub const fn size_aspect(self) -> LayoutAspect {
        match self {
            Self::Horizontal => LayoutAspect::Width,
            Self::Vertical => LayoutAspect::Height,
        }
    }

    /// The position aspect along this axis.
    #[inline]
    #[must_use]
    pub const fn position_aspect(self) -> LayoutAspect {
        match self {
            Self::Horizontal => LayoutAspect::X,
            Self::Vertical => LayoutAspect::Y,
        }
    }

    /// The other axis.
    #[inline]
    #[must_use]
    pub const fn cross(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    /// Extent of `size` along this axis.
    #[inline]
    #[must_use]
    pub const fn extent(self, size: Size) -> f64 {
        match self {
            Self::Horizontal => size.width,
            Self::Vertical => size.height,
        }
    }

    /// Returns `size` with its extent along this axis replaced.
    #[inline]
    #[must_use]
    pub const fn with_extent(self, size: Size, extent: f64) -> Size {
        match self {
            Self::Horizontal => Size::new(extent, size.height),
            Self::Vertical => Size::new(size.width, extent),
        }
    }

    /// Coordinate of `point` along this axis.
    #[inline]
    #[must_use]
    pub const fn coord(self, point: Point) -> f64 {
        match self {
            Self::Horizontal => point.x,
            Self::Vertical => point.y,
        }
    }

    /// Returns `rect` moved so its origin along this axis is `pos`, keeping
    /// its size.
    #[must_use]
    pub fn with_position(self, rect: Rect, pos: f64) -> Rect {
        let origin = match self {
            Self::Horizontal => Point::new(pos, rect.y0),
            Self::Vertical => Point::new(rect.x0, pos),
        };
        rect.with_origin(origin)
    }

    /// Returns `rect` resized so its extent along this axis is `extent`,
    /// keeping its origin.
    #[must_use]
    pub fn with_rect_extent(self, rect: Rect, extent: f64) -> Rect {
        rect.with_size(self.with_extent(rect.size(), extent))
    }
}
