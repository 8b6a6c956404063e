// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing backend contract.
//!
//! Trellis does not rasterize anything itself. A backend provides three
//! pieces:
//!
//! - **[`DrawingContext`]**: the target of every draw call. Widgets receive
//!   one in [`Widget::draw`](crate::widget::Widget::draw); the compositor uses
//!   the same trait to clear damaged areas and blit caches.
//!
//! - **[`Surface`]**: an offscreen bitmap of an explicit pixel size that can
//!   hand out a context drawing into it and can be blitted into another
//!   context.
//!
//! - **[`SurfaceFactory`]**: allocates surfaces for render caches and the
//!   frame buffer.
//!
//! Contexts start with an identity offset and a clip covering the whole
//! target. `save`/`restore` push and pop both.
//!
//! `trellis_render` ships a software implementation (`Bitmap`, `Canvas`,
//! `BitmapFactory`) used by hosts without a GPU and by tests.

use core::any::Any;
use core::fmt;

use kurbo::{Point, Rect, Size, Vec2};

use crate::error::RenderError;
use crate::region::Region;

/// An 8-bit RGBA colour with straight (non-premultiplied) alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba8(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb8(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb8(255, 255, 255);

    /// Creates a colour from its four channels.
    #[must_use]
    pub const fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque colour.
    #[must_use]
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba8(r, g, b, 255)
    }

    /// Creates a colour from unit-range components, clamping out of range
    /// values.
    #[must_use]
    pub fn from_unit(r: f64, g: f64, b: f64, a: f64) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "value is clamped to 0..=255 before the cast"
        )]
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgba8(channel(r), channel(g), channel(b), channel(a))
    }

    /// Returns `true` if the colour fully covers what is beneath it.
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        self.a == 255
    }
}

/// A drawing target.
///
/// All coordinates are in the context's current space: the target's pixel
/// grid moved by the accumulated [`translate`](Self::translate) offsets.
pub trait DrawingContext {
    /// Pushes the current offset and clip.
    fn save(&mut self);

    /// Pops the offset and clip pushed by the matching [`save`](Self::save).
    fn restore(&mut self);

    /// Moves the origin by `offset`.
    fn translate(&mut self, offset: Vec2);

    /// Intersects the clip with `rect`.
    fn clip_rect(&mut self, rect: Rect);

    /// Intersects the clip with the area covered by `region`.
    fn clip_region(&mut self, region: &Region);

    /// Fills `rect` with `color`, blending source-over.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Resets the pixels of `rect` to transparent.
    fn clear_rect(&mut self, rect: Rect);

    /// Composites `surface` with its top-left corner at `origin`.
    ///
    /// Fails with [`RenderError::IncompatibleSurface`] when the surface was
    /// not produced by the same backend.
    fn draw_surface(&mut self, surface: &dyn Surface, origin: Point) -> Result<(), RenderError>;
}

/// An offscreen bitmap.
pub trait Surface: Send + fmt::Debug + 'static {
    /// Size in pixels.
    fn size(&self) -> Size;

    /// Returns a context drawing into this surface.
    fn context(&mut self) -> Box<dyn DrawingContext + '_>;

    /// Upcast used by backends to recover their concrete surface type.
    fn as_any(&self) -> &dyn Any;
}

/// Allocates [`Surface`]s.
pub trait SurfaceFactory: Send {
    /// Creates a cleared surface of `size` pixels.
    fn create_surface(&mut self, size: Size) -> Result<Box<dyn Surface>, RenderError>;
}
