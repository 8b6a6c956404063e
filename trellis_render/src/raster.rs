// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software RGBA backend.
//!
//! [`Bitmap`] is a straight-alpha RGBA pixel buffer, [`Canvas`] draws into
//! one, and [`BitmapFactory`] allocates them for render caches and the frame.
//! Geometry is snapped to whole pixels: a pixel is covered when its top-left
//! corner lies inside the rectangle after rounding. Layout produces integral
//! slots, so nothing is lost.

use core::any::Any;

use kurbo::{Point, Rect, Size, Vec2};
use trellis_core::backend::{Color, DrawingContext, Surface, SurfaceFactory};
use trellis_core::error::RenderError;
use trellis_core::region::Region;

// ---------------------------------------------------------------------------
// Bitmap
// ---------------------------------------------------------------------------

/// An RGBA pixel buffer, row-major, initially transparent.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl core::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Bitmap {
    /// A transparent bitmap of `width` by `height` pixels.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::TRANSPARENT; width as usize * height as usize],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The pixel at `(x, y)`, or `None` outside the bitmap.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        (x < self.width && y < self.height).then(|| self.pixels[self.offset(x, y)])
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// A drawing context targeting this bitmap.
    pub fn canvas(&mut self) -> Canvas<'_> {
        Canvas::new(self)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Pixel ranges covered by `rect`, clamped to the bitmap.
    fn span(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let x0 = snap(rect.x0, self.width);
        let x1 = snap(rect.x1, self.width);
        let y0 = snap(rect.y0, self.height);
        let y1 = snap(rect.y1, self.height);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

/// Rounds `v` to a pixel index in `0..=limit`.
fn snap(v: f64, limit: u32) -> u32 {
    let v = v.round().clamp(0.0, f64::from(limit));
    #[expect(
        clippy::cast_possible_truncation,
        reason = "value is clamped to 0..=limit before the cast"
    )]
    let px = v as u32;
    px
}

/// Source-over with straight alpha.
fn blend(dst: Color, src: Color) -> Color {
    if src.a == 255 || dst.a == 0 {
        return src;
    }
    if src.a == 0 {
        return dst;
    }
    let sa = u32::from(src.a);
    let da = u32::from(dst.a);
    let inv = 255 - sa;
    // Alpha scaled by 255 to keep the channel division exact.
    let out_a = sa * 255 + da * inv;
    let channel = |s: u8, d: u8| {
        let num = u32::from(s) * sa * 255 + u32::from(d) * da * inv;
        u8::try_from((num + out_a / 2) / out_a).unwrap_or(u8::MAX)
    };
    Color::rgba8(
        channel(src.r, dst.r),
        channel(src.g, dst.g),
        channel(src.b, dst.b),
        u8::try_from((out_a + 127) / 255).unwrap_or(u8::MAX),
    )
}

impl Surface for Bitmap {
    fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    fn context(&mut self) -> Box<dyn DrawingContext + '_> {
        Box::new(self.canvas())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// A [`DrawingContext`] drawing into a [`Bitmap`].
#[derive(Debug)]
pub struct Canvas<'a> {
    target: &'a mut Bitmap,
    offset: Vec2,
    /// Disjoint rectangles in pixel space.
    clip: Region,
    stack: Vec<(Vec2, Region)>,
}

impl<'a> Canvas<'a> {
    /// A context with no offset and a clip covering the whole bitmap.
    pub fn new(target: &'a mut Bitmap) -> Self {
        let clip = Region::from_rect(target.bounds());
        Self {
            target,
            offset: Vec2::ZERO,
            clip,
            stack: Vec::new(),
        }
    }

    /// Current offset from the bitmap origin.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Current clip in bitmap pixels.
    #[must_use]
    pub fn clip(&self) -> &Region {
        &self.clip
    }

    fn for_each_pixel(&mut self, rect: Rect, mut f: impl FnMut(&mut Color, u32, u32)) {
        let device = rect + self.offset;
        for piece in self.clip.intersect_rect(device).rects() {
            let Some((x0, y0, x1, y1)) = self.target.span(*piece) else {
                continue;
            };
            for y in y0..y1 {
                for x in x0..x1 {
                    let i = self.target.offset(x, y);
                    f(&mut self.target.pixels[i], x, y);
                }
            }
        }
    }
}

/// `region` rewritten as non-overlapping rectangles covering the same area.
fn disjoint(region: &Region) -> Region {
    let mut out = Region::new();
    for r in region.rects() {
        let mut piece = Region::from_rect(*r);
        for taken in out.rects() {
            piece.subtract_rect(*taken);
        }
        out.union(&piece);
    }
    out
}

impl DrawingContext for Canvas<'_> {
    fn save(&mut self) {
        self.stack.push((self.offset, self.clip.clone()));
    }

    fn restore(&mut self) {
        if let Some((offset, clip)) = self.stack.pop() {
            self.offset = offset;
            self.clip = clip;
        }
    }

    fn translate(&mut self, offset: Vec2) {
        self.offset += offset;
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.clip = self.clip.intersect_rect(rect + self.offset);
    }

    fn clip_region(&mut self, region: &Region) {
        let mut clip = Region::new();
        for r in region.rects() {
            clip.union(&self.clip.intersect_rect(*r + self.offset));
        }
        self.clip = disjoint(&clip);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if color.a == 0 {
            return;
        }
        self.for_each_pixel(rect, |px, _, _| *px = blend(*px, color));
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.for_each_pixel(rect, |px, _, _| *px = Color::TRANSPARENT);
    }

    fn draw_surface(&mut self, surface: &dyn Surface, origin: Point) -> Result<(), RenderError> {
        let source = surface
            .as_any()
            .downcast_ref::<Bitmap>()
            .ok_or(RenderError::IncompatibleSurface)?;
        let area = Rect::from_origin_size(origin, source.size());
        let device_origin = origin + self.offset;
        let (ox, oy) = (
            device_origin.x.round(),
            device_origin.y.round(),
        );
        self.for_each_pixel(area, |px, x, y| {
            let sx = f64::from(x) - ox;
            let sy = f64::from(y) - oy;
            if sx < 0.0 || sy < 0.0 {
                return;
            }
            if let Some(src) = source.pixel(snap(sx, source.width), snap(sy, source.height)) {
                *px = blend(*px, src);
            }
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BitmapFactory
// ---------------------------------------------------------------------------

/// Allocates [`Bitmap`] surfaces, optionally refusing large ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct BitmapFactory {
    max_pixels: Option<u64>,
    created: u64,
}

impl BitmapFactory {
    /// A factory without an allocation limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_pixels: None,
            created: 0,
        }
    }

    /// A factory refusing surfaces of more than `max_pixels` pixels.
    #[must_use]
    pub const fn with_limit(max_pixels: u64) -> Self {
        Self {
            max_pixels: Some(max_pixels),
            created: 0,
        }
    }

    /// Changes the allocation limit.
    pub fn set_limit(&mut self, max_pixels: Option<u64>) {
        self.max_pixels = max_pixels;
    }

    /// Number of surfaces created so far.
    #[must_use]
    pub fn surfaces_created(&self) -> u64 {
        self.created
    }
}

impl SurfaceFactory for BitmapFactory {
    fn create_surface(&mut self, size: Size) -> Result<Box<dyn Surface>, RenderError> {
        let width = snap(size.width.ceil(), u32::MAX);
        let height = snap(size.height.ceil(), u32::MAX);
        let pixels = u64::from(width) * u64::from(height);
        if self.max_pixels.is_some_and(|max| pixels > max) {
            return Err(RenderError::SurfaceAllocation { width, height });
        }
        self.created += 1;
        Ok(Box::new(Bitmap::new(width, height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb8(255, 0, 0);
    const BLUE: Color = Color::rgb8(0, 0, 255);

    #[test]
    fn fill_respects_offset_and_clip() {
        let mut bmp = Bitmap::new(10, 10);
        {
            let mut c = bmp.canvas();
            c.translate(Vec2::new(2.0, 2.0));
            c.clip_rect(Rect::new(0.0, 0.0, 3.0, 3.0));
            c.fill_rect(Rect::new(-5.0, -5.0, 50.0, 50.0), RED);
        }
        assert_eq!(bmp.pixel(1, 1), Some(Color::TRANSPARENT));
        assert_eq!(bmp.pixel(2, 2), Some(RED));
        assert_eq!(bmp.pixel(4, 4), Some(RED));
        assert_eq!(bmp.pixel(5, 5), Some(Color::TRANSPARENT));
    }

    #[test]
    fn restore_pops_offset_and_clip() {
        let mut bmp = Bitmap::new(4, 4);
        let mut c = bmp.canvas();
        c.save();
        c.translate(Vec2::new(1.0, 1.0));
        c.clip_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        c.restore();
        assert_eq!(c.offset(), Vec2::ZERO);
        assert_eq!(c.clip().rects(), &[Rect::new(0.0, 0.0, 4.0, 4.0)]);
    }

    #[test]
    fn overlapping_clip_blends_once() {
        let half = Color::rgba8(0, 0, 0, 128);
        let mut bmp = Bitmap::new(4, 1);
        {
            let mut c = bmp.canvas();
            c.fill_rect(Rect::new(0.0, 0.0, 4.0, 1.0), Color::WHITE);
            let region: Region = [
                Rect::new(0.0, 0.0, 3.0, 1.0),
                Rect::new(1.0, 0.0, 4.0, 1.0),
            ]
            .into_iter()
            .collect();
            c.clip_region(&region);
            c.fill_rect(Rect::new(0.0, 0.0, 4.0, 1.0), half);
        }
        let first = bmp.pixel(0, 0);
        assert!((1..4).all(|x| bmp.pixel(x, 0) == first));
    }

    #[test]
    fn blend_over_transparent_is_exact() {
        let src = Color::rgba8(10, 20, 30, 77);
        assert_eq!(blend(Color::TRANSPARENT, src), src);
        assert_eq!(blend(BLUE, Color::TRANSPARENT), BLUE);
        let mixed = blend(Color::WHITE, Color::rgba8(0, 0, 0, 128));
        assert_eq!(mixed.a, 255);
        assert_eq!(mixed.r, 127);
    }

    #[test]
    fn draw_surface_blits_at_origin() {
        let mut src = Bitmap::new(2, 2);
        src.canvas().fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), BLUE);
        let mut dst = Bitmap::new(5, 5);
        {
            let mut c = dst.canvas();
            c.translate(Vec2::new(1.0, 0.0));
            c.draw_surface(&src, Point::new(2.0, 3.0)).unwrap();
        }
        assert_eq!(dst.pixel(3, 3), Some(BLUE));
        assert_eq!(dst.pixel(4, 4), Some(BLUE));
        assert_eq!(dst.pixel(2, 3), Some(Color::TRANSPARENT));
    }

    #[test]
    fn factory_limit() {
        let mut f = BitmapFactory::with_limit(100);
        assert!(f.create_surface(Size::new(10.0, 10.0)).is_ok());
        assert_eq!(
            f.create_surface(Size::new(11.0, 10.0)).unwrap_err(),
            RenderError::SurfaceAllocation {
                width: 11,
                height: 10
            }
        );
        f.set_limit(None);
        assert!(f.create_surface(Size::new(11.0, 10.0)).is_ok());
        assert_eq!(f.surfaces_created(), 2);
    }
}
