// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The widget capability trait and the built-in widgets.
//!
//! A [`Widget`] is the behaviour attached to a node: how it draws itself and,
//! for containers, how it sizes and positions its children. Widgets are
//! immutable values shared between the layout tree and render snapshots;
//! changing a widget property means installing a new widget with
//! [`LayoutTree::set_widget`](crate::tree::LayoutTree::set_widget).
//!
//! Every hook works on plain data ([`ChildExtent`]) rather than on the tree,
//! so widgets cannot observe or mutate anything mid-layout.

use core::fmt;

use kurbo::{Point, Rect, Size};

use crate::aspect::AspectMask;
use crate::backend::{Color, DrawingContext};
use crate::measure::{Axis, Measure};

/// What a container sees of one child during layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChildExtent {
    /// The child's slot in the container's client space.
    pub slot: Rect,
    /// Effective width policy (never [`Measure::Inherit`]).
    pub width: Measure,
    /// Effective height policy (never [`Measure::Inherit`]).
    pub height: Measure,
    /// Whether the child is visible.
    pub visible: bool,
}

impl ChildExtent {
    /// Effective policy along `axis`.
    #[must_use]
    pub const fn measure(&self, axis: Axis) -> Measure {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Slot extent along `axis`.
    #[must_use]
    pub fn extent(&self, axis: Axis) -> f64 {
        axis.extent(self.slot.size())
    }
}

/// Behaviour of a node.
///
/// Default methods describe a plain leaf: it has no children, draws
/// nothing, and its content size is that of its largest child (zero).
pub trait Widget: fmt::Debug + Send + Sync {
    /// Kind name, used to look up declarative defaults.
    fn kind(&self) -> &'static str {
        "Widget"
    }

    /// Whether the widget accepts children.
    fn is_container(&self) -> bool {
        false
    }

    /// Whether the widget positions its children itself
    /// ([`LayoutAspect::ArrangeChildren`](crate::aspect::LayoutAspect::ArrangeChildren)).
    fn arranges_children(&self) -> bool {
        false
    }

    /// Whether stretched children along `axis` share the space their
    /// siblings leave rather than filling the whole client extent.
    fn shares_space(&self, axis: Axis) -> bool {
        _ = axis;
        false
    }

    /// Filters the aspects a child may register.
    fn constrain_child_aspects(&self, mask: AspectMask) -> AspectMask {
        mask
    }

    /// Extent demanded by content along `axis`, margins excluded.
    fn measure_content(&self, axis: Axis, children: &[ChildExtent]) -> f64 {
        largest_extent(axis, children)
    }

    /// Extent given to a stretched child along `axis`.
    ///
    /// `fit` is `true` when the container itself is sized by content on that
    /// axis.
    fn stretch_extent(&self, axis: Axis, client: f64, children: &[ChildExtent], fit: bool) -> f64 {
        _ = (axis, children, fit);
        client
    }

    /// Child origins after arrangement, one per child in child order.
    ///
    /// Only the coordinates on axes the widget removes in
    /// [`constrain_child_aspects`](Self::constrain_child_aspects) are applied.
    fn arrange(&self, children: &[ChildExtent]) -> Vec<Point> {
        children.iter().map(|c| c.slot.origin()).collect()
    }

    /// Paints the node's own content into `bounds` (local coordinates).
    /// Children are painted by the compositor afterwards.
    fn draw(&self, ctx: &mut dyn DrawingContext, bounds: Rect) {
        _ = (ctx, bounds);
    }
}

/// The largest extent among visible children.
///
/// Children sized from the container (`Percent`, `Stretch`) follow it and
/// are not content.
#[must_use]
pub fn largest_extent(axis: Axis, children: &[ChildExtent]) -> f64 {
    children
        .iter()
        .filter(|c| c.visible && !c.measure(axis).is_relative_to_parent())
        .map(|c| c.extent(axis))
        .fold(0.0, f64::max)
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// A leaf filling its bounds with a colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Panel {
    /// Fill colour.
    pub background: Color,
    /// Intrinsic content size, used when the node is sized to fit.
    pub content: Size,
}

impl Panel {
    /// A panel of the given colour with no intrinsic size.
    #[must_use]
    pub const fn new(background: Color) -> Self {
        Self {
            background,
            content: Size::ZERO,
        }
    }

    /// Sets the intrinsic content size.
    #[must_use]
    pub const fn with_content(mut self, content: Size) -> Self {
        self.content = content;
        self
    }
}

impl Widget for Panel {
    fn kind(&self) -> &'static str {
        "Panel"
    }

    fn measure_content(&self, axis: Axis, _children: &[ChildExtent]) -> f64 {
        axis.extent(self.content)
    }

    fn draw(&self, ctx: &mut dyn DrawingContext, bounds: Rect) {
        if self.background.a > 0 {
            ctx.fill_rect(bounds, self.background);
        }
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// A container that overlays its children; its content size is that of its
/// largest child.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Group {
    /// Optional fill behind the children.
    pub background: Option<Color>,
}

impl Group {
    /// A transparent group.
    #[must_use]
    pub const fn new() -> Self {
        Self { background: None }
    }

    /// A group with a background fill.
    #[must_use]
    pub const fn with_background(background: Color) -> Self {
        Self {
            background: Some(background),
        }
    }
}

impl Widget for Group {
    fn kind(&self) -> &'static str {
        "Group"
    }

    fn is_container(&self) -> bool {
        true
    }

    fn draw(&self, ctx: &mut dyn DrawingContext, bounds: Rect) {
        if let Some(bg) = self.background {
            ctx.fill_rect(bounds, bg);
        }
    }
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// A container placing its children one after another along an axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stack {
    /// Stacking axis.
    pub orientation: Axis,
    /// Gap between consecutive visible children.
    pub spacing: f64,
    /// Optional fill behind the children.
    pub background: Option<Color>,
}

impl Stack {
    /// Default gap between children.
    pub const DEFAULT_SPACING: f64 = 2.0;

    /// A stack along `orientation` with the default spacing.
    #[must_use]
    pub const fn new(orientation: Axis) -> Self {
        Self {
            orientation,
            spacing: Self::DEFAULT_SPACING,
            background: None,
        }
    }

    /// A left-to-right stack.
    #[must_use]
    pub const fn horizontal() -> Self {
        Self::new(Axis::Horizontal)
    }

    /// A top-to-bottom stack.
    #[must_use]
    pub const fn vertical() -> Self {
        Self::new(Axis::Vertical)
    }

    /// Sets the spacing.
    #[must_use]
    pub const fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets a background fill.
    #[must_use]
    pub const fn with_background(mut self, background: Color) -> Self {
        self.background = Some(background);
        self
    }

    /// Sum of fixed-size visible children plus the gaps between all visible
    /// children.
    fn packed_extent(&self, children: &[ChildExtent]) -> f64 {
        let axis = self.orientation;
        let mut visible = 0_u32;
        let mut total = 0.0;
        for c in children.iter().filter(|c| c.visible) {
            visible += 1;
            if !c.measure(axis).is_stretch() {
                total += c.extent(axis);
            }
        }
        if visible > 1 {
            total += self.spacing * f64::from(visible - 1);
        }
        total
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::horizontal()
    }
}

impl Widget for Stack {
    fn kind(&self) -> &'static str {
        "Stack"
    }

    fn is_container(&self) -> bool {
        true
    }

    fn arranges_children(&self) -> bool {
        true
    }

    fn shares_space(&self, axis: Axis) -> bool {
        axis == self.orientation
    }

    fn constrain_child_aspects(&self, mask: AspectMask) -> AspectMask {
        match self.orientation {
            Axis::Horizontal => mask - AspectMask::X,
            Axis::Vertical => mask - AspectMask::Y,
        }
    }

    fn measure_content(&self, axis: Axis, children: &[ChildExtent]) -> f64 {
        if axis == self.orientation {
            self.packed_extent(children)
        } else {
            largest_extent(axis, children)
        }
    }

    fn stretch_extent(&self, axis: Axis, client: f64, children: &[ChildExtent], fit: bool) -> f64 {
        if axis != self.orientation {
            return client;
        }
        if fit {
            return 0.0;
        }
        let stretched = children
            .iter()
            .filter(|c| c.visible && c.measure(axis).is_stretch())
            .fold(0_u32, |n, _| n + 1);
        let remaining = (client - self.packed_extent(children)).max(0.0);
        if stretched > 1 {
            (remaining / f64::from(stretched)).trunc()
        } else {
            remaining
        }
    }

    fn arrange(&self, children: &[ChildExtent]) -> Vec<Point> {
        let axis = self.orientation;
        let mut cursor = 0.0;
        children
            .iter()
            .map(|c| {
                let origin = c.slot.origin();
                if !c.visible {
                    return origin;
                }
                let placed = match axis {
                    Axis::Horizontal => Point::new(cursor, origin.y),
                    Axis::Vertical => Point::new(origin.x, cursor),
                };
                cursor += c.extent(axis) + self.spacing;
                placed
            })
            .collect()
    }

    fn draw(&self, ctx: &mut dyn DrawingContext, bounds: Rect) {
        if let Some(bg) = self.background {
            ctx.fill_rect(bounds, bg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(w: f64, h: f64, width: Measure) -> ChildExtent {
        ChildExtent {
            slot: Rect::new(0.0, 0.0, w, h),
            width,
            height: Measure::Fixed(h),
            visible: true,
        }
    }

    #[test]
    fn group_content_is_largest_visible_child() {
        let mut kids = vec![
            child(30.0, 10.0, Measure::Fixed(30.0)),
            child(50.0, 5.0, Measure::Fixed(50.0)),
        ];
        kids[1].visible = false;
        let g = Group::new();
        assert_eq!(g.measure_content(Axis::Horizontal, &kids), 30.0);
        assert_eq!(g.measure_content(Axis::Vertical, &kids), 10.0);
    }

    #[test]
    fn group_content_ignores_children_sized_by_it() {
        let kids = [
            child(30.0, 10.0, Measure::Fixed(30.0)),
            child(80.0, 10.0, Measure::Stretch),
            child(60.0, 10.0, Measure::Percent(50.0)),
        ];
        assert_eq!(Group::new().measure_content(Axis::Horizontal, &kids), 30.0);
    }

    #[test]
    fn stack_content_sums_with_spacing() {
        let kids = [
            child(30.0, 10.0, Measure::Fixed(30.0)),
            child(20.0, 10.0, Measure::Fixed(20.0)),
            child(99.0, 10.0, Measure::Stretch),
        ];
        let s = Stack::horizontal();
        // 30 + 20 + two gaps; the stretched child is not content.
        assert_eq!(s.measure_content(Axis::Horizontal, &kids), 54.0);
        assert_eq!(s.measure_content(Axis::Vertical, &kids), 10.0);
    }

    #[test]
    fn stack_splits_remaining_space() {
        let kids = [
            child(10.0, 10.0, Measure::Fixed(10.0)),
            child(0.0, 10.0, Measure::Stretch),
            child(0.0, 10.0, Measure::Stretch),
        ];
        let s = Stack::horizontal().with_spacing(0.0);
        assert_eq!(s.stretch_extent(Axis::Horizontal, 101.0, &kids, false), 45.0);
        assert_eq!(s.stretch_extent(Axis::Horizontal, 101.0, &kids, true), 0.0);
        assert_eq!(s.stretch_extent(Axis::Vertical, 70.0, &kids, false), 70.0);
    }

    #[test]
    fn stack_arranges_along_axis_only() {
        let mut kids = [
            child(10.0, 10.0, Measure::Fixed(10.0)),
            child(20.0, 10.0, Measure::Fixed(20.0)),
            child(5.0, 10.0, Measure::Fixed(5.0)),
        ];
        kids[1].visible = false;
        kids[2].slot = kids[2].slot.with_origin((0.0, 7.0));
        let placed = Stack::horizontal().arrange(&kids);
        assert_eq!(placed[0], Point::new(0.0, 0.0));
        assert_eq!(placed[2], Point::new(12.0, 7.0));
    }

    #[test]
    fn stack_vetoes_position_on_its_axis() {
        let v = Stack::vertical();
        assert_eq!(v.constrain_child_aspects(AspectMask::ALL), !AspectMask::Y);
    }
}
