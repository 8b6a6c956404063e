// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout tree: node storage, the layout queue, and the clipping queue
//! behind one mutable API.
//!
//! Every mutation goes through [`LayoutTree`] so that the right layout
//! aspects are requested and the right areas are damaged. The tree itself is
//! not synchronised; hosts wrap it in a lock (see `trellis_render::Viewport`).
//!
//! Resolution lives in [`layout`](crate::layout), damage bubbling in
//! [`damage`](crate::damage).

use std::sync::Arc;

use kurbo::{Rect, Size, Vec2};

use crate::aspect::{AspectMask, LayoutAspect};
use crate::error::TreeError;
use crate::measure::{Alignment, Axis, Measure};
use crate::node::{INVALID, NodeId, NodeStore};
use crate::region::Region;
use crate::scheduler::LayoutScheduler;
use crate::trace::Tracer;
use crate::widget::{Group, Widget};

/// A tree of widget nodes under a surface root.
#[derive(Debug)]
pub struct LayoutTree {
    pub(crate) nodes: NodeStore,
    pub(crate) scheduler: LayoutScheduler,
    pub(crate) clip_queue: Vec<NodeId>,
    root: NodeId,
}

impl LayoutTree {
    /// Creates a tree whose root covers a surface of `size`.
    #[must_use]
    pub fn new(size: Size) -> Self {
        let mut nodes = NodeStore::new();
        let root = nodes.create_node(Arc::new(Group::new()));
        let i = root.idx as usize;
        nodes.width[i] = Measure::Fixed(size.width);
        nodes.height[i] = Measure::Fixed(size.height);
        nodes.min_size[i] = Size::ZERO;
        nodes.slot[i] = size.to_rect();
        Self {
            nodes,
            scheduler: LayoutScheduler::new(),
            clip_queue: Vec::new(),
            root,
        }
    }

    /// The surface root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read access to node state.
    #[must_use]
    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    /// The layout queue.
    #[must_use]
    pub fn scheduler(&self) -> &LayoutScheduler {
        &self.scheduler
    }

    /// Size of the surface.
    #[must_use]
    pub fn surface_size(&self) -> Size {
        self.nodes.slot[self.root.idx as usize].size()
    }

    /// Returns `true` if layout work is queued.
    #[must_use]
    pub fn has_pending_layout(&self) -> bool {
        !self.scheduler.is_empty()
    }

    /// Number of nodes waiting for clipping registration.
    #[must_use]
    pub fn pending_clips(&self) -> usize {
        self.clip_queue
            .iter()
            .filter(|id| {
                self.nodes.is_alive(**id) && self.nodes.queued_for_clipping[id.idx as usize]
            })
            .count()
    }

    // -- Structure --

    /// Creates a detached node.
    pub fn create_node<W: Widget + 'static>(&mut self, widget: W) -> NodeId {
        let id = self.nodes.create_node(Arc::new(widget));
        let i = id.idx as usize;
        let w = &self.nodes.widget[i];
        self.nodes.content_size[i] = Size::new(
            w.measure_content(Axis::Horizontal, &[]),
            w.measure_content(Axis::Vertical, &[]),
        );
        id
    }

    /// Returns `true` if `id` is live and connected to the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.nodes.is_alive(id) && self.attached_at(id.idx)
    }

    fn check_alive(&self, id: NodeId) -> Result<(), TreeError> {
        if self.nodes.is_alive(id) {
            Ok(())
        } else {
            Err(TreeError::StaleNode(id))
        }
    }

    pub(crate) fn attached_at(&self, idx: u32) -> bool {
        let mut cur = idx;
        loop {
            if cur == self.root.idx {
                return true;
            }
            let p = self.nodes.parent[cur as usize];
            if p == INVALID {
                return false;
            }
            cur = p;
        }
    }

    /// Appends `child` to `parent`'s children.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.attach(parent, child, INVALID)
    }

    /// Inserts `child` at `index` among `parent`'s children.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.check_alive(parent)?;
        let len = self.nodes.child_count(parent);
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        let before = self.nodes.nth_child(parent.idx, index);
        self.attach(parent, child, before)
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, before: u32) -> Result<(), TreeError> {
        self.check_alive(parent)?;
        self.check_alive(child)?;
        if child == self.root {
            return Err(TreeError::RootNode);
        }
        if !self.nodes.widget[parent.idx as usize].is_container() {
            return Err(TreeError::NotAContainer(parent));
        }
        if self.nodes.parent[child.idx as usize] != INVALID {
            return Err(TreeError::AlreadyAttached(child));
        }
        if self.nodes.is_ancestor_or_self(child, parent) {
            return Err(TreeError::WouldCycle { parent, child });
        }

        self.nodes.link(parent.idx, child.idx, before);
        let subtree = self.nodes.subtree(child.idx);
        for &i in &subtree {
            let i = i as usize;
            self.nodes.pending[i] = AspectMask::NONE;
            self.nodes.last_painted[i] = None;
            self.nodes.dirty[i] = true;
        }
        for &i in &subtree {
            self.register_at(i, AspectMask::ALL);
        }
        let mut tracer = Tracer::none();
        for axis in Axis::ALL {
            self.content_size_changed(parent.idx, axis, &mut tracer);
        }
        Ok(())
    }

    /// Detaches `child` from its parent. Detached nodes keep their state but
    /// take no part in layout or painting until attached again.
    pub fn remove_child(&mut self, child: NodeId) {
        if !self.nodes.is_alive(child) {
            return;
        }
        let c = child.idx;
        let p = self.nodes.parent[c as usize];
        if p == INVALID {
            return;
        }
        let mut tracer = Tracer::none();
        if let Some(painted) = self.nodes.last_painted[c as usize] {
            self.register_clip_at(p, painted, &mut tracer);
        }
        self.nodes.unlink(c);
        for i in self.nodes.subtree(c) {
            let i = i as usize;
            self.nodes.pending[i] = AspectMask::NONE;
            self.nodes.queued_for_clipping[i] = false;
        }
        for axis in Axis::ALL {
            self.content_size_changed(p, axis, &mut tracer);
        }
    }

    /// Detaches and destroys `id` and its whole subtree.
    pub fn delete_node(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.check_alive(id)?;
        if id == self.root {
            return Err(TreeError::RootNode);
        }
        self.destroy_subtree(id);
        Ok(())
    }

    fn destroy_subtree(&mut self, id: NodeId) {
        self.remove_child(id);
        let subtree = self.nodes.subtree(id.idx);
        // Reverse pre-order visits every child before its parent.
        for &i in subtree.iter().rev() {
            if let Some(node) = self.nodes.id_at(i) {
                self.nodes.destroy_node(node);
            }
        }
    }

    /// Destroys every child of `parent`.
    pub fn clear_children(&mut self, parent: NodeId) {
        if !self.nodes.is_alive(parent) {
            return;
        }
        for child in self.nodes.child_indices(parent.idx) {
            if let Some(id) = self.nodes.id_at(child) {
                self.destroy_subtree(id);
            }
        }
    }

    /// Moves `child` last among its siblings, so it paints above them.
    pub fn put_on_top(&mut self, child: NodeId) {
        self.restack(child, false);
    }

    /// Moves `child` first among its siblings, so it paints below them.
    pub fn put_on_bottom(&mut self, child: NodeId) {
        self.restack(child, true);
    }

    fn restack(&mut self, child: NodeId, bottom: bool) {
        if !self.nodes.is_alive(child) {
            return;
        }
        let c = child.idx;
        let p = self.nodes.parent[c as usize];
        if p == INVALID {
            return;
        }
        let already = if bottom {
            self.nodes.prev_sibling[c as usize] == INVALID
        } else {
            self.nodes.next_sibling[c as usize] == INVALID
        };
        if already {
            return;
        }
        self.nodes.unlink(c);
        let before = if bottom {
            self.nodes.first_child[p as usize]
        } else {
            INVALID
        };
        self.nodes.link(p, c, before);
        self.register_at(p, AspectMask::ARRANGE_CHILDREN);
        self.register_for_redraw(child);
    }

    // -- Properties --

    /// Sets the width policy. See [`set_measure`](Self::set_measure).
    pub fn set_width(&mut self, id: NodeId, width: Measure) {
        self.set_measure(id, Axis::Horizontal, width);
    }

    /// Sets the height policy. See [`set_measure`](Self::set_measure).
    pub fn set_height(&mut self, id: NodeId, height: Measure) {
        self.set_measure(id, Axis::Vertical, height);
    }

    /// Sets the size policy along `axis`.
    ///
    /// A `Fixed` size outside the node's minimum and maximum is ignored. The
    /// root's size follows the surface and cannot be set.
    pub fn set_measure(&mut self, id: NodeId, axis: Axis, measure: Measure) {
        if id == self.root || !self.nodes.is_alive(id) {
            return;
        }
        let i = id.idx;
        if let Measure::Fixed(v) = measure {
            let min = axis.extent(self.nodes.min_size[i as usize]);
            let max = axis.extent(self.nodes.max_size[i as usize]);
            if v < min || (max > 0.0 && v > max) {
                log::debug!("ignoring {measure} for {id}: outside [{min}, {max}]");
                return;
            }
        }
        if self.nodes.measure_at(i, axis) == measure {
            return;
        }
        self.nodes.set_measure_at(i, axis, measure);
        let mask = AspectMask::of(axis.size_aspect()) | AspectMask::of(axis.position_aspect());
        self.register_at(i, mask);
        // Inheriting children follow the new policy.
        for c in self.nodes.child_indices(i) {
            if self.nodes.measure_at(c, axis) == Measure::Inherit {
                self.register_at(c, mask);
            }
        }
        let p = self.nodes.parent[i as usize];
        if p != INVALID {
            self.content_size_changed(p, axis, &mut Tracer::none());
        }
    }

    /// Sets the alignment along `axis`.
    pub fn set_alignment(&mut self, id: NodeId, axis: Axis, alignment: Alignment) {
        if !self.nodes.is_alive(id) {
            return;
        }
        let i = id.idx as usize;
        let field = match axis {
            Axis::Horizontal => &mut self.nodes.h_align[i],
            Axis::Vertical => &mut self.nodes.v_align[i],
        };
        if *field == alignment {
            return;
        }
        *field = alignment;
        self.register_at(id.idx, AspectMask::of(axis.position_aspect()));
    }

    /// Sets the explicit offset (`left` or `top`) along `axis`. A non-zero
    /// offset overrides the alignment.
    pub fn set_offset(&mut self, id: NodeId, axis: Axis, offset: f64) {
        if !self.nodes.is_alive(id) {
            return;
        }
        let i = id.idx as usize;
        let field = match axis {
            Axis::Horizontal => &mut self.nodes.left[i],
            Axis::Vertical => &mut self.nodes.top[i],
        };
        if *field == offset {
            return;
        }
        *field = offset;
        self.register_at(id.idx, AspectMask::of(axis.position_aspect()));
    }

    /// Sets the margin between the slot and the client rectangle.
    pub fn set_margin(&mut self, id: NodeId, margin: f64) {
        if !self.nodes.is_alive(id) {
            return;
        }
        let i = id.idx;
        if self.nodes.margin[i as usize] == margin {
            return;
        }
        self.nodes.margin[i as usize] = margin;
        self.register_at(i, AspectMask::SIZING);
        for axis in Axis::ALL {
            self.cascade_to_children(i, axis);
        }
        self.register_for_redraw(id);
    }

    /// Sets the minimum size.
    pub fn set_minimum_size(&mut self, id: NodeId, size: Size) {
        if !self.nodes.is_alive(id) {
            return;
        }
        if self.nodes.min_size[id.idx as usize] == size {
            return;
        }
        self.nodes.min_size[id.idx as usize] = size;
        self.register_at(id.idx, AspectMask::SIZING);
    }

    /// Sets the maximum size; zero components mean "no maximum".
    pub fn set_maximum_size(&mut self, id: NodeId, size: Size) {
        if !self.nodes.is_alive(id) {
            return;
        }
        if self.nodes.max_size[id.idx as usize] == size {
            return;
        }
        self.nodes.max_size[id.idx as usize] = size;
        self.register_at(id.idx, AspectMask::SIZING);
    }

    /// Shows or hides a node. Hidden nodes take no space.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if !self.nodes.is_alive(id) {
            return;
        }
        let i = id.idx;
        if self.nodes.flags[i as usize].visible == visible {
            return;
        }
        self.nodes.flags[i as usize].visible = visible;
        self.register_at(i, AspectMask::SIZING);
        let p = self.nodes.parent[i as usize];
        if p != INVALID {
            let mut tracer = Tracer::none();
            for axis in Axis::ALL {
                self.content_size_changed(p, axis, &mut tracer);
            }
        }
    }

    /// Enables or disables a node.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) {
        if !self.nodes.is_alive(id) {
            return;
        }
        if self.nodes.flags[id.idx as usize].enabled == enabled {
            return;
        }
        self.nodes.flags[id.idx as usize].enabled = enabled;
        self.register_for_redraw(id);
    }

    /// Sets whether children are clipped to the client rectangle.
    pub fn set_clip_to_client(&mut self, id: NodeId, clip: bool) {
        if !self.nodes.is_alive(id) {
            return;
        }
        if self.nodes.flags[id.idx as usize].clip_to_client == clip {
            return;
        }
        self.nodes.flags[id.idx as usize].clip_to_client = clip;
        self.register_for_redraw(id);
    }

    /// Turns the node's render cache on or off.
    pub fn set_cache_enabled(&mut self, id: NodeId, enabled: bool) {
        if !self.nodes.is_alive(id) {
            return;
        }
        let i = id.idx as usize;
        if self.nodes.flags[i].cache_enabled == enabled {
            return;
        }
        self.nodes.flags[i].cache_enabled = enabled;
        self.nodes.region[i].clear();
        self.register_for_redraw(id);
    }

    /// Replaces the node's widget.
    ///
    /// A node with children only accepts another container.
    pub fn set_widget<W: Widget + 'static>(
        &mut self,
        id: NodeId,
        widget: W,
    ) -> Result<(), TreeError> {
        self.check_alive(id)?;
        let i = id.idx;
        let children = self.nodes.child_indices(i);
        if !children.is_empty() && !widget.is_container() {
            return Err(TreeError::NotAContainer(id));
        }
        let widget: Arc<dyn Widget> = Arc::new(widget);
        // Drop child aspects the new container positions itself.
        let allowed = widget.constrain_child_aspects(AspectMask::ALL);
        for &c in &children {
            let pending = &mut self.nodes.pending[c as usize];
            *pending = *pending & allowed;
        }
        self.nodes.widget[i as usize] = widget;

        self.register_at(i, AspectMask::ALL);
        for &c in &children {
            self.register_at(c, AspectMask::ALL);
        }
        self.register_for_redraw(id);
        let mut tracer = Tracer::none();
        for axis in Axis::ALL {
            self.content_size_changed(i, axis, &mut tracer);
        }
        Ok(())
    }

    /// Resizes the surface root.
    pub fn resize(&mut self, size: Size) {
        let i = self.root.idx;
        let old = self.nodes.slot[i as usize].size();
        if old == size {
            return;
        }
        self.nodes.width[i as usize] = Measure::Fixed(size.width);
        self.nodes.height[i as usize] = Measure::Fixed(size.height);
        self.nodes.slot[i as usize] = size.to_rect();
        self.nodes.dirty[i as usize] = true;
        for axis in Axis::ALL {
            if axis.extent(old) != axis.extent(size) {
                self.cascade_to_children(i, axis);
            }
        }
    }

    // -- Registration --

    /// Requests resolution of the aspects in `mask`.
    ///
    /// Aspects already pending, the position of a stretched axis, and
    /// aspects the parent takes over are filtered out. Does nothing for
    /// stale, detached, or root nodes.
    pub fn register_for_layouting(&mut self, id: NodeId, mask: AspectMask) {
        if self.nodes.is_alive(id) {
            self.register_at(id.idx, mask);
        }
    }

    pub(crate) fn register_at(&mut self, idx: u32, mask: AspectMask) {
        if idx == self.root.idx || !self.attached_at(idx) {
            return;
        }
        let i = idx as usize;
        let mut mask = mask;
        for axis in Axis::ALL {
            if self.nodes.effective_measure_at(idx, axis).is_stretch() {
                let pos = axis.position_aspect();
                mask.remove(pos);
                self.nodes.pending[i].remove(pos);
            }
        }
        mask = mask - self.nodes.pending[i];
        if !self.nodes.widget[i].arranges_children() {
            mask.remove(LayoutAspect::ArrangeChildren);
        }
        let p = self.nodes.parent[i] as usize;
        mask = self.nodes.widget[p].constrain_child_aspects(mask);
        mask = mask - self.nodes.pending[i];
        if mask.is_empty() {
            return;
        }
        let id = NodeId {
            idx,
            generation: self.nodes.generation[i],
        };
        for aspect in LayoutAspect::ENQUEUE_ORDER {
            if mask.has(aspect) {
                self.nodes.pending[i].insert(aspect);
                self.scheduler.push(id, aspect);
            }
        }
    }

    /// Marks the node's rendering out of date.
    pub fn register_for_redraw(&mut self, id: NodeId) {
        if !self.nodes.is_alive(id) {
            return;
        }
        let i = id.idx as usize;
        self.nodes.dirty[i] = true;
        if self.nodes.pending[i].is_empty() {
            self.queue_for_clipping(id.idx);
        }
    }

    /// Marks the node's rendering out of date and, if it is sized by its
    /// content on either axis, requests its size again.
    pub fn register_for_graphic_update(&mut self, id: NodeId) {
        if !self.nodes.is_alive(id) {
            return;
        }
        let fit = Axis::ALL
            .iter()
            .any(|&axis| self.nodes.effective_measure_at(id.idx, axis).is_fit());
        if fit {
            self.nodes.dirty[id.idx as usize] = true;
            self.register_at(id.idx, AspectMask::SIZING);
        } else {
            self.register_for_redraw(id);
        }
    }

    /// Repaints the node's area without invalidating its cache.
    pub fn register_for_repaint(&mut self, id: NodeId) {
        if !self.nodes.is_alive(id) {
            return;
        }
        let i = id.idx as usize;
        if self.nodes.pending[i].is_empty() && !self.nodes.dirty[i] {
            self.queue_for_clipping(id.idx);
        }
    }

    pub(crate) fn queue_for_clipping(&mut self, idx: u32) {
        let i = idx as usize;
        if self.nodes.queued_for_clipping[i] {
            return;
        }
        self.nodes.queued_for_clipping[i] = true;
        self.clip_queue.push(NodeId {
            idx,
            generation: self.nodes.generation[i],
        });
    }

    /// Requests, for each child, its size along `axis` when it depends on
    /// this node, otherwise its position.
    pub(crate) fn cascade_to_children(&mut self, idx: u32, axis: Axis) {
        let size = AspectMask::of(axis.size_aspect());
        let pos = AspectMask::of(axis.position_aspect());
        for c in self.nodes.child_indices(idx) {
            let m = self.nodes.effective_measure_at(c, axis);
            let mask = if m.is_relative_to_parent() { size | pos } else { pos };
            self.register_at(c, mask);
        }
    }

    // -- Geometry queries --

    /// The node's rectangle in surface coordinates, or [`Rect::ZERO`] for a
    /// deleted node.
    #[must_use]
    pub fn screen_rect(&self, id: NodeId) -> Rect {
        if !self.nodes.is_alive(id) {
            return Rect::ZERO;
        }
        let slot = self.nodes.slot[id.idx as usize];
        let mut origin = slot.origin().to_vec2();
        let mut cur = self.nodes.parent[id.idx as usize];
        while cur != INVALID {
            origin += self.client_offset(cur);
            cur = self.nodes.parent[cur as usize];
        }
        Rect::from_origin_size(origin.to_point(), slot.size())
    }

    /// Offset from a child's slot space to the space of `idx`'s parent.
    fn client_offset(&self, idx: u32) -> Vec2 {
        let client = self.nodes.client_rect_at(idx).origin().to_vec2();
        client + self.nodes.slot[idx as usize].origin().to_vec2()
    }

    // -- Paint support --

    /// Records that `id` is being painted at its current slot: clears the
    /// dirty flag and hands over the damage accumulated in its region.
    pub fn commit_paint(&mut self, id: NodeId) -> Region {
        if !self.nodes.is_alive(id) {
            return Region::default();
        }
        let i = id.idx as usize;
        self.nodes.dirty[i] = false;
        self.nodes.last_painted[i] = Some(self.nodes.slot[i]);
        self.nodes.region[i].take()
    }

    /// Forgets where a hidden node was painted.
    pub fn forget_paint(&mut self, id: NodeId) {
        if !self.nodes.is_alive(id) {
            return;
        }
        self.nodes.last_painted[id.idx as usize] = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Color;
    use crate::widget::{Panel, Stack};

    fn tree() -> LayoutTree {
        LayoutTree::new(Size::new(200.0, 100.0))
    }

    #[test]
    fn attach_registers_all_aspects() {
        let mut t = tree();
        let root = t.root();
        let n = t.create_node(Panel::new(Color::WHITE));
        assert!(!t.is_attached(n));
        t.add_child(root, n).unwrap();
        assert!(t.is_attached(n));
        // A panel never arranges children; Inherit under the root is Stretch,
        // so no positions either.
        assert_eq!(t.nodes().pending(n), AspectMask::SIZING);
    }

    #[test]
    fn attach_errors() {
        let mut t = tree();
        let root = t.root();
        let leaf = t.create_node(Panel::new(Color::BLACK));
        let g = t.create_node(Group::new());
        let h = t.create_node(Group::new());
        t.add_child(root, leaf).unwrap();
        let orphan = t.create_node(Group::new());
        assert_eq!(t.add_child(leaf, orphan), Err(TreeError::NotAContainer(leaf)));
        assert_eq!(t.add_child(root, leaf), Err(TreeError::AlreadyAttached(leaf)));
        t.add_child(g, h).unwrap();
        assert_eq!(t.add_child(h, g), Err(TreeError::WouldCycle { parent: h, child: g }));
        assert_eq!(t.add_child(g, root), Err(TreeError::RootNode));
        assert_eq!(
            t.insert_child(g, 5, orphan),
            Err(TreeError::IndexOutOfRange { index: 5, len: 1 })
        );
        assert_eq!(t.delete_node(root), Err(TreeError::RootNode));
    }

    #[test]
    fn detached_registration_is_noop() {
        let mut t = tree();
        let n = t.create_node(Group::new());
        t.register_for_layouting(n, AspectMask::ALL);
        assert!(t.nodes().pending(n).is_empty());
        assert!(t.scheduler().is_empty());
    }

    #[test]
    fn stretch_never_queues_position() {
        let mut t = tree();
        let root = t.root();
        let n = t.create_node(Group::new());
        t.set_width(n, Measure::Fixed(50.0));
        t.add_child(root, n).unwrap();
        assert!(t.nodes().pending(n).has(LayoutAspect::X));
        t.set_width(n, Measure::Stretch);
        assert!(!t.nodes().pending(n).has(LayoutAspect::X));
        t.register_for_layouting(n, AspectMask::X);
        assert!(!t.nodes().pending(n).has(LayoutAspect::X));
        let live_x = t
            .scheduler()
            .items()
            .filter(|i| i.node == n && i.aspect == LayoutAspect::X)
            .count();
        // The item queued while Fixed is still there, as a tombstone.
        assert_eq!(live_x, 1);
    }

    #[test]
    fn stack_vetoes_child_position() {
        let mut t = tree();
        let root = t.root();
        let s = t.create_node(Stack::horizontal());
        let c = t.create_node(Panel::new(Color::WHITE));
        t.set_width(c, Measure::Fixed(10.0));
        t.set_height(c, Measure::Fixed(10.0));
        t.add_child(root, s).unwrap();
        t.add_child(s, c).unwrap();
        let pending = t.nodes().pending(c);
        assert!(!pending.has(LayoutAspect::X));
        assert!(pending.has(LayoutAspect::Y));
        assert!(t.nodes().pending(s).has(LayoutAspect::ArrangeChildren));
    }

    #[test]
    fn fixed_outside_bounds_is_ignored() {
        let mut t = tree();
        let n = t.create_node(Group::new());
        t.set_maximum_size(n, Size::new(100.0, 0.0));
        t.set_width(n, Measure::Fixed(150.0));
        assert_eq!(t.nodes().measure(n, Axis::Horizontal), Measure::Inherit);
        t.set_width(n, Measure::Fixed(0.5));
        assert_eq!(t.nodes().measure(n, Axis::Horizontal), Measure::Inherit);
        t.set_height(n, Measure::Fixed(500.0));
        assert_eq!(t.nodes().measure(n, Axis::Vertical), Measure::Fixed(500.0));
    }

    #[test]
    fn remove_child_tombstones_queue_items() {
        let mut t = tree();
        let root = t.root();
        let n = t.create_node(Group::new());
        t.add_child(root, n).unwrap();
        assert!(!t.scheduler().is_empty());
        t.remove_child(n);
        assert!(t.nodes().pending(n).is_empty());
        assert!(!t.is_attached(n));
    }

    #[test]
    fn delete_node_destroys_subtree() {
        let mut t = tree();
        let root = t.root();
        let g = t.create_node(Group::new());
        let c = t.create_node(Group::new());
        t.add_child(root, g).unwrap();
        t.add_child(g, c).unwrap();
        t.delete_node(g).unwrap();
        assert!(!t.nodes().is_alive(g));
        assert!(!t.nodes().is_alive(c));
        assert_eq!(t.nodes().node_count(), 1);
    }

    #[test]
    fn deleted_handles_are_inert() {
        let mut t = tree();
        let root = t.root();
        let gone = t.create_node(Group::new());
        t.add_child(root, gone).unwrap();
        t.delete_node(gone).unwrap();
        // Reuses the slot under a new generation.
        let fresh = t.create_node(Group::new());
        t.add_child(root, fresh).unwrap();
        assert_eq!(fresh.index(), gone.index());
        let pending = t.nodes().pending(fresh);

        t.set_width(gone, Measure::Fixed(10.0));
        t.set_height(gone, Measure::Fit);
        t.set_alignment(gone, Axis::Horizontal, Alignment::End);
        t.set_offset(gone, Axis::Vertical, 4.0);
        t.set_margin(gone, 2.0);
        t.set_minimum_size(gone, Size::new(1.0, 1.0));
        t.set_maximum_size(gone, Size::new(50.0, 50.0));
        t.set_visible(gone, false);
        t.set_enabled(gone, false);
        t.set_clip_to_client(gone, false);
        t.set_cache_enabled(gone, true);
        t.remove_child(gone);
        t.clear_children(gone);
        t.put_on_top(gone);
        t.put_on_bottom(gone);
        t.register_for_layouting(gone, AspectMask::ALL);
        t.register_for_redraw(gone);
        t.register_for_graphic_update(gone);
        t.register_for_repaint(gone);
        t.forget_paint(gone);
        assert!(t.commit_paint(gone).is_empty());
        assert_eq!(t.screen_rect(gone), Rect::ZERO);

        assert_eq!(t.set_widget(gone, Group::new()), Err(TreeError::StaleNode(gone)));
        assert_eq!(t.delete_node(gone), Err(TreeError::StaleNode(gone)));
        assert_eq!(t.add_child(root, gone), Err(TreeError::StaleNode(gone)));
        assert_eq!(t.add_child(gone, fresh), Err(TreeError::StaleNode(gone)));
        assert_eq!(t.insert_child(gone, 0, fresh), Err(TreeError::StaleNode(gone)));

        // The node now living in the slot is untouched.
        assert!(t.is_attached(fresh));
        assert_eq!(t.nodes().pending(fresh), pending);
        assert_eq!(t.nodes().measure(fresh, Axis::Horizontal), Measure::Inherit);
        assert_eq!(t.nodes().margin(fresh), 0.0);
        assert!(t.nodes().flags(fresh).visible);
        assert!(!t.nodes().flags(fresh).cache_enabled);
    }

    #[test]
    fn restack_changes_paint_order() {
        let mut t = tree();
        let root = t.root();
        let a = t.create_node(Group::new());
        let b = t.create_node(Group::new());
        let c = t.create_node(Group::new());
        for n in [a, b, c] {
            t.add_child(root, n).unwrap();
        }
        t.put_on_top(a);
        assert_eq!(t.nodes().children(root).collect::<Vec<_>>(), vec![b, c, a]);
        t.put_on_bottom(c);
        assert_eq!(t.nodes().children(root).collect::<Vec<_>>(), vec![c, b, a]);
        t.clear_children(root);
        assert_eq!(t.nodes().child_count(root), 0);
    }

    #[test]
    fn set_widget_rejects_leaf_with_children() {
        let mut t = tree();
        let g = t.create_node(Group::new());
        let c = t.create_node(Group::new());
        t.add_child(g, c).unwrap();
        assert_eq!(
            t.set_widget(g, Panel::new(Color::WHITE)),
            Err(TreeError::NotAContainer(g))
        );
        assert!(t.set_widget(g, Stack::vertical()).is_ok());
        assert_eq!(t.nodes().widget(g).kind(), "Stack");
    }

    #[test]
    fn screen_rect_accumulates_client_offsets() {
        let mut t = tree();
        let g = t.create_node(Group::new());
        let c = t.create_node(Group::new());
        t.add_child(g, c).unwrap();
        t.nodes.slot[g.idx as usize] = Rect::new(10.0, 20.0, 110.0, 70.0);
        t.nodes.margin[g.idx as usize] = 5.0;
        t.nodes.slot[c.idx as usize] = Rect::new(1.0, 2.0, 11.0, 12.0);
        assert_eq!(t.screen_rect(c), Rect::new(16.0, 27.0, 26.0, 37.0));
    }

    #[test]
    fn clipping_queue_deduplicates() {
        let mut t = tree();
        let root = t.root();
        let n = t.create_node(Group::new());
        t.add_child(root, n).unwrap();
        t.nodes.pending[n.idx as usize] = AspectMask::NONE;
        t.register_for_redraw(n);
        t.register_for_redraw(n);
        assert_eq!(t.pending_clips(), 1);
    }
}
