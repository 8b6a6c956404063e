// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property
//! access.

use std::sync::Arc;

use kurbo::{Rect, Size};

use super::id::{INVALID, NodeId};
use super::traverse::Children;
use crate::aspect::AspectMask;
use crate::measure::{Alignment, Axis, Measure};
use crate::region::Region;
use crate::widget::Widget;

/// Per-node boolean flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeFlags {
    /// Invisible nodes resolve to a zero size and are not painted.
    pub visible: bool,
    /// Disabled nodes are painted with a tint on top.
    pub enabled: bool,
    /// Whether the node keeps its rendering in a cache surface.
    pub cache_enabled: bool,
    /// Whether children are clipped to the client rectangle.
    pub clip_to_client: bool,
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self {
            visible: true,
            enabled: true,
            cache_enabled: false,
            clip_to_client: true,
        }
    }
}

/// Struct-of-arrays storage for all nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Destroyed nodes are recycled
/// via a free list, and generation counters make stale handles detectable.
/// Accessors panic on stale handles.
#[derive(Debug)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Properties (set through the tree) --
    pub(crate) widget: Vec<Arc<dyn Widget>>,
    pub(crate) width: Vec<Measure>,
    pub(crate) height: Vec<Measure>,
    pub(crate) h_align: Vec<Alignment>,
    pub(crate) v_align: Vec<Alignment>,
    pub(crate) left: Vec<f64>,
    pub(crate) top: Vec<f64>,
    pub(crate) margin: Vec<f64>,
    pub(crate) min_size: Vec<Size>,
    pub(crate) max_size: Vec<Size>,
    pub(crate) flags: Vec<NodeFlags>,

    // -- Layout state (written by the scheduler) --
    pub(crate) slot: Vec<Rect>,
    pub(crate) content_size: Vec<Size>,
    pub(crate) pending: Vec<AspectMask>,

    // -- Damage state --
    pub(crate) last_painted: Vec<Option<Rect>>,
    pub(crate) dirty: Vec<bool>,
    pub(crate) queued_for_clipping: Vec<bool>,
    pub(crate) region: Vec<Region>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            widget: Vec::new(),
            width: Vec::new(),
            height: Vec::new(),
            h_align: Vec::new(),
            v_align: Vec::new(),
            left: Vec::new(),
            top: Vec::new(),
            margin: Vec::new(),
            min_size: Vec::new(),
            max_size: Vec::new(),
            flags: Vec::new(),
            slot: Vec::new(),
            content_size: Vec::new(),
            pending: Vec::new(),
            last_painted: Vec::new(),
            dirty: Vec::new(),
            queued_for_clipping: Vec::new(),
            region: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    // -- Allocation API --

    /// Creates a detached node and returns its handle.
    ///
    /// Properties start at the engine defaults: `Inherit` sizes, centred,
    /// no margin, a minimum size of 1×1 and no maximum. The node starts dirty
    /// with a zero slot.
    pub fn create_node(&mut self, widget: Arc<dyn Widget>) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.widget[i] = widget;
            self.width[i] = Measure::Inherit;
            self.height[i] = Measure::Inherit;
            self.h_align[i] = Alignment::Center;
            self.v_align[i] = Alignment::Center;
            self.left[i] = 0.0;
            self.top[i] = 0.0;
            self.margin[i] = 0.0;
            self.min_size[i] = Size::new(1.0, 1.0);
            self.max_size[i] = Size::ZERO;
            self.flags[i] = NodeFlags::default();
            self.slot[i] = Rect::ZERO;
            self.content_size[i] = Size::ZERO;
            self.pending[i] = AspectMask::NONE;
            self.last_painted[i] = None;
            self.dirty[i] = true;
            self.queued_for_clipping[i] = false;
            self.region[i].clear();
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.widget.push(widget);
            self.width.push(Measure::Inherit);
            self.height.push(Measure::Inherit);
            self.h_align.push(Alignment::Center);
            self.v_align.push(Alignment::Center);
            self.left.push(0.0);
            self.top.push(0.0);
            self.margin.push(0.0);
            self.min_size.push(Size::new(1.0, 1.0));
            self.max_size.push(Size::ZERO);
            self.flags.push(NodeFlags::default());
            self.slot.push(Rect::ZERO);
            self.content_size.push(Size::ZERO);
            self.pending.push(AspectMask::NONE);
            self.last_painted.push(None);
            self.dirty.push(true);
            self.queued_for_clipping.push(false);
            self.region.push(Region::new());
            self.generation.push(0);
            idx
        };

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the node has children or if the handle is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );
        if self.parent[idx as usize] != INVALID {
            self.unlink(idx);
        }
        let i = idx as usize;
        self.pending[i] = AspectMask::NONE;
        self.queued_for_clipping[i] = false;
        self.region[i].clear();
        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.free_list.push(idx);
    }

    /// Returns whether the handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len && self.generation[id.idx as usize] == id.generation
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.id_at(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a node, in paint
    /// order (first child painted first).
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Number of direct children.
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Returns `true` if `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.validate(ancestor);
        self.validate(node);
        let mut cur = node.idx;
        while cur != INVALID {
            if cur == ancestor.idx {
                return true;
            }
            cur = self.parent[cur as usize];
        }
        false
    }

    // -- Property getters --

    /// The node's widget.
    #[must_use]
    pub fn widget(&self, id: NodeId) -> &Arc<dyn Widget> {
        self.validate(id);
        &self.widget[id.idx as usize]
    }

    /// Author-specified size policy along `axis`.
    #[must_use]
    pub fn measure(&self, id: NodeId, axis: Axis) -> Measure {
        self.validate(id);
        self.measure_at(id.idx, axis)
    }

    /// Alignment along `axis`.
    #[must_use]
    pub fn alignment(&self, id: NodeId, axis: Axis) -> Alignment {
        self.validate(id);
        match axis {
            Axis::Horizontal => self.h_align[id.idx as usize],
            Axis::Vertical => self.v_align[id.idx as usize],
        }
    }

    /// Explicit offset along `axis` (`left` or `top`).
    #[must_use]
    pub fn offset(&self, id: NodeId, axis: Axis) -> f64 {
        self.validate(id);
        match axis {
            Axis::Horizontal => self.left[id.idx as usize],
            Axis::Vertical => self.top[id.idx as usize],
        }
    }

    /// Margin between the slot and the client rectangle.
    #[must_use]
    pub fn margin(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.margin[id.idx as usize]
    }

    /// Minimum size.
    #[must_use]
    pub fn minimum_size(&self, id: NodeId) -> Size {
        self.validate(id);
        self.min_size[id.idx as usize]
    }

    /// Maximum size; zero components mean "no maximum".
    #[must_use]
    pub fn maximum_size(&self, id: NodeId) -> Size {
        self.validate(id);
        self.max_size[id.idx as usize]
    }

    /// Boolean flags.
    #[must_use]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Current slot, in the parent's client space.
    #[must_use]
    pub fn slot(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.slot[id.idx as usize]
    }

    /// Slot at the time the node was last painted, if ever.
    #[must_use]
    pub fn last_painted_slot(&self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.last_painted[id.idx as usize]
    }

    /// The client rectangle in the node's local space.
    #[must_use]
    pub fn client_rect(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.client_rect_at(id.idx)
    }

    /// Size demanded by the node's content.
    #[must_use]
    pub fn content_size(&self, id: NodeId) -> Size {
        self.validate(id);
        self.content_size[id.idx as usize]
    }

    /// Aspects currently queued for the node.
    #[must_use]
    pub fn pending(&self, id: NodeId) -> AspectMask {
        self.validate(id);
        self.pending[id.idx as usize]
    }

    /// Whether the node's rendering is out of date.
    #[must_use]
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.validate(id);
        self.dirty[id.idx as usize]
    }

    /// Damage accumulated since the node was last painted (local space).
    #[must_use]
    pub fn region(&self, id: NodeId) -> &Region {
        self.validate(id);
        &self.region[id.idx as usize]
    }

    // -- Raw-index helpers --

    pub(crate) fn id_at(&self, idx: u32) -> Option<NodeId> {
        (idx != INVALID).then(|| NodeId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    pub(crate) fn measure_at(&self, idx: u32, axis: Axis) -> Measure {
        match axis {
            Axis::Horizontal => self.width[idx as usize],
            Axis::Vertical => self.height[idx as usize],
        }
    }

    pub(crate) fn set_measure_at(&mut self, idx: u32, axis: Axis, m: Measure) {
        match axis {
            Axis::Horizontal => self.width[idx as usize] = m,
            Axis::Vertical => self.height[idx as usize] = m,
        }
    }

    /// The measure actually applied on `axis`: `Inherit` replaced by the
    /// parent's policy, `Stretch` for nodes without a parent.
    pub(crate) fn effective_measure_at(&self, idx: u32, axis: Axis) -> Measure {
        let mut cur = idx;
        loop {
            let m = self.measure_at(cur, axis);
            if m != Measure::Inherit {
                return if cur == idx { m } else { m.policy() };
            }
            let p = self.parent[cur as usize];
            if p == INVALID {
                return Measure::Stretch;
            }
            cur = p;
        }
    }

    pub(crate) fn client_rect_at(&self, idx: u32) -> Rect {
        let m = self.margin[idx as usize];
        let size = self.slot[idx as usize].size();
        Rect::new(m, m, size.width - m, size.height - m)
    }

    /// Removes `idx` from its parent's child list.
    pub(crate) fn unlink(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    /// Links `child` into `parent`'s child list before `before`, or at the
    /// end when `before` is [`INVALID`].
    pub(crate) fn link(&mut self, parent: u32, child: u32, before: u32) {
        self.parent[child as usize] = parent;
        if before == INVALID {
            self.next_sibling[child as usize] = INVALID;
            let first = self.first_child[parent as usize];
            if first == INVALID {
                self.first_child[parent as usize] = child;
                self.prev_sibling[child as usize] = INVALID;
            } else {
                let mut last = first;
                while self.next_sibling[last as usize] != INVALID {
                    last = self.next_sibling[last as usize];
                }
                self.next_sibling[last as usize] = child;
                self.prev_sibling[child as usize] = last;
            }
        } else {
            let prev = self.prev_sibling[before as usize];
            self.next_sibling[child as usize] = before;
            self.prev_sibling[child as usize] = prev;
            if prev == INVALID {
                self.first_child[parent as usize] = child;
            } else {
                self.next_sibling[prev as usize] = child;
            }
            self.prev_sibling[before as usize] = child;
        }
    }

    /// Raw index of the `n`th child of `parent`, or [`INVALID`].
    pub(crate) fn nth_child(&self, parent: u32, n: usize) -> u32 {
        let mut cur = self.first_child[parent as usize];
        for _ in 0..n {
            if cur == INVALID {
                break;
            }
            cur = self.next_sibling[cur as usize];
        }
        cur
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Color;
    use crate::widget::{Group, Panel};

    fn group() -> Arc<dyn Widget> {
        Arc::new(Group::new())
    }

    #[test]
    fn create_and_destroy() {
        let mut store = NodeStore::new();
        let id = store.create_node(group());
        assert!(store.is_alive(id));
        assert_eq!(store.node_count(), 1);
        store.destroy_node(id);
        assert!(!store.is_alive(id));
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = NodeStore::new();
        let a = store.create_node(group());
        store.destroy_node(a);
        let b = store.create_node(group());
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(!store.is_alive(a));
        assert!(store.is_alive(b));
    }

    #[test]
    fn defaults_on_reuse() {
        let mut store = NodeStore::new();
        let a = store.create_node(group());
        store.margin[a.idx as usize] = 7.0;
        store.flags[a.idx as usize].visible = false;
        store.destroy_node(a);
        let b = store.create_node(Arc::new(Panel::new(Color::WHITE)));
        assert_eq!(store.margin(b), 0.0);
        assert!(store.flags(b).visible);
        assert_eq!(store.minimum_size(b), Size::new(1.0, 1.0));
        assert_eq!(store.widget(b).kind(), "Panel");
    }

    #[test]
    fn link_orders_children() {
        let mut store = NodeStore::new();
        let p = store.create_node(group());
        let a = store.create_node(group());
        let b = store.create_node(group());
        let c = store.create_node(group());
        store.link(p.idx, a.idx, INVALID);
        store.link(p.idx, c.idx, INVALID);
        store.link(p.idx, b.idx, c.idx);
        let kids: Vec<_> = store.children(p).collect();
        assert_eq!(kids, vec![a, b, c]);
        assert_eq!(store.nth_child(p.idx, 2), c.idx);
        assert_eq!(store.nth_child(p.idx, 3), INVALID);

        store.unlink(b.idx);
        let kids: Vec<_> = store.children(p).collect();
        assert_eq!(kids, vec![a, c]);
        assert_eq!(store.parent(b), None);
    }

    #[test]
    fn ancestry() {
        let mut store = NodeStore::new();
        let p = store.create_node(group());
        let c = store.create_node(group());
        store.link(p.idx, c.idx, INVALID);
        assert!(store.is_ancestor_or_self(p, c));
        assert!(store.is_ancestor_or_self(c, c));
        assert!(!store.is_ancestor_or_self(c, p));
    }

    #[test]
    fn inherit_follows_parent_policy() {
        let mut store = NodeStore::new();
        let p = store.create_node(group());
        let c = store.create_node(group());
        store.link(p.idx, c.idx, INVALID);
        // A parentless Inherit resolves to Stretch, and so does its child.
        assert_eq!(store.effective_measure_at(c.idx, Axis::Horizontal), Measure::Stretch);
        store.width[p.idx as usize] = Measure::Fit;
        assert_eq!(store.effective_measure_at(c.idx, Axis::Horizontal), Measure::Fit);
        store.width[p.idx as usize] = Measure::Percent(40.0);
        assert_eq!(store.effective_measure_at(c.idx, Axis::Horizontal), Measure::Stretch);
        assert_eq!(store.effective_measure_at(p.idx, Axis::Horizontal), Measure::Percent(40.0));
    }

    #[test]
    fn client_rect_insets_margin() {
        let mut store = NodeStore::new();
        let id = store.create_node(group());
        store.slot[id.idx as usize] = Rect::new(10.0, 10.0, 110.0, 60.0);
        store.margin[id.idx as usize] = 5.0;
        assert_eq!(store.client_rect(id), Rect::new(5.0, 5.0, 95.0, 45.0));
    }

    #[test]
    #[should_panic(expected = "cannot destroy node with children")]
    fn destroy_with_children_panics() {
        let mut store = NodeStore::new();
        let p = store.create_node(group());
        let c = store.create_node(group());
        store.link(p.idx, c.idx, INVALID);
        store.destroy_node(p);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_slot() {
        let mut store = NodeStore::new();
        let id = store.create_node(group());
        store.destroy_node(id);
        let _ = store.slot(id);
    }
}
