// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: a snapshot of the visible tree for one frame.

use std::sync::Arc;

use kurbo::{Point, Rect, Size};
use trellis_core::config::RenderConfig;
use trellis_core::node::NodeId;
use trellis_core::region::Region;
use trellis_core::tree::LayoutTree;
use trellis_core::widget::Widget;

/// Cache work for a cache boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CachePlan {
    /// The cache must be regenerated from scratch.
    pub recreate: bool,
    /// Damage accumulated since the last paint, in the node's local space.
    pub damage: Region,
}

/// One visible node.
///
/// Items are stored in pre-order, so a parent always precedes its
/// children.
#[derive(Clone, Debug)]
pub struct PlanItem {
    /// The node this item was captured from.
    pub node: NodeId,
    /// The node's widget.
    pub widget: Arc<dyn Widget>,
    /// Top-left corner in the parent's local space.
    pub origin: Point,
    /// Slot size.
    pub size: Size,
    /// Client rectangle in the node's local space.
    pub client: Rect,
    /// Whether children are clipped to [`client`](Self::client).
    pub clip_to_client: bool,
    /// Whether the node is enabled.
    pub enabled: bool,
    /// Present when the node is painted through a render cache.
    pub cache: Option<CachePlan>,
    /// Indices of the visible children, in paint order.
    pub children: Vec<usize>,
}

impl PlanItem {
    /// The node's rectangle in its parent's local space.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.origin, self.size)
    }

    /// The node's rectangle in its own local space.
    #[must_use]
    pub fn local_bounds(&self) -> Rect {
        self.size.to_rect()
    }
}

/// Everything the compositor needs for one frame, detached from the tree.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    items: Vec<PlanItem>,
    damage: Region,
    full: bool,
    layout_pending: bool,
}

impl RenderPlan {
    /// Index of the surface root in [`items`](Self::items).
    pub const ROOT: usize = 0;

    /// Captures the visible tree.
    ///
    /// Every captured node is committed as painted: its dirty flag is
    /// cleared, its last painted slot recorded and its damage region moved
    /// into the plan. Hidden nodes forget where they were painted.
    ///
    /// Call after draining layout and processing clipping; pending layout is
    /// reported by [`layout_pending`](Self::layout_pending) and painted as
    /// it stands.
    pub fn capture(tree: &mut LayoutTree, config: &RenderConfig) -> Self {
        let root = tree.root();
        let mut plan = Self {
            items: Vec::new(),
            damage: Region::new(),
            full: tree.nodes().is_dirty(root),
            layout_pending: tree.has_pending_layout(),
        };
        plan.push(tree, root, Point::ZERO, config);
        plan
    }

    fn push(
        &mut self,
        tree: &mut LayoutTree,
        id: NodeId,
        origin: Point,
        config: &RenderConfig,
    ) -> usize {
        let nodes = tree.nodes();
        let size = nodes.slot(id).size();
        let flags = nodes.flags(id);
        let client = nodes.client_rect(id);
        let widget = Arc::clone(nodes.widget(id));
        let recreate = nodes.is_dirty(id);
        let children: Vec<NodeId> = nodes.children(id).collect();
        let is_root = id == tree.root();

        let damage = tree.commit_paint(id);
        let cache = if is_root {
            self.damage = damage;
            None
        } else {
            (flags.cache_enabled && config.cacheable(size.width, size.height))
                .then_some(CachePlan { recreate, damage })
        };

        let idx = self.items.len();
        self.items.push(PlanItem {
            node: id,
            widget,
            origin,
            size,
            client,
            clip_to_client: flags.clip_to_client,
            enabled: flags.enabled,
            cache,
            children: Vec::with_capacity(children.len()),
        });

        let offset = client.origin().to_vec2();
        for c in children {
            if !tree.nodes().flags(c).visible {
                tree.forget_paint(c);
                continue;
            }
            let child_origin = tree.nodes().slot(c).origin() + offset;
            let ci = self.push(tree, c, child_origin, config);
            self.items[idx].children.push(ci);
        }
        idx
    }

    /// Captured items, root first.
    #[must_use]
    pub fn items(&self) -> &[PlanItem] {
        &self.items
    }

    /// The item captured for `node`, if it is visible.
    #[must_use]
    pub fn find(&self, node: NodeId) -> Option<&PlanItem> {
        self.items.iter().find(|item| item.node == node)
    }

    /// Surface damage accumulated at the root.
    #[must_use]
    pub fn damage(&self) -> &Region {
        &self.damage
    }

    /// Returns `true` if the whole surface must be repainted.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Requests a repaint of the whole surface.
    pub fn force_full(&mut self) {
        self.full = true;
    }

    /// Returns `true` if layout work was still queued at capture.
    #[must_use]
    pub fn layout_pending(&self) -> bool {
        self.layout_pending
    }

    /// The surface rectangle.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.items
            .get(Self::ROOT)
            .map_or(Rect::ZERO, PlanItem::local_bounds)
    }

    /// Nodes painted through a cache this frame.
    pub fn cached_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items
            .iter()
            .filter(|item| item.cache.is_some())
            .map(|item| item.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::backend::Color;
    use trellis_core::measure::Measure;
    use trellis_core::widget::{Group, Panel};

    fn sized(tree: &mut LayoutTree, w: f64, h: f64) -> NodeId {
        let n = tree.create_node(Panel::new(Color::WHITE));
        tree.set_width(n, Measure::Fixed(w));
        tree.set_height(n, Measure::Fixed(h));
        n
    }

    #[test]
    fn capture_commits_and_skips_hidden() {
        let mut tree = LayoutTree::new(Size::new(100.0, 100.0));
        let root = tree.root();
        let g = tree.create_node(Group::new());
        tree.set_margin(g, 5.0);
        tree.set_cache_enabled(g, true);
        let a = sized(&mut tree, 10.0, 10.0);
        let b = sized(&mut tree, 10.0, 10.0);
        tree.add_child(root, g).unwrap();
        tree.add_child(g, a).unwrap();
        tree.add_child(g, b).unwrap();
        tree.set_visible(b, false);
        tree.drain(&RenderConfig::default());
        tree.process_clipping();

        let plan = RenderPlan::capture(&mut tree, &RenderConfig::default());
        assert!(plan.is_full());
        assert_eq!(plan.items().len(), 3);
        assert!(plan.find(b).is_none());
        let ga = plan.find(g).unwrap();
        assert!(ga.cache.as_ref().is_some_and(|c| c.recreate));
        // `a` is centred in g's 90×90 client area, which starts at (5, 5).
        assert_eq!(plan.find(a).unwrap().origin, Point::new(45.0, 45.0));
        assert_eq!(plan.cached_nodes().collect::<Vec<_>>(), vec![g]);
        assert!(!tree.nodes().is_dirty(g));
        assert_eq!(tree.nodes().last_painted_slot(b), None);

        let again = RenderPlan::capture(&mut tree, &RenderConfig::default());
        assert!(!again.is_full());
        assert!(again.damage().is_empty());
        assert!(!again.find(g).unwrap().cache.as_ref().unwrap().recreate);
    }

    #[test]
    fn oversized_cache_is_painted_directly() {
        let mut tree = LayoutTree::new(Size::new(100.0, 100.0));
        let root = tree.root();
        let n = sized(&mut tree, 80.0, 80.0);
        tree.set_cache_enabled(n, true);
        tree.add_child(root, n).unwrap();
        tree.drain(&RenderConfig::default());
        let config = RenderConfig {
            max_cache_size: 64.0,
            ..RenderConfig::default()
        };
        let plan = RenderPlan::capture(&mut tree, &config);
        assert!(plan.find(n).unwrap().cache.is_none());
    }
}
