// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The paint walk.
//!
//! [`Compositor::paint`] composes a [`RenderPlan`] into a target context,
//! top-down. A node without a usable cache is drawn straight into its
//! parent's context. A cache boundary is drawn into its own surface, which is
//! then blitted:
//!
//! - a dirty cache, one of the wrong size, or one left broken by an earlier
//!   failure is regenerated in full;
//! - a clean cache with accumulated damage is updated in place, redrawing
//!   only the damaged area;
//! - a clean cache without damage is blitted as is.
//!
//! Surfaces are owned here, keyed by node, so that the tree never holds
//! backend resources. Caches of nodes absent from a plan are released after
//! that plan is painted.

use std::collections::{HashMap, HashSet};

use trellis_core::backend::{DrawingContext, Surface, SurfaceFactory};
use trellis_core::config::RenderConfig;
use trellis_core::error::RenderError;
use trellis_core::node::NodeId;
use trellis_core::region::{Overlap, Region};
use trellis_core::trace::{CacheEvent, FramePaintedEvent, NodePaintedEvent, Tracer};

use crate::damage::FrameDamage;
use crate::plan::RenderPlan;

/// State of one paint call.
struct Pass<'p, 't> {
    plan: &'p RenderPlan,
    factory: &'p mut dyn SurfaceFactory,
    config: &'p RenderConfig,
    tracer: &'p mut Tracer<'t>,
    /// Caches with work this frame that have not been brought up to date.
    pending: HashSet<NodeId>,
    painted: u32,
}

/// Paints render plans and owns the render caches.
#[derive(Debug, Default)]
pub struct Compositor {
    caches: HashMap<NodeId, Box<dyn Surface>>,
    /// Caches whose contents cannot be trusted after a failed paint.
    broken: HashSet<NodeId>,
    frame_index: u64,
}

impl Compositor {
    /// A compositor without caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames painted, including failed ones.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Number of live cache surfaces.
    #[must_use]
    pub fn cache_count(&self) -> usize {
        self.caches.len()
    }

    /// The cache surface of `node`, if it has one.
    #[must_use]
    pub fn cache(&self, node: NodeId) -> Option<&dyn Surface> {
        self.caches.get(&node).map(|s| &**s)
    }

    /// Drops every cache surface.
    pub fn clear(&mut self) {
        self.caches.clear();
        self.broken.clear();
    }

    /// Marks every cache `plan` wanted refreshed for regeneration.
    ///
    /// Call when a captured plan is dropped without painting it: capture
    /// already consumed the dirty flags and damage of those caches.
    pub fn invalidate(&mut self, plan: &RenderPlan) {
        self.broken.extend(stale_caches(plan));
    }

    /// Paints `plan` into `target`, which must hold the previous frame.
    ///
    /// Only the damaged area is touched: it is clipped to, cleared when
    /// [`RenderConfig::clear_background`] is set, and repainted. On error the
    /// caches that were not brought up to date are kept but regenerated on
    /// the next paint; the caller should repaint the whole surface then.
    pub fn paint(
        &mut self,
        plan: &RenderPlan,
        target: &mut dyn DrawingContext,
        factory: &mut dyn SurfaceFactory,
        config: &RenderConfig,
        tracer: &mut Tracer<'_>,
    ) -> Result<FrameDamage, RenderError> {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let bounds = plan.bounds();
        let damage = if plan.is_full() {
            Region::from_rect(bounds)
        } else {
            plan.damage().intersect_rect(bounds)
        };
        let mut pass = Pass {
            plan,
            factory,
            config,
            tracer,
            pending: stale_caches(plan).collect(),
            painted: 0,
        };

        if !damage.is_empty() {
            if let Err(e) = self.paint_frame(&mut pass, target, &damage) {
                self.broken.extend(pass.pending.drain());
                return Err(e);
            }
        }
        // Damage outside every painted cache still leaves work undone.
        self.broken.extend(pass.pending.drain());
        self.release_unused(plan);

        let result = if plan.is_full() {
            FrameDamage::Full
        } else {
            FrameDamage::from_region(&damage)
        };
        pass.tracer.frame_painted(&FramePaintedEvent {
            frame_index,
            full: result.is_full(),
            damage_rects: u32::try_from(damage.len()).unwrap_or(u32::MAX),
            nodes_painted: pass.painted,
        });
        Ok(result)
    }

    fn paint_frame(
        &mut self,
        pass: &mut Pass<'_, '_>,
        target: &mut dyn DrawingContext,
        damage: &Region,
    ) -> Result<(), RenderError> {
        let plan = pass.plan;
        let Some(root) = plan.items().get(RenderPlan::ROOT) else {
            return Ok(());
        };
        target.save();
        target.clip_region(damage);
        if pass.config.clear_background {
            for r in damage.rects() {
                target.clear_rect(*r);
            }
        }
        let result = self.draw_content(pass, RenderPlan::ROOT, target, Some(damage));
        if result.is_ok() && !root.enabled {
            target.fill_rect(root.local_bounds(), pass.config.disabled_tint);
        }
        target.restore();
        result
    }

    /// Draws the node's own content and its children in the node's local
    /// space. With a `filter`, children outside it are skipped.
    fn draw_content(
        &mut self,
        pass: &mut Pass<'_, '_>,
        idx: usize,
        ctx: &mut dyn DrawingContext,
        filter: Option<&Region>,
    ) -> Result<(), RenderError> {
        let plan = pass.plan;
        let item = &plan.items()[idx];
        item.widget.draw(ctx, item.local_bounds());
        if item.children.is_empty() {
            return Ok(());
        }
        ctx.save();
        if item.clip_to_client {
            ctx.clip_rect(item.client);
        }
        let mut result = Ok(());
        for &c in &item.children {
            if filter.is_some_and(|f| f.overlap(plan.items()[c].rect()) == Overlap::Out) {
                continue;
            }
            result = self.paint_item(pass, c, ctx);
            if result.is_err() {
                break;
            }
        }
        ctx.restore();
        result
    }

    /// Paints one node into its parent's context.
    fn paint_item(
        &mut self,
        pass: &mut Pass<'_, '_>,
        idx: usize,
        ctx: &mut dyn DrawingContext,
    ) -> Result<(), RenderError> {
        let plan = pass.plan;
        let item = &plan.items()[idx];
        let cached = item.cache.is_some();
        if cached {
            self.refresh_cache(pass, idx)?;
            if let Some(surface) = self.caches.get(&item.node) {
                ctx.draw_surface(&**surface, item.origin)?;
            }
        } else {
            ctx.save();
            ctx.translate(item.origin.to_vec2());
            ctx.clip_rect(item.local_bounds());
            let result = self.draw_content(pass, idx, ctx, None);
            ctx.restore();
            result?;
        }
        if !item.enabled {
            ctx.fill_rect(item.rect(), pass.config.disabled_tint);
        }
        pass.painted += 1;
        pass.tracer.node_painted(&NodePaintedEvent {
            node: item.node,
            cached,
        });
        Ok(())
    }

    /// Brings the cache of a cache boundary up to date.
    fn refresh_cache(&mut self, pass: &mut Pass<'_, '_>, idx: usize) -> Result<(), RenderError> {
        let plan = pass.plan;
        let item = &plan.items()[idx];
        let Some(cache) = &item.cache else {
            return Ok(());
        };
        let fits = self
            .caches
            .get(&item.node)
            .is_some_and(|s| s.size() == item.size);

        if cache.recreate || !fits || self.broken.contains(&item.node) {
            let mut surface = pass.factory.create_surface(item.size)?;
            {
                let mut ctx = surface.context();
                self.draw_content(pass, idx, &mut *ctx, None)?;
            }
            // The old surface is only replaced once the new one is complete.
            self.caches.insert(item.node, surface);
            pass.tracer.cache_recreated(&CacheEvent {
                node: item.node,
                size: item.size,
                rects: 0,
            });
        } else if !cache.damage.is_empty() {
            let Some(mut surface) = self.caches.remove(&item.node) else {
                return Ok(());
            };
            let result = {
                let mut ctx = surface.context();
                ctx.clip_region(&cache.damage);
                for r in cache.damage.rects() {
                    ctx.clear_rect(*r);
                }
                self.draw_content(pass, idx, &mut *ctx, Some(&cache.damage))
            };
            self.caches.insert(item.node, surface);
            result?;
            pass.tracer.cache_updated(&CacheEvent {
                node: item.node,
                size: item.size,
                rects: u32::try_from(cache.damage.len()).unwrap_or(u32::MAX),
            });
        }
        pass.pending.remove(&item.node);
        self.broken.remove(&item.node);
        Ok(())
    }

    fn release_unused(&mut self, plan: &RenderPlan) {
        let live: HashSet<NodeId> = plan.cached_nodes().collect();
        let before = self.caches.len();
        self.caches.retain(|node, _| live.contains(node));
        self.broken.retain(|node| live.contains(node));
        if self.caches.len() < before {
            log::debug!("released {} render caches", before - self.caches.len());
        }
    }
}

/// Cache boundaries of `plan` that must be regenerated or partially redrawn.
fn stale_caches(plan: &RenderPlan) -> impl Iterator<Item = NodeId> + '_ {
    plan.items()
        .iter()
        .filter(|item| {
            item.cache
                .as_ref()
                .is_some_and(|c| c.recreate || !c.damage.is_empty())
        })
        .map(|item| item.node)
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size};
    use trellis_core::backend::Color;
    use trellis_core::measure::{Alignment, Axis, Measure};
    use trellis_core::tree::LayoutTree;
    use trellis_core::widget::{Group, Panel, Stack};

    use super::*;
    use crate::raster::{Bitmap, BitmapFactory};

    const RED: Color = Color::rgb8(200, 0, 0);
    const GREEN: Color = Color::rgb8(0, 160, 0);
    const BLUE: Color = Color::rgb8(0, 0, 220);
    const GREY: Color = Color::rgb8(90, 90, 90);

    struct Scene {
        tree: LayoutTree,
        group: NodeId,
        boxes: Vec<NodeId>,
    }

    fn panel(tree: &mut LayoutTree, color: Color, w: f64, h: f64) -> NodeId {
        let n = tree.create_node(Panel::new(color));
        tree.set_width(n, Measure::Fixed(w));
        tree.set_height(n, Measure::Fixed(h));
        n
    }

    /// A 64×48 surface with a grey cacheable group holding a stack of boxes.
    fn scene(cache: bool) -> Scene {
        let mut tree = LayoutTree::new(Size::new(64.0, 48.0));
        let root = tree.root();
        let group = tree.create_node(Group::with_background(GREY));
        tree.set_width(group, Measure::Fixed(40.0));
        tree.set_height(group, Measure::Fixed(30.0));
        tree.set_margin(group, 3.0);
        tree.set_cache_enabled(group, cache);
        tree.add_child(root, group).unwrap();

        let stack = tree.create_node(Stack::horizontal().with_spacing(1.0));
        tree.set_alignment(stack, Axis::Vertical, Alignment::Start);
        tree.set_height(stack, Measure::Fit);
        tree.add_child(group, stack).unwrap();
        let mut boxes = Vec::new();
        for color in [RED, GREEN, BLUE] {
            let b = panel(&mut tree, color, 6.0, 6.0);
            tree.add_child(stack, b).unwrap();
            boxes.push(b);
        }
        Scene { tree, group, boxes }
    }

    fn frame(
        scene: &mut Scene,
        compositor: &mut Compositor,
        factory: &mut BitmapFactory,
        target: &mut Bitmap,
    ) -> Result<FrameDamage, RenderError> {
        let config = RenderConfig::default();
        assert!(scene.tree.drain(&config).is_settled());
        scene.tree.process_clipping();
        let plan = RenderPlan::capture(&mut scene.tree, &config);
        compositor.paint(&plan, &mut target.canvas(), factory, &config, &mut Tracer::none())
    }

    fn mutate(scene: &mut Scene) {
        let t = &mut scene.tree;
        t.set_widget(scene.boxes[1], Panel::new(BLUE)).unwrap();
        t.set_width(scene.boxes[0], Measure::Fixed(9.0));
        t.set_enabled(scene.boxes[2], false);
    }

    #[test]
    fn cached_and_direct_paint_match() {
        let mut direct = scene(false);
        let mut cached = scene(true);
        let (mut a, mut b) = (Bitmap::new(64, 48), Bitmap::new(64, 48));
        let mut fa = BitmapFactory::new();
        let mut fb = BitmapFactory::new();
        let mut ca = Compositor::new();
        let mut cb = Compositor::new();

        frame(&mut direct, &mut ca, &mut fa, &mut a).unwrap();
        frame(&mut cached, &mut cb, &mut fb, &mut b).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.pixel(12, 9), Some(GREY));
        assert_eq!(cb.cache_count(), 1);
        assert_eq!(ca.cache_count(), 0);

        mutate(&mut direct);
        mutate(&mut cached);
        let da = frame(&mut direct, &mut ca, &mut fa, &mut a).unwrap();
        let db = frame(&mut cached, &mut cb, &mut fb, &mut b).unwrap();
        assert_eq!(a, b);
        assert!(!da.is_full());
        assert_eq!(da, db);

        // Incremental frames end where a single full frame of the final
        // state does.
        let mut fresh = scene(false);
        mutate(&mut fresh);
        let mut c = Bitmap::new(64, 48);
        frame(&mut fresh, &mut Compositor::new(), &mut BitmapFactory::new(), &mut c).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn clean_cache_is_updated_in_place() {
        let mut s = scene(true);
        let mut target = Bitmap::new(64, 48);
        let mut factory = BitmapFactory::new();
        let mut comp = Compositor::new();
        frame(&mut s, &mut comp, &mut factory, &mut target).unwrap();
        assert_eq!(factory.surfaces_created(), 1);

        s.tree.set_widget(s.boxes[0], Panel::new(GREEN)).unwrap();
        let damage = frame(&mut s, &mut comp, &mut factory, &mut target).unwrap();
        // Same surface, redrawn where the box is.
        assert_eq!(factory.surfaces_created(), 1);
        let rects = damage.rects(Rect::ZERO);
        assert_eq!(rects.len(), 1);
        // The group sits at (12, 9) and the first box at its client origin.
        assert_eq!(s.tree.screen_rect(s.group), Rect::new(12.0, 9.0, 52.0, 39.0));
        assert_eq!(s.tree.screen_rect(s.boxes[0]), Rect::new(15.0, 12.0, 21.0, 18.0));
        let cache = comp.cache(s.group).unwrap();
        let bitmap = cache.as_any().downcast_ref::<Bitmap>().unwrap();
        assert_eq!(bitmap.pixel(3, 3), Some(GREEN));
        assert_eq!(target.pixel(15, 12), Some(GREEN));
        assert_eq!(target.pixel(13, 10), Some(GREY));
    }

    #[test]
    fn nothing_changed_paints_nothing() {
        let mut s = scene(true);
        let mut target = Bitmap::new(64, 48);
        let mut factory = BitmapFactory::new();
        let mut comp = Compositor::new();
        assert!(frame(&mut s, &mut comp, &mut factory, &mut target).unwrap().is_full());
        let damage = frame(&mut s, &mut comp, &mut factory, &mut target).unwrap();
        assert!(damage.is_empty());
    }

    #[test]
    fn invalidated_plan_regenerates_its_caches() {
        let mut s = scene(true);
        let mut target = Bitmap::new(64, 48);
        let mut factory = BitmapFactory::new();
        let mut comp = Compositor::new();
        frame(&mut s, &mut comp, &mut factory, &mut target).unwrap();

        // Captured, then dropped unpainted.
        s.tree.set_widget(s.boxes[0], Panel::new(GREEN)).unwrap();
        let config = RenderConfig::default();
        assert!(s.tree.drain(&config).is_settled());
        s.tree.process_clipping();
        let plan = RenderPlan::capture(&mut s.tree, &config);
        comp.invalidate(&plan);

        let mut next = RenderPlan::capture(&mut s.tree, &config);
        next.force_full();
        let mut tracer = Tracer::none();
        comp.paint(&next, &mut target.canvas(), &mut factory, &config, &mut tracer).unwrap();
        assert_eq!(factory.surfaces_created(), 2);
        assert_eq!(target.pixel(15, 12), Some(GREEN));
    }

    #[test]
    fn failed_allocation_keeps_old_cache() {
        let mut s = scene(true);
        let mut target = Bitmap::new(64, 48);
        let mut factory = BitmapFactory::new();
        let mut comp = Compositor::new();
        frame(&mut s, &mut comp, &mut factory, &mut target).unwrap();
        let before = comp
            .cache(s.group)
            .and_then(|c| c.as_any().downcast_ref::<Bitmap>())
            .cloned()
            .unwrap();

        // Growing the group forces a new surface.
        s.tree.set_width(s.group, Measure::Fixed(44.0));
        factory.set_limit(Some(100));
        let err = frame(&mut s, &mut comp, &mut factory, &mut target).unwrap_err();
        assert_eq!(
            err,
            RenderError::SurfaceAllocation {
                width: 44,
                height: 30
            }
        );
        let kept = comp.cache(s.group).and_then(|c| c.as_any().downcast_ref::<Bitmap>());
        assert_eq!(kept, Some(&before));

        factory.set_limit(None);
        s.tree.register_for_repaint(s.group);
        frame(&mut s, &mut comp, &mut factory, &mut target).unwrap();
        assert_eq!(comp.cache(s.group).map(|c| c.size()), Some(Size::new(44.0, 30.0)));
    }

    #[test]
    fn caches_of_removed_nodes_are_released() {
        let mut s = scene(true);
        let mut target = Bitmap::new(64, 48);
        let mut factory = BitmapFactory::new();
        let mut comp = Compositor::new();
        frame(&mut s, &mut comp, &mut factory, &mut target).unwrap();
        assert_eq!(comp.cache_count(), 1);

        s.tree.remove_child(s.group);
        let damage = frame(&mut s, &mut comp, &mut factory, &mut target).unwrap();
        assert_eq!(comp.cache_count(), 0);
        assert_eq!(damage.rects(Rect::ZERO), vec![Rect::new(12.0, 9.0, 52.0, 39.0)]);
        assert_eq!(target.pixel(20, 20), Some(Color::TRANSPARENT));
    }
}
