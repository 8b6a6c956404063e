// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draining the layout queue.
//!
//! Each queue item resolves one [`LayoutAspect`] of one node. A resolution
//! either succeeds, writing the node's slot and requesting whatever depends
//! on the new value, or is deferred because a value it reads is itself still
//! pending. Deferred items go to the back of the queue. There is no separate
//! measure pass and arrange pass: the order emerges from the requeueing.
//!
//! | Aspect            | Reads                                   | Deferred while            |
//! |-------------------|-----------------------------------------|---------------------------|
//! | `Width`/`Height`  | measure, content size, parent client    | parent size pending       |
//! | `X`/`Y`           | offset, alignment, own size             | own or parent size pending|
//! | `ArrangeChildren` | children's slots                        | never                     |

use std::sync::Arc;

use crate::aspect::{AspectMask, LayoutAspect};
use crate::config::RenderConfig;
use crate::measure::{Axis, Measure};
use crate::node::{INVALID, NodeId};
use crate::scheduler::{ChangeKind, DrainOutcome, DrainReport};
use crate::trace::{
    AspectDeferredEvent, AspectResolvedEvent, ArrangeEvent, ContentSizeEvent, TraceSink, Tracer,
};
use crate::tree::LayoutTree;
use crate::widget::ChildExtent;

/// Outcome of resolving one aspect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resolution {
    Ready,
    Deferred,
}

impl LayoutTree {
    /// Drains the layout queue.
    pub fn drain(&mut self, config: &RenderConfig) -> DrainReport {
        self.drain_with(config, &mut Tracer::none())
    }

    /// Drains the layout queue, reporting each step to `sink`.
    pub fn drain_traced(
        &mut self,
        config: &RenderConfig,
        sink: &mut dyn TraceSink,
    ) -> DrainReport {
        self.drain_with(config, &mut Tracer::new(sink))
    }

    /// Drains the layout queue, reporting through an existing [`Tracer`].
    pub fn drain_with(
        &mut self,
        config: &RenderConfig,
        tracer: &mut Tracer<'_>,
    ) -> DrainReport {
        let limits = config.scheduler;
        let mut report = DrainReport::default();
        // Deferrals since the last successful resolution.
        let mut idle = 0_usize;

        loop {
            if report.steps >= limits.max_steps {
                if !self.scheduler.is_empty() {
                    report.outcome = DrainOutcome::Truncated;
                }
                break;
            }
            let Some(item) = self.scheduler.pop() else {
                break;
            };
            let i = item.node.idx as usize;
            if !self.nodes.is_alive(item.node) || !self.nodes.pending[i].has(item.aspect) {
                report.tombstoned += 1;
                continue;
            }

            report.steps += 1;
            self.nodes.pending[i].remove(item.aspect);
            match self.resolve(item.node, item.aspect, tracer) {
                Resolution::Ready => {
                    report.resolved += 1;
                    idle = 0;
                    if self.nodes.pending[i].is_empty() && self.nodes.dirty[i] {
                        self.queue_for_clipping(item.node.idx);
                    }
                }
                Resolution::Deferred => {
                    report.deferred += 1;
                    idle += 1;
                    self.nodes.pending[i].insert(item.aspect);
                    self.scheduler.requeue(item);
                    tracer.aspect_deferred(&AspectDeferredEvent {
                        node: item.node,
                        aspect: item.aspect,
                    });
                    if idle >= self.scheduler.len() {
                        report.outcome = DrainOutcome::Stalled;
                        break;
                    }
                }
            }
        }

        if report.outcome != DrainOutcome::Settled {
            self.carry_over(limits.max_discard_count, &mut report);
        }
        report.remaining = self.scheduler.len();
        report.changes = self.scheduler.take_changes();
        tracer.drain(&report.summary());
        report
    }

    /// Keeps unresolved items for the next drain, abandoning the ones that
    /// have been carried over too often.
    fn carry_over(&mut self, max_discards: u32, report: &mut DrainReport) {
        let nodes = &self.nodes;
        let abandoned = self.scheduler.carry_over(max_discards, |item| {
            nodes.is_alive(item.node) && nodes.pending[item.node.idx as usize].has(item.aspect)
        });
        log::debug!(
            "layout drain ended {:?} with {} items carried over",
            report.outcome,
            self.scheduler.len()
        );
        for item in abandoned {
            let i = item.node.idx as usize;
            self.nodes.pending[i].remove(item.aspect);
            log::warn!(
                "abandoning {} of {} after {} deferred drains",
                item.aspect.name(),
                item.node,
                item.discards - 1
            );
            report.abandoned.push((item.node, item.aspect));
            if self.nodes.pending[i].is_empty() && self.nodes.dirty[i] {
                self.queue_for_clipping(item.node.idx);
            }
        }
    }

    fn resolve(
        &mut self,
        node: NodeId,
        aspect: LayoutAspect,
        tracer: &mut Tracer<'_>,
    ) -> Resolution {
        match aspect {
            LayoutAspect::Width => self.resolve_size(node, Axis::Horizontal, tracer),
            LayoutAspect::Height => self.resolve_size(node, Axis::Vertical, tracer),
            LayoutAspect::X => self.resolve_position(node, Axis::Horizontal, tracer),
            LayoutAspect::Y => self.resolve_position(node, Axis::Vertical, tracer),
            LayoutAspect::ArrangeChildren => {
                self.arrange_children(node, tracer);
                Resolution::Ready
            }
        }
    }

    /// Returns `true` if the parent of `idx` still has its size pending.
    fn parent_size_pending(&self, idx: u32, axis: Axis) -> bool {
        let p = self.nodes.parent[idx as usize];
        p == INVALID || self.nodes.pending[p as usize].has(axis.size_aspect())
    }

    /// Returns `true` if the parent of `idx` positions its children itself
    /// along `axis`.
    fn parent_positions(&self, idx: u32, axis: Axis) -> bool {
        let p = self.nodes.parent[idx as usize];
        if p == INVALID {
            return false;
        }
        let pos = AspectMask::of(axis.position_aspect());
        !self.nodes.widget[p as usize]
            .constrain_child_aspects(pos)
            .contains(pos)
    }

    /// The extent of `idx` along `axis`, or `None` if it cannot be known yet.
    pub(crate) fn compute_size(&self, idx: u32, axis: Axis) -> Option<f64> {
        let i = idx as usize;
        if !self.nodes.flags[i].visible {
            return Some(0.0);
        }
        let raw = match self.nodes.effective_measure_at(idx, axis) {
            Measure::Fixed(v) => v,
            Measure::Fit => {
                axis.extent(self.nodes.content_size[i]) + 2.0 * self.nodes.margin[i]
            }
            Measure::Percent(pc) => {
                if self.parent_size_pending(idx, axis) {
                    return None;
                }
                let p = self.nodes.parent[i];
                let client = axis.extent(self.nodes.client_rect_at(p).size());
                (pc * client / 100.0).round()
            }
            Measure::Stretch | Measure::Inherit => {
                if self.parent_size_pending(idx, axis) {
                    return None;
                }
                let p = self.nodes.parent[i];
                let client = axis.extent(self.nodes.client_rect_at(p).size());
                let fit = self.nodes.effective_measure_at(p, axis).is_fit();
                let children = self.child_extents(p);
                self.nodes.widget[p as usize].stretch_extent(axis, client, &children, fit)
            }
        };
        if raw < 0.0 {
            return None;
        }
        let min = axis.extent(self.nodes.min_size[i]);
        let max = axis.extent(self.nodes.max_size[i]);
        Some(if raw < min {
            min
        } else if max > 0.0 && raw > max {
            max
        } else {
            raw
        })
    }

    fn resolve_size(&mut self, node: NodeId, axis: Axis, tracer: &mut Tracer<'_>) -> Resolution {
        let idx = node.idx;
        let Some(value) = self.compute_size(idx, axis) else {
            return Resolution::Deferred;
        };
        let i = idx as usize;
        let old = self.nodes.slot[i];
        let changed = axis.extent(old.size()) != value;
        let mut slot = axis.with_rect_extent(old, value);
        if self.nodes.effective_measure_at(idx, axis).is_stretch()
            && !self.parent_positions(idx, axis)
        {
            slot = axis.with_position(slot, 0.0);
        }
        let moved = slot.origin() != old.origin();
        self.nodes.slot[i] = slot;
        tracer.aspect_resolved(&AspectResolvedEvent {
            node,
            aspect: axis.size_aspect(),
            value,
            changed,
        });

        if changed || moved {
            self.nodes.dirty[i] = true;
        }
        if moved {
            self.scheduler.record(node, ChangeKind::Slot(axis.position_aspect()));
        }
        if changed {
            self.scheduler.record(node, ChangeKind::Slot(axis.size_aspect()));
            // Alignment-derived positions depend on the size.
            self.register_at(idx, AspectMask::of(axis.position_aspect()));
            self.cascade_to_children(idx, axis);
            let p = self.nodes.parent[i];
            if p != INVALID {
                self.content_size_changed(p, axis, tracer);
            }
        }
        Resolution::Ready
    }

    fn resolve_position(
        &mut self,
        node: NodeId,
        axis: Axis,
        tracer: &mut Tracer<'_>,
    ) -> Resolution {
        let idx = node.idx;
        let i = idx as usize;
        if self.parent_size_pending(idx, axis) || self.nodes.pending[i].has(axis.size_aspect()) {
            return Resolution::Deferred;
        }
        let p = self.nodes.parent[i];
        let old = self.nodes.slot[i];
        let offset = match axis {
            Axis::Horizontal => self.nodes.left[i],
            Axis::Vertical => self.nodes.top[i],
        };
        let value = if offset != 0.0 {
            offset
        } else {
            let align = match axis {
                Axis::Horizontal => self.nodes.h_align[i],
                Axis::Vertical => self.nodes.v_align[i],
            };
            let available = axis.extent(self.nodes.client_rect_at(p).size());
            align.offset(available, axis.extent(old.size()))
        };
        let changed = axis.coord(old.origin()) != value;
        if changed {
            self.nodes.slot[i] = axis.with_position(old, value);
            self.nodes.dirty[i] = true;
            self.scheduler.record(node, ChangeKind::Slot(axis.position_aspect()));
        }
        tracer.aspect_resolved(&AspectResolvedEvent {
            node,
            aspect: axis.position_aspect(),
            value,
            changed,
        });
        Resolution::Ready
    }

    fn arrange_children(&mut self, node: NodeId, tracer: &mut Tracer<'_>) {
        let idx = node.idx;
        let widget = Arc::clone(&self.nodes.widget[idx as usize]);
        let children = self.nodes.child_indices(idx);
        let extents = self.child_extents(idx);
        let placed = widget.arrange(&extents);
        let owned = !widget.constrain_child_aspects(AspectMask::ALL);

        let mut moved = 0_u32;
        for (&c, point) in children.iter().zip(placed) {
            let ci = c as usize;
            let old = self.nodes.slot[ci];
            let mut slot = old;
            if owned.has(LayoutAspect::X) {
                slot = Axis::Horizontal.with_position(slot, point.x);
            }
            if owned.has(LayoutAspect::Y) {
                slot = Axis::Vertical.with_position(slot, point.y);
            }
            if slot == old {
                continue;
            }
            moved += 1;
            self.nodes.slot[ci] = slot;
            self.nodes.dirty[ci] = true;
            let child = NodeId {
                idx: c,
                generation: self.nodes.generation[ci],
            };
            for axis in Axis::ALL {
                if axis.coord(slot.origin()) != axis.coord(old.origin()) {
                    self.scheduler.record(child, ChangeKind::Slot(axis.position_aspect()));
                }
            }
            if self.nodes.pending[ci].is_empty() {
                self.queue_for_clipping(c);
            }
        }
        self.scheduler.record(node, ChangeKind::Arranged);
        tracer.arrange(&ArrangeEvent { node, moved });
    }

    /// Recomputes the content size of `idx` along `axis` from its children
    /// and requests whatever depends on it.
    pub(crate) fn content_size_changed(
        &mut self,
        idx: u32,
        axis: Axis,
        tracer: &mut Tracer<'_>,
    ) {
        let i = idx as usize;
        let widget = Arc::clone(&self.nodes.widget[i]);
        let children = self.child_extents(idx);
        let extent = widget.measure_content(axis, &children);
        if extent != axis.extent(self.nodes.content_size[i]) {
            self.nodes.content_size[i] = axis.with_extent(self.nodes.content_size[i], extent);
            let node = NodeId {
                idx,
                generation: self.nodes.generation[i],
            };
            self.scheduler.record(node, ChangeKind::ContentSize(axis));
            tracer.content_size(&ContentSizeEvent { node, axis, extent });
            if self.nodes.effective_measure_at(idx, axis).is_fit() {
                self.register_at(idx, AspectMask::of(axis.size_aspect()));
            }
        }
        if widget.arranges_children() {
            self.register_at(idx, AspectMask::ARRANGE_CHILDREN);
        }
        if widget.shares_space(axis) {
            let size = AspectMask::of(axis.size_aspect());
            for (c, ext) in self.nodes.child_indices(idx).into_iter().zip(children) {
                if ext.visible && ext.measure(axis).is_stretch() {
                    self.register_at(c, size);
                }
            }
        }
    }

    /// What a container sees of each of its children.
    pub(crate) fn child_extents(&self, idx: u32) -> Vec<ChildExtent> {
        self.nodes
            .child_indices(idx)
            .into_iter()
            .map(|c| ChildExtent {
                slot: self.nodes.slot[c as usize],
                width: self.nodes.effective_measure_at(c, Axis::Horizontal),
                height: self.nodes.effective_measure_at(c, Axis::Vertical),
                visible: self.nodes.flags[c as usize].visible,
            })
            .collect()
    }
}
