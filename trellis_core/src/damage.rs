// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage tracking.
//!
//! When a node's layout settles with its rendering out of date, it is queued
//! for *clipping registration*: the area it covered when last painted and the
//! area it covers now are registered as damage in its parent. Damage then
//! bubbles toward the root with [`LayoutTree::register_clip`], accumulating
//! in the region of every clean cache boundary on the way. The root always
//! accumulates, so its region is the damage of the next frame.
//!
//! Bubbling stops early below a cache boundary that is already dirty: that
//! cache is regenerated in full and registers its whole slot itself.

use kurbo::{Point, Rect};

use crate::node::{INVALID, NodeId};
use crate::region::intersection;
use crate::trace::{ClipEvent, TraceSink, Tracer};
use crate::tree::LayoutTree;

impl LayoutTree {
    /// Registers damage for every node queued for clipping. Returns the
    /// number of nodes processed.
    pub fn process_clipping(&mut self) -> usize {
        self.process_clipping_with(&mut Tracer::none())
    }

    /// Like [`process_clipping`](Self::process_clipping), reporting each
    /// region update to `sink`.
    pub fn process_clipping_traced(&mut self, sink: &mut dyn TraceSink) -> usize {
        self.process_clipping_with(&mut Tracer::new(sink))
    }

    /// Like [`process_clipping`](Self::process_clipping), reporting through
    /// an existing [`Tracer`].
    pub fn process_clipping_with(&mut self, tracer: &mut Tracer<'_>) -> usize {
        let queue = core::mem::take(&mut self.clip_queue);
        let mut processed = 0;
        for id in queue {
            let i = id.idx as usize;
            if !self.nodes.is_alive(id) || !self.nodes.queued_for_clipping[i] {
                continue;
            }
            self.nodes.queued_for_clipping[i] = false;
            self.clipping_registration(id.idx, tracer);
            processed += 1;
        }
        processed
    }

    /// Registers the old and new areas of `idx` in its parent.
    fn clipping_registration(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        let i = idx as usize;
        let p = self.nodes.parent[i];
        if p == INVALID {
            return;
        }
        let slot = self.nodes.slot[i];
        match self.nodes.last_painted[i] {
            Some(old) if intersection(old, slot).is_some() => {
                self.register_clip_at(p, old.union(slot), tracer);
            }
            Some(old) => {
                self.register_clip_at(p, old, tracer);
                self.register_clip_at(p, slot, tracer);
            }
            None => self.register_clip_at(p, slot, tracer),
        }
    }

    /// Registers `rect`, given in `id`'s client space, as damage.
    ///
    /// The rectangle is clipped to the client rectangle (or to the node's
    /// bounds when it does not clip its children), added to the region of
    /// every clean cache boundary on the way up, and to the root's region.
    pub fn register_clip(&mut self, id: NodeId, rect: Rect) {
        if self.nodes.is_alive(id) {
            self.register_clip_at(id.idx, rect, &mut Tracer::none());
        }
    }

    pub(crate) fn register_clip_at(&mut self, idx: u32, rect: Rect, tracer: &mut Tracer<'_>) {
        let root = self.root().idx;
        let mut idx = idx;
        let mut rect = rect;
        loop {
            let i = idx as usize;
            let client = self.nodes.client_rect_at(idx);
            let local = rect + client.origin().to_vec2();
            let bounds = if self.nodes.flags[i].clip_to_client {
                client
            } else {
                self.nodes.slot[i].with_origin(Point::ZERO)
            };
            let Some(clipped) = intersection(local, bounds) else {
                return;
            };
            let flags = self.nodes.flags[i];
            if idx == root || (flags.cache_enabled && !self.nodes.dirty[i]) {
                self.nodes.region[i].union_rect(clipped);
                tracer.clip(&ClipEvent {
                    node: NodeId {
                        idx,
                        generation: self.nodes.generation[i],
                    },
                    rect: clipped,
                });
            }
            let p = self.nodes.parent[i];
            if p == INVALID {
                return;
            }
            let pi = p as usize;
            if p != root && self.nodes.flags[pi].cache_enabled && self.nodes.dirty[pi] {
                return;
            }
            rect = clipped + self.nodes.slot[i].origin().to_vec2();
            idx = p;
        }
    }
}
