// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for layout and painting.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! scheduler, the damage tracker and the compositor call as they work. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! Operational warnings (abandoned items, paint failures) do not go through
//! this module; they are reported through the `log` facade.

use std::time::{Duration, Instant};

use kurbo::{Rect, Size};

use crate::aspect::LayoutAspect;
use crate::measure::Axis;
use crate::node::NodeId;
use crate::scheduler::DrainOutcome;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a frame is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Draining the layout queue.
    Layout,
    /// Registering damage of nodes whose layout settled.
    Clipping,
    /// Painting the render plan.
    Paint,
}

impl PhaseKind {
    /// Lowercase name, for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Clipping => "clipping",
            Self::Paint => "paint",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a queue item resolves.
#[derive(Clone, Copy, Debug)]
pub struct AspectResolvedEvent {
    /// The node.
    pub node: NodeId,
    /// The resolved aspect.
    pub aspect: LayoutAspect,
    /// New value (position or extent); zero for `ArrangeChildren`.
    pub value: f64,
    /// Whether the slot changed.
    pub changed: bool,
}

/// Emitted when a queue item is deferred and requeued.
#[derive(Clone, Copy, Debug)]
pub struct AspectDeferredEvent {
    /// The node.
    pub node: NodeId,
    /// The deferred aspect.
    pub aspect: LayoutAspect,
}

/// Emitted when a node's content size changes.
#[derive(Clone, Copy, Debug)]
pub struct ContentSizeEvent {
    /// The node.
    pub node: NodeId,
    /// Axis that changed.
    pub axis: Axis,
    /// New content extent.
    pub extent: f64,
}

/// Emitted after a container arranged its children.
#[derive(Clone, Copy, Debug)]
pub struct ArrangeEvent {
    /// The container.
    pub node: NodeId,
    /// Number of children whose position changed.
    pub moved: u32,
}

/// Emitted when damage is added to a node's region.
#[derive(Clone, Copy, Debug)]
pub struct ClipEvent {
    /// The node whose region grew.
    pub node: NodeId,
    /// Damage in the node's local space.
    pub rect: Rect,
}

/// Emitted at the end of a drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrainSummary {
    /// Items processed (tombstones excluded).
    pub steps: u64,
    /// Items that resolved.
    pub resolved: u64,
    /// Items deferred and requeued.
    pub deferred: u64,
    /// Stale items skipped.
    pub tombstoned: u64,
    /// Items dropped after too many carry-overs.
    pub abandoned: u32,
    /// Items left for the next drain.
    pub remaining: usize,
    /// How the drain ended.
    pub outcome: DrainOutcome,
}

/// Marks the beginning of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Time at the start of the phase.
    pub timestamp: Instant,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Time at the end of the phase.
    pub timestamp: Instant,
}

/// Emitted when a render cache is regenerated or updated in place.
#[derive(Clone, Copy, Debug)]
pub struct CacheEvent {
    /// The cached node.
    pub node: NodeId,
    /// Size of the cache surface.
    pub size: Size,
    /// Number of damage rectangles redrawn; zero for a full regeneration.
    pub rects: u32,
}

/// Emitted after a node was painted.
#[derive(Clone, Copy, Debug)]
pub struct NodePaintedEvent {
    /// The node.
    pub node: NodeId,
    /// Whether it was blitted from a cache.
    pub cached: bool,
}

/// Emitted once a frame is composed.
#[derive(Clone, Copy, Debug)]
pub struct FramePaintedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Whether the whole surface was repainted.
    pub full: bool,
    /// Number of damage rectangles.
    pub damage_rects: u32,
    /// Nodes painted.
    pub nodes_painted: u32,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Time spent draining layout.
    pub layout: Duration,
    /// Time spent registering damage.
    pub clipping: Duration,
    /// Time spent painting.
    pub paint: Duration,
    /// The drain, if one ran.
    pub drain: Option<DrainSummary>,
    /// Damage rectangles in the composed frame.
    pub damage_rects: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a queue item resolves.
    fn on_aspect_resolved(&mut self, e: &AspectResolvedEvent) {
        _ = e;
    }

    /// Called when a queue item is deferred.
    fn on_aspect_deferred(&mut self, e: &AspectDeferredEvent) {
        _ = e;
    }

    /// Called when a content size changes.
    fn on_content_size(&mut self, e: &ContentSizeEvent) {
        _ = e;
    }

    /// Called after a container arranged its children.
    fn on_arrange(&mut self, e: &ArrangeEvent) {
        _ = e;
    }

    /// Called when damage is added to a region.
    fn on_clip(&mut self, e: &ClipEvent) {
        _ = e;
    }

    /// Called at the end of a drain.
    fn on_drain(&mut self, s: &DrainSummary) {
        _ = s;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a cache surface is regenerated.
    fn on_cache_recreated(&mut self, e: &CacheEvent) {
        _ = e;
    }

    /// Called when a cache surface is partially redrawn.
    fn on_cache_updated(&mut self, e: &CacheEvent) {
        _ = e;
    }

    /// Called after a node was painted.
    fn on_node_painted(&mut self, e: &NodePaintedEvent) {
        _ = e;
    }

    /// Called once a frame is composed.
    fn on_frame_painted(&mut self, e: &FramePaintedEvent) {
        _ = e;
    }

    /// Called with a per-frame timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Generates a `Tracer` method forwarding one event to the sink.
macro_rules! forward {
    ($(#[$doc:meta])* $name:ident => $sink_method:ident($ty:ty)) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$ty) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$sink_method(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    forward!(
        /// Emits an [`AspectResolvedEvent`].
        aspect_resolved => on_aspect_resolved(AspectResolvedEvent)
    );
    forward!(
        /// Emits an [`AspectDeferredEvent`].
        aspect_deferred => on_aspect_deferred(AspectDeferredEvent)
    );
    forward!(
        /// Emits a [`ContentSizeEvent`].
        content_size => on_content_size(ContentSizeEvent)
    );
    forward!(
        /// Emits an [`ArrangeEvent`].
        arrange => on_arrange(ArrangeEvent)
    );
    forward!(
        /// Emits a [`ClipEvent`].
        clip => on_clip(ClipEvent)
    );
    forward!(
        /// Emits a [`DrainSummary`].
        drain => on_drain(DrainSummary)
    );
    forward!(
        /// Emits a [`PhaseBeginEvent`].
        phase_begin => on_phase_begin(PhaseBeginEvent)
    );
    forward!(
        /// Emits a [`PhaseEndEvent`].
        phase_end => on_phase_end(PhaseEndEvent)
    );
    forward!(
        /// Emits a cache regeneration [`CacheEvent`].
        cache_recreated => on_cache_recreated(CacheEvent)
    );
    forward!(
        /// Emits a cache update [`CacheEvent`].
        cache_updated => on_cache_updated(CacheEvent)
    );
    forward!(
        /// Emits a [`NodePaintedEvent`].
        node_painted => on_node_painted(NodePaintedEvent)
    );
    forward!(
        /// Emits a [`FramePaintedEvent`].
        frame_painted => on_frame_painted(FramePaintedEvent)
    );
    forward!(
        /// Emits a [`FrameSummary`].
        frame_summary => on_frame_summary(FrameSummary)
    );
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    frame_index: u64,
    phase_starts: [Option<Instant>; 3],
    phase_ends: [Option<Instant>; 3],
    drain: Option<DrainSummary>,
    damage_rects: u32,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for `frame_index`.
    #[must_use]
    pub fn new(frame_index: u64) -> Self {
        Self {
            frame_index,
            phase_starts: [None; 3],
            phase_ends: [None; 3],
            drain: None,
            damage_rects: 0,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: Instant) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: Instant) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Records the drain result.
    pub fn set_drain(&mut self, drain: DrainSummary) {
        self.drain = Some(drain);
    }

    /// Records the number of damage rectangles in the frame.
    pub fn set_damage_rects(&mut self, n: u32) {
        self.damage_rects = n;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.frame_index,
            layout: self.phase_duration(PhaseKind::Layout),
            clipping: self.phase_duration(PhaseKind::Clipping),
            paint: self.phase_duration(PhaseKind::Paint),
            drain: self.drain,
            damage_rects: self.damage_rects,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> Duration {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Layout => 0,
        PhaseKind::Clipping => 1,
        PhaseKind::Paint => 2,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Layout,
            timestamp: Instant::now(),
        });
        sink.on_frame_painted(&FramePaintedEvent {
            frame_index: 0,
            full: true,
            damage_rects: 1,
            nodes_painted: 3,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_painted(&FramePaintedEvent {
            frame_index: 1,
            full: false,
            damage_rects: 0,
            nodes_painted: 0,
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let t0 = Instant::now();
        let mut builder = FrameSummaryBuilder::new(9);
        builder.phase_begin(PhaseKind::Layout, t0);
        builder.phase_end(PhaseKind::Layout, t0 + Duration::from_micros(300));
        builder.phase_begin(PhaseKind::Paint, t0 + Duration::from_micros(400));
        builder.phase_end(PhaseKind::Paint, t0 + Duration::from_micros(1400));
        builder.set_damage_rects(2);

        let summary = builder.finish();
        assert_eq!(summary.frame_index, 9);
        assert_eq!(summary.layout, Duration::from_micros(300));
        assert_eq!(summary.clipping, Duration::ZERO);
        assert_eq!(summary.paint, Duration::from_millis(1));
        assert_eq!(summary.damage_rects, 2);
        assert!(summary.drain.is_none());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        struct PhaseSink {
            phases: Vec<PhaseKind>,
        }
        impl TraceSink for PhaseSink {
            fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
                self.phases.push(e.phase);
            }
        }

        let mut sink = PhaseSink { phases: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: 3,
            phase: PhaseKind::Clipping,
            timestamp: Instant::now(),
        });
        drop(tracer);
        assert_eq!(sink.phases, &[PhaseKind::Clipping]);
    }
}
