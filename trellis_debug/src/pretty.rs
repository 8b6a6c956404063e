// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Phase
//! timestamps are printed in microseconds since the sink was created.

use std::io::Write;
use std::time::{Duration, Instant};

use trellis_core::trace::{
    ArrangeEvent, AspectDeferredEvent, AspectResolvedEvent, CacheEvent, ClipEvent,
    ContentSizeEvent, DrainSummary, FramePaintedEvent, FrameSummary, NodePaintedEvent,
    PhaseBeginEvent, PhaseEndEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    epoch: Instant,
    /// Skip per-aspect layout events.
    quiet_layout: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("epoch", &self.epoch)
            .field("quiet_layout", &self.quiet_layout)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            epoch: Instant::now(),
            quiet_layout: false,
        }
    }

    /// Suppresses the per-item layout lines (resolved, deferred, content
    /// size, arrange), which dominate the output of large drains.
    #[must_use]
    pub fn quiet_layout(mut self) -> Self {
        self.quiet_layout = true;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn since_epoch_us(&self, t: Instant) -> f64 {
        us(t.saturating_duration_since(self.epoch))
    }
}

fn us(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1000.0
}

fn drain_line(s: &DrainSummary) -> String {
    format!(
        "steps={} resolved={} deferred={} tombstoned={} abandoned={} remaining={} outcome={:?}",
        s.steps, s.resolved, s.deferred, s.tombstoned, s.abandoned, s.remaining, s.outcome,
    )
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_aspect_resolved(&mut self, e: &AspectResolvedEvent) {
        if self.quiet_layout {
            return;
        }
        let changed = if e.changed { "changed" } else { "same" };
        let _ = writeln!(
            self.writer,
            "[resolve] {} {:?}={} {changed}",
            e.node, e.aspect, e.value,
        );
    }

    fn on_aspect_deferred(&mut self, e: &AspectDeferredEvent) {
        if self.quiet_layout {
            return;
        }
        let _ = writeln!(self.writer, "[defer] {} {:?}", e.node, e.aspect);
    }

    fn on_content_size(&mut self, e: &ContentSizeEvent) {
        if self.quiet_layout {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[content] {} {:?}={}",
            e.node, e.axis, e.extent,
        );
    }

    fn on_arrange(&mut self, e: &ArrangeEvent) {
        if self.quiet_layout {
            return;
        }
        let _ = writeln!(self.writer, "[arrange] {} moved={}", e.node, e.moved);
    }

    fn on_clip(&mut self, e: &ClipEvent) {
        let r = e.rect;
        let _ = writeln!(
            self.writer,
            "[clip] {} ({}, {})-({}, {})",
            e.node, r.x0, r.y0, r.x1, r.y1,
        );
    }

    fn on_drain(&mut self, s: &DrainSummary) {
        let _ = writeln!(self.writer, "[drain] {}", drain_line(s));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            self.since_epoch_us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            self.since_epoch_us(e.timestamp),
        );
    }

    fn on_cache_recreated(&mut self, e: &CacheEvent) {
        let _ = writeln!(
            self.writer,
            "[cache:new] {} {}x{}",
            e.node, e.size.width, e.size.height,
        );
    }

    fn on_cache_updated(&mut self, e: &CacheEvent) {
        let _ = writeln!(self.writer, "[cache:update] {} rects={}", e.node, e.rects);
    }

    fn on_node_painted(&mut self, e: &NodePaintedEvent) {
        let how = if e.cached { "cached" } else { "direct" };
        let _ = writeln!(self.writer, "[paint] {} {how}", e.node);
    }

    fn on_frame_painted(&mut self, e: &FramePaintedEvent) {
        let damage = if e.full {
            "full".to_owned()
        } else {
            format!("rects={}", e.damage_rects)
        };
        let _ = writeln!(
            self.writer,
            "[frame] frame={} damage={damage} nodes={}",
            e.frame_index, e.nodes_painted,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} layout={:.1}µs clipping={:.1}µs paint={:.1}µs damage={}",
            s.frame_index,
            us(s.layout),
            us(s.clipping),
            us(s.paint),
            s.damage_rects,
        );
        if let Some(drain) = &s.drain {
            let _ = writeln!(self.writer, "          {}", drain_line(drain));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::aspect::LayoutAspect;
    use trellis_core::node::NodeId;
    use trellis_core::scheduler::DrainOutcome;
    use trellis_core::trace::PhaseKind;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn phase_and_frame_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 3,
            phase: PhaseKind::Clipping,
            timestamp: Instant::now(),
        });
        sink.on_frame_painted(&FramePaintedEvent {
            frame_index: 3,
            full: false,
            damage_rects: 2,
            nodes_painted: 4,
        });
        let out = output(sink);
        assert!(out.contains("[phase:begin] frame=3 clipping"), "got: {out}");
        assert!(out.contains("damage=rects=2 nodes=4"), "got: {out}");
    }

    #[test]
    fn quiet_layout_drops_aspect_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new()).quiet_layout();
        sink.on_aspect_resolved(&AspectResolvedEvent {
            node: NodeId::from_raw(2, 0),
            aspect: LayoutAspect::Width,
            value: 12.0,
            changed: true,
        });
        sink.on_drain(&DrainSummary {
            steps: 5,
            resolved: 5,
            deferred: 0,
            tombstoned: 0,
            abandoned: 0,
            remaining: 0,
            outcome: DrainOutcome::Settled,
        });
        let out = output(sink);
        assert!(!out.contains("[resolve]"), "got: {out}");
        assert!(out.contains("[drain] steps=5"), "got: {out}");
        assert!(out.contains("outcome=Settled"), "got: {out}");
    }
}
