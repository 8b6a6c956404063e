// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].
//!
//! Phase timestamps are stored relative to the moment the recorder was
//! created, since an [`Instant`] cannot be serialized.

use std::time::{Duration, Instant};

use kurbo::{Rect, Size};
use trellis_core::aspect::LayoutAspect;
use trellis_core::measure::Axis;
use trellis_core::node::NodeId;
use trellis_core::scheduler::DrainOutcome;
use trellis_core::trace::{
    ArrangeEvent, AspectDeferredEvent, AspectResolvedEvent, CacheEvent, ClipEvent,
    ContentSizeEvent, DrainSummary, FramePaintedEvent, FrameSummary, NodePaintedEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_ASPECT_RESOLVED: u8 = 1;
const TAG_ASPECT_DEFERRED: u8 = 2;
const TAG_CONTENT_SIZE: u8 = 3;
const TAG_ARRANGE: u8 = 4;
const TAG_CLIP: u8 = 5;
const TAG_DRAIN: u8 = 6;
const TAG_PHASE_BEGIN: u8 = 7;
const TAG_PHASE_END: u8 = 8;
const TAG_CACHE_RECREATED: u8 = 9;
const TAG_CACHE_UPDATED: u8 = 10;
const TAG_NODE_PAINTED: u8 = 11;
const TAG_FRAME_PAINTED: u8 = 12;
const TAG_FRAME_SUMMARY: u8 = 13;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    epoch: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self::with_epoch(Instant::now())
    }

    /// Creates an empty recorder measuring phase timestamps from `epoch`.
    #[must_use]
    pub fn with_epoch(epoch: Instant) -> Self {
        Self {
            buf: Vec::new(),
            epoch,
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_usize(&mut self, v: usize) {
        self.write_u64(u64::try_from(v).unwrap_or(u64::MAX));
    }

    fn write_duration(&mut self, d: Duration) {
        self.write_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
    }

    fn write_instant(&mut self, t: Instant) {
        self.write_duration(t.saturating_duration_since(self.epoch));
    }

    fn write_node(&mut self, n: NodeId) {
        self.write_u32(n.index());
        self.write_u32(n.generation());
    }

    fn write_rect(&mut self, r: Rect) {
        self.write_f64(r.x0);
        self.write_f64(r.y0);
        self.write_f64(r.x1);
        self.write_f64(r.y1);
    }

    fn write_size(&mut self, s: Size) {
        self.write_f64(s.width);
        self.write_f64(s.height);
    }

    fn write_aspect(&mut self, a: LayoutAspect) {
        self.write_u8(match a {
            LayoutAspect::X => 0,
            LayoutAspect::Y => 1,
            LayoutAspect::Width => 2,
            LayoutAspect::Height => 3,
            LayoutAspect::ArrangeChildren => 4,
        });
    }

    fn write_axis(&mut self, a: Axis) {
        self.write_u8(match a {
            Axis::Horizontal => 0,
            Axis::Vertical => 1,
        });
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Layout => 0,
            PhaseKind::Clipping => 1,
            PhaseKind::Paint => 2,
        });
    }

    fn write_drain(&mut self, s: &DrainSummary) {
        self.write_u64(s.steps);
        self.write_u64(s.resolved);
        self.write_u64(s.deferred);
        self.write_u64(s.tombstoned);
        self.write_u32(s.abandoned);
        self.write_usize(s.remaining);
        self.write_u8(match s.outcome {
            DrainOutcome::Settled => 0,
            DrainOutcome::Stalled => 1,
            DrainOutcome::Truncated => 2,
        });
    }

    fn write_cache(&mut self, tag: u8, e: &CacheEvent) {
        self.write_u8(tag);
        self.write_node(e.node);
        self.write_size(e.size);
        self.write_u32(e.rects);
    }
}

impl TraceSink for RecorderSink {
    fn on_aspect_resolved(&mut self, e: &AspectResolvedEvent) {
        self.write_u8(TAG_ASPECT_RESOLVED);
        self.write_node(e.node);
        self.write_aspect(e.aspect);
        self.write_f64(e.value);
        self.write_bool(e.changed);
    }

    fn on_aspect_deferred(&mut self, e: &AspectDeferredEvent) {
        self.write_u8(TAG_ASPECT_DEFERRED);
        self.write_node(e.node);
        self.write_aspect(e.aspect);
    }

    fn on_content_size(&mut self, e: &ContentSizeEvent) {
        self.write_u8(TAG_CONTENT_SIZE);
        self.write_node(e.node);
        self.write_axis(e.axis);
        self.write_f64(e.extent);
    }

    fn on_arrange(&mut self, e: &ArrangeEvent) {
        self.write_u8(TAG_ARRANGE);
        self.write_node(e.node);
        self.write_u32(e.moved);
    }

    fn on_clip(&mut self, e: &ClipEvent) {
        self.write_u8(TAG_CLIP);
        self.write_node(e.node);
        self.write_rect(e.rect);
    }

    fn on_drain(&mut self, s: &DrainSummary) {
        self.write_u8(TAG_DRAIN);
        self.write_drain(s);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_instant(e.timestamp);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_instant(e.timestamp);
    }

    fn on_cache_recreated(&mut self, e: &CacheEvent) {
        self.write_cache(TAG_CACHE_RECREATED, e);
    }

    fn on_cache_updated(&mut self, e: &CacheEvent) {
        self.write_cache(TAG_CACHE_UPDATED, e);
    }

    fn on_node_painted(&mut self, e: &NodePaintedEvent) {
        self.write_u8(TAG_NODE_PAINTED);
        self.write_node(e.node);
        self.write_bool(e.cached);
    }

    fn on_frame_painted(&mut self, e: &FramePaintedEvent) {
        self.write_u8(TAG_FRAME_PAINTED);
        self.write_u64(e.frame_index);
        self.write_bool(e.full);
        self.write_u32(e.damage_rects);
        self.write_u32(e.nodes_painted);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_duration(s.layout);
        self.write_duration(s.clipping);
        self.write_duration(s.paint);
        match &s.drain {
            Some(d) => {
                self.write_u8(1);
                self.write_drain(d);
            }
            None => self.write_u8(0),
        }
        self.write_u32(s.damage_rects);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// An [`AspectResolvedEvent`].
    AspectResolved(AspectResolvedEvent),
    /// An [`AspectDeferredEvent`].
    AspectDeferred(AspectDeferredEvent),
    /// A [`ContentSizeEvent`].
    ContentSize(ContentSizeEvent),
    /// An [`ArrangeEvent`].
    Arrange(ArrangeEvent),
    /// A [`ClipEvent`].
    Clip(ClipEvent),
    /// A [`DrainSummary`].
    Drain(DrainSummary),
    /// Start of a phase.
    PhaseBegin {
        /// Frame counter.
        frame_index: u64,
        /// Which phase.
        phase: PhaseKind,
        /// Time since the recorder's epoch.
        at: Duration,
    },
    /// End of a phase.
    PhaseEnd {
        /// Frame counter.
        frame_index: u64,
        /// Which phase.
        phase: PhaseKind,
        /// Time since the recorder's epoch.
        at: Duration,
    },
    /// A cache regeneration.
    CacheRecreated(CacheEvent),
    /// A partial cache update.
    CacheUpdated(CacheEvent),
    /// A [`NodePaintedEvent`].
    NodePainted(NodePaintedEvent),
    /// A [`FramePaintedEvent`].
    FramePainted(FramePaintedEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|v| v != 0)
    }

    fn read_usize(&mut self) -> Option<usize> {
        self.read_u64()
            .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
    }

    fn read_duration(&mut self) -> Option<Duration> {
        self.read_u64().map(Duration::from_nanos)
    }

    fn read_node(&mut self) -> Option<NodeId> {
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(NodeId::from_raw(index, generation))
    }

    fn read_rect(&mut self) -> Option<Rect> {
        Some(Rect::new(
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
        ))
    }

    fn read_size(&mut self) -> Option<Size> {
        Some(Size::new(self.read_f64()?, self.read_f64()?))
    }

    fn read_aspect(&mut self) -> Option<LayoutAspect> {
        Some(match self.read_u8()? {
            0 => LayoutAspect::X,
            1 => LayoutAspect::Y,
            2 => LayoutAspect::Width,
            3 => LayoutAspect::Height,
            4 => LayoutAspect::ArrangeChildren,
            _ => return None,
        })
    }

    fn read_axis(&mut self) -> Option<Axis> {
        Some(match self.read_u8()? {
            0 => Axis::Horizontal,
            1 => Axis::Vertical,
            _ => return None,
        })
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Layout,
            1 => PhaseKind::Clipping,
            2 => PhaseKind::Paint,
            _ => return None,
        })
    }

    fn read_drain(&mut self) -> Option<DrainSummary> {
        Some(DrainSummary {
            steps: self.read_u64()?,
            resolved: self.read_u64()?,
            deferred: self.read_u64()?,
            tombstoned: self.read_u64()?,
            abandoned: self.read_u32()?,
            remaining: self.read_usize()?,
            outcome: match self.read_u8()? {
                0 => DrainOutcome::Settled,
                1 => DrainOutcome::Stalled,
                2 => DrainOutcome::Truncated,
                _ => return None,
            },
        })
    }

    fn read_cache(&mut self) -> Option<CacheEvent> {
        Some(CacheEvent {
            node: self.read_node()?,
            size: self.read_size()?,
            rects: self.read_u32()?,
        })
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let layout = self.read_duration()?;
        let clipping = self.read_duration()?;
        let paint = self.read_duration()?;
        let drain = match self.read_u8()? {
            0 => None,
            _ => Some(self.read_drain()?),
        };
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index,
            layout,
            clipping,
            paint,
            drain,
            damage_rects: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        Some(match tag {
            TAG_ASPECT_RESOLVED => RecordedEvent::AspectResolved(AspectResolvedEvent {
                node: self.read_node()?,
                aspect: self.read_aspect()?,
                value: self.read_f64()?,
                changed: self.read_bool()?,
            }),
            TAG_ASPECT_DEFERRED => RecordedEvent::AspectDeferred(AspectDeferredEvent {
                node: self.read_node()?,
                aspect: self.read_aspect()?,
            }),
            TAG_CONTENT_SIZE => RecordedEvent::ContentSize(ContentSizeEvent {
                node: self.read_node()?,
                axis: self.read_axis()?,
                extent: self.read_f64()?,
            }),
            TAG_ARRANGE => RecordedEvent::Arrange(ArrangeEvent {
                node: self.read_node()?,
                moved: self.read_u32()?,
            }),
            TAG_CLIP => RecordedEvent::Clip(ClipEvent {
                node: self.read_node()?,
                rect: self.read_rect()?,
            }),
            TAG_DRAIN => RecordedEvent::Drain(self.read_drain()?),
            TAG_PHASE_BEGIN => RecordedEvent::PhaseBegin {
                frame_index: self.read_u64()?,
                phase: self.read_phase()?,
                at: self.read_duration()?,
            },
            TAG_PHASE_END => RecordedEvent::PhaseEnd {
                frame_index: self.read_u64()?,
                phase: self.read_phase()?,
                at: self.read_duration()?,
            },
            TAG_CACHE_RECREATED => RecordedEvent::CacheRecreated(self.read_cache()?),
            TAG_CACHE_UPDATED => RecordedEvent::CacheUpdated(self.read_cache()?),
            TAG_NODE_PAINTED => RecordedEvent::NodePainted(NodePaintedEvent {
                node: self.read_node()?,
                cached: self.read_bool()?,
            }),
            TAG_FRAME_PAINTED => RecordedEvent::FramePainted(FramePaintedEvent {
                frame_index: self.read_u64()?,
                full: self.read_bool()?,
                damage_rects: self.read_u32()?,
                nodes_painted: self.read_u32()?,
            }),
            TAG_FRAME_SUMMARY => return self.decode_frame_summary(),
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
