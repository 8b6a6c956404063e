// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Phases become duration slices on thread 0. Cache and paint events are
//! instants on thread 1, layout events instants on thread 2. Events other
//! than phase boundaries carry no timestamp of their own and are placed at
//! the latest boundary.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};
use std::time::Duration;

use serde_json::{Value, json};
use trellis_core::node::NodeId;
use trellis_core::trace::{CacheEvent, DrainSummary};

use crate::recorder::{RecordedEvent, decode};

const TID_PHASES: u32 = 0;
const TID_PAINT: u32 = 1;
const TID_LAYOUT: u32 = 2;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events = to_values(bytes);
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

/// Converts recorded events into trace event objects.
#[must_use]
pub fn to_values(bytes: &[u8]) -> Vec<Value> {
    let mut events = Vec::new();
    // Timestamp of the latest phase boundary, for events without their own.
    let mut now = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::PhaseBegin {
                frame_index,
                phase,
                at,
            } => {
                now = us(at);
                events.push(json!({
                    "ph": "B",
                    "name": phase.name(),
                    "cat": "Frame",
                    "ts": now,
                    "pid": 0,
                    "tid": TID_PHASES,
                    "args": { "frame_index": frame_index },
                }));
            }
            RecordedEvent::PhaseEnd {
                frame_index,
                phase,
                at,
            } => {
                now = us(at);
                events.push(json!({
                    "ph": "E",
                    "name": phase.name(),
                    "cat": "Frame",
                    "ts": now,
                    "pid": 0,
                    "tid": TID_PHASES,
                    "args": { "frame_index": frame_index },
                }));
            }
            RecordedEvent::AspectResolved(e) => {
                events.push(instant(
                    "AspectResolved",
                    "Layout",
                    now,
                    TID_LAYOUT,
                    json!({
                        "node": node(e.node),
                        "aspect": format!("{:?}", e.aspect),
                        "value": e.value,
                        "changed": e.changed,
                    }),
                ));
            }
            RecordedEvent::AspectDeferred(e) => {
                events.push(instant(
                    "AspectDeferred",
                    "Layout",
                    now,
                    TID_LAYOUT,
                    json!({
                        "node": node(e.node),
                        "aspect": format!("{:?}", e.aspect),
                    }),
                ));
            }
            RecordedEvent::ContentSize(e) => {
                events.push(instant(
                    "ContentSize",
                    "Layout",
                    now,
                    TID_LAYOUT,
                    json!({
                        "node": node(e.node),
                        "axis": format!("{:?}", e.axis),
                        "extent": e.extent,
                    }),
                ));
            }
            RecordedEvent::Arrange(e) => {
                events.push(instant(
                    "Arrange",
                    "Layout",
                    now,
                    TID_LAYOUT,
                    json!({ "node": node(e.node), "moved": e.moved }),
                ));
            }
            RecordedEvent::Clip(e) => {
                events.push(instant(
                    "Clip",
                    "Damage",
                    now,
                    TID_LAYOUT,
                    json!({
                        "node": node(e.node),
                        "rect": [e.rect.x0, e.rect.y0, e.rect.x1, e.rect.y1],
                    }),
                ));
            }
            RecordedEvent::Drain(s) => {
                events.push(instant("Drain", "Layout", now, TID_LAYOUT, drain(&s)));
            }
            RecordedEvent::CacheRecreated(e) => {
                events.push(instant(
                    "CacheRecreated",
                    "Cache",
                    now,
                    TID_PAINT,
                    cache(&e),
                ));
            }
            RecordedEvent::CacheUpdated(e) => {
                events.push(instant("CacheUpdated", "Cache", now, TID_PAINT, cache(&e)));
            }
            RecordedEvent::NodePainted(e) => {
                events.push(instant(
                    "NodePainted",
                    "Paint",
                    now,
                    TID_PAINT,
                    json!({ "node": node(e.node), "cached": e.cached }),
                ));
            }
            RecordedEvent::FramePainted(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FramePainted",
                    "cat": "Frame",
                    "ts": now,
                    "pid": 0,
                    "tid": TID_PAINT,
                    "s": "p",
                    "args": {
                        "frame_index": e.frame_index,
                        "full": e.full,
                        "damage_rects": e.damage_rects,
                        "nodes_painted": e.nodes_painted,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": now,
                    "pid": 0,
                    "tid": TID_PHASES,
                    "s": "g",
                    "args": {
                        "frame_index": s.frame_index,
                        "layout_us": us(s.layout),
                        "clipping_us": us(s.clipping),
                        "paint_us": us(s.paint),
                        "damage_rects": s.damage_rects,
                        "drain": s.drain.as_ref().map(drain),
                    }
                }));
            }
        }
    }
    events
}

fn instant(name: &str, cat: &str, ts: f64, tid: u32, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": tid,
        "s": "t",
        "args": args,
    })
}

fn node(id: NodeId) -> Value {
    json!({ "index": id.index(), "generation": id.generation() })
}

fn cache(e: &CacheEvent) -> Value {
    json!({
        "node": node(e.node),
        "width": e.size.width,
        "height": e.size.height,
        "rects": e.rects,
    })
}

fn drain(s: &DrainSummary) -> Value {
    json!({
        "steps": s.steps,
        "resolved": s.resolved,
        "deferred": s.deferred,
        "tombstoned": s.tombstoned,
        "abandoned": s.abandoned,
        "remaining": s.remaining,
        "outcome": format!("{:?}", s.outcome),
    })
}

fn us(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1000.0
}
