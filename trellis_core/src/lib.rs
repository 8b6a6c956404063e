// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained widget tree with incremental layout and damage tracking.
//!
//! `trellis_core` owns the data side of a retained-mode widget engine: the
//! node arena, the layout work queue that resolves sizes and positions
//! incrementally, and the damage tracker that turns layout changes into
//! regions to repaint. Painting lives in `trellis_render`.
//!
//! # Architecture
//!
//! Every mutation goes through [`LayoutTree`](tree::LayoutTree) and ends up
//! as queued work, so a frame is a fixed pipeline:
//!
//! ```text
//!   setters / attach / resize
//!       │ register (node, aspect)
//!       ▼
//!   LayoutScheduler ──► LayoutTree::drain() ──► DrainReport
//!                              │
//!                              │ dirty nodes whose layout settled
//!                              ▼
//!   clip queue ──► LayoutTree::process_clipping() ──► Region per cache
//!                                                        │
//!                 ┌──────────────────────────────────────┘
//!                 ▼
//!   trellis_render: RenderPlan::capture() ──► Compositor::paint()
//! ```
//!
//! **[`node`]**: struct-of-arrays node arena with generational handles.
//! Properties are set by the caller through the tree; slots and content
//! sizes are written by layout.
//!
//! **[`measure`]** and **[`aspect`]**: size policies, alignment, and the
//! five independently scheduled layout aspects of a node.
//!
//! **[`widget`]**: the [`Widget`](widget::Widget) trait through which
//! containers take part in layout, plus `Panel`, `Group` and `Stack`.
//!
//! **[`scheduler`]**, **[`layout`]**: the FIFO work queue and the drain that
//! resolves it, deferring items whose inputs are not ready yet.
//!
//! **[`damage`]** and **[`region`]**: clipping registration and the
//! rectangle sets it accumulates in cache boundaries and the root.
//!
//! **[`defaults`]**: declarative default property values with style-sheet
//! overrides.
//!
//! **[`backend`]**: the drawing contract renderers implement.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with the zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod aspect;
pub mod backend;
pub mod config;
pub mod damage;
pub mod defaults;
pub mod error;
pub mod layout;
pub mod measure;
pub mod node;
pub mod region;
pub mod scheduler;
pub mod trace;
pub mod tree;
pub mod widget;
