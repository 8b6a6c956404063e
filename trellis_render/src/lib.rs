// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing for [`trellis_core`] layout trees.
//!
//! A frame goes through three steps:
//!
//! 1. [`RenderPlan::capture`] snapshots the visible tree after layout and
//!    damage registration, committing every node as painted.
//! 2. [`Compositor::paint`] walks the plan. Cache boundaries are painted into
//!    off-screen surfaces that are regenerated or partially updated as their
//!    damage requires, then drawn onto the target. Everything else is drawn
//!    directly.
//! 3. The returned [`FrameDamage`] tells the host what to present.
//!
//! [`Viewport`] runs those steps behind the layout and render locks so that
//! other threads can mutate the tree while a frame is being painted.
//!
//! The software backend ([`Bitmap`], [`Canvas`], [`BitmapFactory`]) paints
//! straight-alpha RGBA pixels in memory.
//!
//! # Features
//!
//! - `trace`: forwards compositor events to a
//!   [`TraceSink`](trellis_core::trace::TraceSink).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod compositor;
mod damage;
mod plan;
mod raster;
mod viewport;

pub use compositor::Compositor;
pub use damage::FrameDamage;
pub use plan::{CachePlan, PlanItem, RenderPlan};
pub use raster::{Bitmap, BitmapFactory, Canvas};
pub use viewport::{FrameReport, Viewport};
