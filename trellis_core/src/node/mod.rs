// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node arena.
//!
//! A *node* is one rectangle of the widget tree. Each node has:
//!
//! - **Identity**: a generational [`NodeId`] handle that becomes stale when
//!   the node is destroyed, so queue entries and render caches keyed by it
//!   can tell a recycled slot from the node they were made for.
//! - **Topology**: parent, first-child, and sibling links forming an ordered
//!   tree. The parent link is a plain index and never keeps anything alive.
//! - **Properties** set through the [`LayoutTree`](crate::tree::LayoutTree):
//!   size measures, alignment, offsets, margin, size limits and
//!   [`NodeFlags`].
//! - **Layout state** written by the scheduler: the slot, the content size,
//!   and the mask of aspects still queued.
//! - **Damage state**: the slot last painted, the dirty flag, and the damage
//!   [`Region`](crate::region::Region) accumulated for a render cache.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.

mod id;
mod store;
mod traverse;

pub use id::{INVALID, NodeId};
pub use store::{NodeFlags, NodeStore};
pub use traverse::Children;
