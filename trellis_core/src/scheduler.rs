// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout work queue and drain reporting.
//!
//! [`LayoutScheduler`] is a FIFO of `(node, aspect)` items. Items are never
//! removed when their node is detached or destroyed; instead the node's
//! pending bit is cleared (or its handle goes stale) and the item is skipped
//! as a *tombstone* when popped.
//!
//! The drain loop itself lives on [`LayoutTree`](crate::tree::LayoutTree)
//! because resolution needs the whole tree. It stops early in two cases:
//!
//! - **Stalled**: every remaining item was deferred since the last
//!   successful resolution. Nothing can change within this drain, so the
//!   items stay queued for the next one and their discard counters grow.
//! - **Truncated**: the step cap of
//!   [`SchedulerConfig`](crate::config::SchedulerConfig) was reached.
//!
//! An item carried over more than `max_discard_count` times is abandoned.

use std::collections::VecDeque;

use crate::aspect::LayoutAspect;
use crate::error::LayoutError;
use crate::measure::Axis;
use crate::node::NodeId;
use crate::trace::DrainSummary;

/// One unit of queued layout work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueItem {
    /// The node to lay out.
    pub node: NodeId,
    /// The aspect to resolve.
    pub aspect: LayoutAspect,
    /// How many drains this item has been carried over.
    pub discards: u32,
}

/// How a drain ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DrainOutcome {
    /// The queue is empty.
    #[default]
    Settled,
    /// Only deferred items remain.
    Stalled,
    /// The step cap was reached.
    Truncated,
}

/// What changed during layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// The slot changed in this aspect.
    Slot(LayoutAspect),
    /// The content size changed along this axis.
    ContentSize(Axis),
    /// The container moved at least one child.
    Arranged,
}

/// A change recorded in a [`DrainReport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutChange {
    /// The node that changed.
    pub node: NodeId,
    /// What changed.
    pub kind: ChangeKind,
}

/// Result of one drain.
#[derive(Clone, Debug, Default)]
pub struct DrainReport {
    /// Items processed (tombstones excluded).
    pub steps: u64,
    /// Items that resolved.
    pub resolved: u64,
    /// Items deferred and requeued.
    pub deferred: u64,
    /// Stale items skipped.
    pub tombstoned: u64,
    /// Items left for the next drain.
    pub remaining: usize,
    /// How the drain ended.
    pub outcome: DrainOutcome,
    /// Items dropped after too many carry-overs.
    pub abandoned: Vec<(NodeId, LayoutAspect)>,
    /// Every slot, content-size and arrangement change, in order. Includes
    /// changes made by setters since the previous drain.
    pub changes: Vec<LayoutChange>,
}

impl DrainReport {
    /// Returns `true` if the queue was emptied without abandoning anything.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.outcome == DrainOutcome::Settled && self.abandoned.is_empty()
    }

    /// Index of the first recorded change matching `node` and `kind`.
    #[must_use]
    pub fn position(&self, node: NodeId, kind: ChangeKind) -> Option<usize> {
        self.changes
            .iter()
            .position(|c| c.node == node && c.kind == kind)
    }

    /// Returns `true` if any change was recorded for `node`.
    #[must_use]
    pub fn touched(&self, node: NodeId) -> bool {
        self.changes.iter().any(|c| c.node == node)
    }

    /// Counters without the change log.
    #[must_use]
    pub fn summary(&self) -> DrainSummary {
        DrainSummary {
            steps: self.steps,
            resolved: self.resolved,
            deferred: self.deferred,
            tombstoned: self.tombstoned,
            abandoned: u32::try_from(self.abandoned.len()).unwrap_or(u32::MAX),
            remaining: self.remaining,
            outcome: self.outcome,
        }
    }

    /// Converts a drain that did not settle into an error.
    pub fn into_result(self) -> Result<Self, LayoutError> {
        match self.outcome {
            DrainOutcome::Truncated => Err(LayoutError::Truncated {
                steps: self.steps,
                remaining: self.remaining,
            }),
            DrainOutcome::Stalled => Err(LayoutError::Stalled {
                remaining: self.remaining,
            }),
            DrainOutcome::Settled if !self.abandoned.is_empty() => {
                Err(LayoutError::Abandoned(self.abandoned))
            }
            DrainOutcome::Settled => Ok(self),
        }
    }
}

/// FIFO queue of layout work.
#[derive(Debug, Default)]
pub struct LayoutScheduler {
    queue: VecDeque<QueueItem>,
    changes: Vec<LayoutChange>,
}

impl LayoutScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued items, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued items in processing order.
    pub fn items(&self) -> impl Iterator<Item = &QueueItem> {
        self.queue.iter()
    }

    pub(crate) fn push(&mut self, node: NodeId, aspect: LayoutAspect) {
        self.queue.push_back(QueueItem {
            node,
            aspect,
            discards: 0,
        });
    }

    pub(crate) fn requeue(&mut self, item: QueueItem) {
        self.queue.push_back(item);
    }

    pub(crate) fn pop(&mut self) -> Option<QueueItem> {
        self.queue.pop_front()
    }

    pub(crate) fn record(&mut self, node: NodeId, kind: ChangeKind) {
        self.changes.push(LayoutChange { node, kind });
    }

    pub(crate) fn take_changes(&mut self) -> Vec<LayoutChange> {
        core::mem::take(&mut self.changes)
    }

    /// Keeps the remaining items for the next drain.
    ///
    /// Tombstones (items for which `live` returns `false`) are dropped.
    /// Every other item's discard counter is incremented; items that exceed
    /// `max_discards` are removed and returned.
    pub(crate) fn carry_over(
        &mut self,
        max_discards: u32,
        mut live: impl FnMut(&QueueItem) -> bool,
    ) -> Vec<QueueItem> {
        let mut abandoned = Vec::new();
        let mut kept = VecDeque::with_capacity(self.queue.len());
        for mut item in self.queue.drain(..) {
            if !live(&item) {
                continue;
            }
            item.discards += 1;
            if item.discards > max_discards {
                abandoned.push(item);
            } else {
                kept.push_back(item);
            }
        }
        self.queue = kept;
        abandoned
    }
}
