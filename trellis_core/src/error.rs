// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Most misuse of the tree is not an error: out-of-range sizes are ignored
//! by the setters, and setters or registrations on detached or deleted
//! nodes do nothing. What is left is structural misuse of the attach API
//! ([`TreeError`]), drains that could not settle ([`LayoutError`]) and
//! backend failures ([`RenderError`]).

use core::fmt;

use crate::aspect::LayoutAspect;
use crate::node::NodeId;

/// Misuse of the tree-structure API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeError {
    /// The parent's widget does not accept children.
    NotAContainer(NodeId),
    /// The node already has a parent.
    AlreadyAttached(NodeId),
    /// Attaching would make a node its own ancestor.
    WouldCycle {
        /// The requested parent.
        parent: NodeId,
        /// The node being attached.
        child: NodeId,
    },
    /// Insertion index past the end of the child list.
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of children.
        len: usize,
    },
    /// The surface root cannot be attached, detached or destroyed.
    RootNode,
    /// The handle refers to a node that has been deleted.
    StaleNode(NodeId),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAContainer(id) => write!(f, "node {id} does not accept children"),
            Self::AlreadyAttached(id) => write!(f, "node {id} already has a parent"),
            Self::WouldCycle { parent, child } => {
                write!(f, "attaching {child} under {parent} would create a cycle")
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "child index {index} out of range for {len} children")
            }
            Self::RootNode => f.write_str("operation not allowed on the surface root"),
            Self::StaleNode(id) => write!(f, "node {id} has been deleted"),
        }
    }
}

impl core::error::Error for TreeError {}

/// A layout drain that did not settle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// Every remaining item was deferred without progress.
    Stalled {
        /// Items carried over to the next drain.
        remaining: usize,
    },
    /// The step cap was reached.
    Truncated {
        /// Resolutions performed.
        steps: u64,
        /// Items carried over to the next drain.
        remaining: usize,
    },
    /// Items were dropped after too many carry-overs.
    Abandoned(Vec<(NodeId, LayoutAspect)>),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stalled { remaining } => {
                write!(f, "layout stalled with {remaining} deferred items")
            }
            Self::Truncated { steps, remaining } => write!(
                f,
                "layout stopped after {steps} steps with {remaining} items left"
            ),
            Self::Abandoned(items) => {
                write!(f, "abandoned {} layout items:", items.len())?;
                for (node, aspect) in items {
                    write!(f, " {node}.{}", aspect.name())?;
                }
                Ok(())
            }
        }
    }
}

impl core::error::Error for LayoutError {}

/// A failure of the drawing backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// A surface of the given size could not be allocated.
    SurfaceAllocation {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// A surface from another backend was handed to a context.
    IncompatibleSurface,
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceAllocation { width, height } => {
                write!(f, "failed to allocate a {width}x{height} surface")
            }
            Self::IncompatibleSurface => f.write_str("surface belongs to another backend"),
            Self::Backend(msg) => write!(f, "backend failure: {msg}"),
        }
    }
}

impl core::error::Error for RenderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let e = RenderError::SurfaceAllocation {
            width: 4096,
            height: 10,
        };
        assert_eq!(e.to_string(), "failed to allocate a 4096x10 surface");
        let e = LayoutError::Stalled { remaining: 3 };
        assert_eq!(e.to_string(), "layout stalled with 3 deferred items");
    }
}
