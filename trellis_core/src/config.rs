// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.
//!
//! Nothing here is global: a [`RenderConfig`] is built once by the host and
//! passed by reference into every drain and paint.

use crate::backend::Color;

/// Limits for the layout drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How many times an item may be carried over to a later drain before it
    /// is abandoned.
    pub max_discard_count: u32,
    /// Upper bound on resolutions performed by a single drain.
    pub max_steps: u64,
}

impl SchedulerConfig {
    /// Default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_discard_count: 5,
            max_steps: 1_000_000,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings shared by layout and painting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    /// Largest width or height, in pixels, for which a node's render cache is
    /// kept. Larger cache-enabled nodes are painted directly.
    pub max_cache_size: f64,
    /// Colour painted over nodes that are not enabled.
    pub disabled_tint: Color,
    /// Whether damaged areas of the frame are cleared before repainting.
    pub clear_background: bool,
    /// Drain limits.
    pub scheduler: SchedulerConfig,
}

impl RenderConfig {
    /// Default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_cache_size: 2048.0,
            disabled_tint: Color::rgba8(51, 51, 51, 204),
            clear_background: true,
            scheduler: SchedulerConfig::new(),
        }
    }

    /// Returns `true` if a cache of `width` by `height` pixels is allowed.
    #[must_use]
    pub fn cacheable(&self, width: f64, height: f64) -> bool {
        width > 0.0 && height > 0.0 && width <= self.max_cache_size && height <= self.max_cache_size
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new()
    }
}
