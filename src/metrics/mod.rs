// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Metrics sink for the cache, sweeper and dispatcher
//!
//! Contains label types and the Prometheus metrics registry.

mod labels;
mod registry;

/// Labels for per-sampler poll failures
pub use labels::PollerFailureLabels;

/// Prometheus metrics registry
pub use registry::{MetricsRegistry, MetricsSnapshot};
