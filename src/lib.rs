// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! # Flowmeta
//!
//! Interface metadata resolution for network flow collectors.
//!
//! Flow records carry a sampler address and interface indexes. This library
//! resolves them to interface names, descriptions and speeds without ever
//! blocking the ingestion path: lookups are answered from a TTL cache, misses
//! are polled in background with one poll in flight per sampler, aging
//! entries are refreshed before they expire, and the cache survives restarts.
//!
//! ## Main modules
//! - `api`: HTTP API handlers
//! - `cache`: interface cache and snapshot file
//! - `component`: lifecycle of cache, dispatcher and sweeper
//! - `config`: configuration management
//! - `dispatcher`: coalescing poll dispatcher and workers
//! - `error`: error types
//! - `metrics`: Prometheus metrics registry
//! - `poller`: poller capability and bundled pollers
//! - `prelude`: commonly used types and traits

mod api;
mod cache;
mod clock;
mod component;
mod config;
mod dispatcher;
mod error;
mod metrics;
mod poller;
pub mod prelude;
mod sweeper;

// Re-export commonly used types
/// Application configuration
pub use config::{CacheConfig, Config, PollerConfig, StaticInterfaceConfig, StaticSamplerConfig};

/// Application error and result type
pub use error::{AppError, PollError, Result};

/// HTTP API router and state
pub use api::{AppState, create_router, handlers};

/// Interface cache and snapshot file
pub use cache::{
    Interface, InterfaceCache, SnapshotRecord, SweepOutcome, load_snapshot,
    normalize_sampler_name, save_snapshot,
};

/// Wall clock used for cache timestamps
pub use clock::Clock;

/// Component lifecycle
pub use component::Component;

/// Coalescing dispatcher
pub use dispatcher::Dispatcher;

/// Metrics registry
pub use metrics::{MetricsRegistry, MetricsSnapshot, PollerFailureLabels};

/// Poller capability
pub use poller::{MockPoller, PollReply, PollRequest, Poller, ProtocolVersion, StaticPoller};
