// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Metrics registry and update logic

mod init;
mod scrape;

use crate::metrics::labels::PollerFailureLabels;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use scrape::MetricsSnapshot;

#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Mutex<Registry>>,
    // cache store
    cache_hit: Counter,
    cache_miss: Counter,
    cache_expired: Counter,
    cache_size: Gauge,
    cache_samplers: Gauge,
    // sweeper
    cache_refresh_runs: Counter,
    cache_refresh: Counter,
    // dispatcher
    poller_coalesced_count: Counter,
    poller_busy_count: Counter,
    poller_failures: Family<PollerFailureLabels, Counter>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
