// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Registry initialization and metric registration

use crate::metrics::labels::PollerFailureLabels;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::MetricsRegistry;

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let cache_hit = Counter::default();
        registry.register(
            "flowmeta_cache_hit",
            "Lookups answered from the cache",
            cache_hit.clone(),
        );
        let cache_miss = Counter::default();
        registry.register(
            "flowmeta_cache_miss",
            "Lookups not answered from the cache",
            cache_miss.clone(),
        );
        let cache_expired = Counter::default();
        registry.register(
            "flowmeta_cache_expired",
            "Entries evicted because they outlived the cache duration",
            cache_expired.clone(),
        );
        let cache_size = Gauge::default();
        registry.register(
            "flowmeta_cache_size",
            "Number of cached interfaces",
            cache_size.clone(),
        );
        let cache_samplers = Gauge::default();
        registry.register(
            "flowmeta_cache_samplers",
            "Number of samplers with at least one cached interface",
            cache_samplers.clone(),
        );
        let cache_refresh_runs = Counter::default();
        registry.register(
            "flowmeta_cache_refresh_runs",
            "Sweeper passes over the cache",
            cache_refresh_runs.clone(),
        );
        let cache_refresh = Counter::default();
        registry.register(
            "flowmeta_cache_refresh",
            "Entries scheduled for a background refresh",
            cache_refresh.clone(),
        );
        let poller_coalesced_count = Counter::default();
        registry.register(
            "flowmeta_poller_coalesced_count",
            "Requests merged into a shared poll",
            poller_coalesced_count.clone(),
        );
        let poller_busy_count = Counter::default();
        registry.register(
            "flowmeta_poller_busy_count",
            "Requests dropped because the poller queue was full",
            poller_busy_count.clone(),
        );
        let poller_failures = Family::<PollerFailureLabels, Counter>::default();
        registry.register(
            "flowmeta_poller_failures",
            "Failed polls per sampler and reason",
            poller_failures.clone(),
        );

        Self {
            registry: Arc::new(Mutex::new(registry)),
            cache_hit,
            cache_miss,
            cache_expired,
            cache_size,
            cache_samplers,
            cache_refresh_runs,
            cache_refresh,
            poller_coalesced_count,
            poller_busy_count,
            poller_failures,
        }
    }
}
