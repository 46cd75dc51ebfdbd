// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Recording helpers and registry-level bookkeeping

use crate::error::{AppError, PollError, Result};
use crate::metrics::labels::PollerFailureLabels;
use prometheus_client::encoding::text::encode;
use std::net::IpAddr;

use super::MetricsRegistry;

/// Point-in-time copy of the unlabelled counters and gauges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hit: u64,
    pub miss: u64,
    pub expired: u64,
    pub size: i64,
    pub samplers: i64,
    pub refresh_runs: u64,
    pub refresh: u64,
    pub coalesced_count: u64,
    pub busy_count: u64,
}

impl MetricsRegistry {
    /// Encodes the registry in the Prometheus text format
    pub async fn encode_metrics(&self) -> Result<String> {
        let registry = self.registry.lock().await;
        let mut buffer = String::new();
        encode(&mut buffer, &registry).map_err(|e| AppError::Metrics(e.to_string()))?;
        Ok(buffer)
    }

    pub fn record_hit(&self) {
        self.cache_hit.inc();
    }

    pub fn record_miss(&self) {
        self.cache_miss.inc();
    }

    pub fn record_expired(&self, count: usize) {
        self.cache_expired.inc_by(count as u64);
    }

    pub fn update_cache_size(&self, interfaces: usize, samplers: usize) {
        #[allow(clippy::cast_possible_wrap)]
        {
            self.cache_size.set(interfaces as i64);
            self.cache_samplers.set(samplers as i64);
        }
    }

    pub fn record_refresh_run(&self) {
        self.cache_refresh_runs.inc();
    }

    pub fn record_refresh(&self, entries: usize) {
        self.cache_refresh.inc_by(entries as u64);
    }

    pub fn record_coalesced(&self, requests: usize) {
        self.poller_coalesced_count.inc_by(requests as u64);
    }

    pub fn record_busy(&self) {
        self.poller_busy_count.inc();
    }

    pub fn record_poll_failure(&self, sampler: &IpAddr, error: &PollError) {
        self.poller_failures
            .get_or_create(&PollerFailureLabels {
                sampler: sampler.to_string(),
                reason: error.reason().to_string(),
            })
            .inc();
    }

    /// Failure count for one sampler and reason
    pub fn poll_failures(&self, sampler: &IpAddr, reason: &str) -> u64 {
        self.poller_failures
            .get_or_create(&PollerFailureLabels {
                sampler: sampler.to_string(),
                reason: reason.to_string(),
            })
            .get()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hit: self.cache_hit.get(),
            miss: self.cache_miss.get(),
            expired: self.cache_expired.get(),
            size: self.cache_size.get(),
            samplers: self.cache_samplers.get(),
            refresh_runs: self.cache_refresh_runs.get(),
            refresh: self.cache_refresh.get(),
            coalesced_count: self.poller_coalesced_count.get(),
            busy_count: self.poller_busy_count.get(),
        }
    }
}
