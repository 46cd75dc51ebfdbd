// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Periodic cache sweeper
//!
//! Every check interval, evicts expired entries and schedules a refresh for
//! entries past the refresh horizon through the dispatcher, so refreshes
//! coalesce with polls triggered by lookups.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cache::InterfaceCache;
use crate::clock::Clock;
use crate::dispatcher::Dispatcher;
use crate::metrics::MetricsRegistry;

pub(crate) struct Sweeper {
    pub(crate) cache: Arc<InterfaceCache>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) clock: Clock,
    pub(crate) metrics: MetricsRegistry,
}

impl Sweeper {
    /// One pass: evict, then schedule refreshes; returns the entries scheduled
    pub(crate) fn run_once(&self) -> usize {
        let outcome = self.cache.sweep(self.clock.now());
        self.metrics.record_refresh_run();

        let mut scheduled = 0;
        for (sampler, if_indexes) in &outcome.stale {
            if self.dispatcher.request(*sampler, if_indexes) {
                scheduled += if_indexes.len();
            }
        }
        if scheduled > 0 {
            self.metrics.record_refresh(scheduled);
        }

        tracing::debug!(
            "Cache sweep: {} expired, {}/{} stale entries scheduled for refresh",
            outcome.expired,
            scheduled,
            outcome.stale_entries()
        );
        scheduled
    }

    /// Runs a pass every `check_interval` until shutdown
    pub(crate) fn spawn(
        self,
        check_interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tracing::info!("Starting cache sweeper every {:?}", check_interval);
        tokio::spawn(async move {
            let Some(start) = Instant::now().checked_add(check_interval) else {
                tracing::warn!("Cache check interval {:?} out of range, sweeper disabled", check_interval);
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
                return;
            };
            let mut ticker = tokio::time::interval_at(start, check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.wait_for(|stop| *stop) => {
                        tracing::debug!("Stopping cache sweeper");
                        break;
                    }
                    _ = ticker.tick() => {}
                }
                self.run_once();
            }
        })
    }
}
