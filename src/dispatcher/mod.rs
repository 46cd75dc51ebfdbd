// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Coalescing poll dispatcher
//!
//! Cache misses and refreshes become at most one pending request per sampler.
//! Requests for a sampler that already has a pending request are merged into
//! it. A worker detaches the pending request when it claims it, so requests
//! arriving during the poll open a new window instead of joining the one in
//! flight. That window is queued only once the poll in flight is released,
//! which keeps a single poll per sampler whatever the number of workers.

mod limiter;
mod worker;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::PollerConfig;
use crate::metrics::MetricsRegistry;
use crate::poller::PollRequest;

pub(crate) use worker::{WorkerContext, spawn_workers};

/// Merged requests waiting for a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub community: String,
    pub if_indexes: BTreeSet<u32>,
    /// Number of requests folded into this one
    pub requests: usize,
}

impl PendingRequest {
    fn new(community: &str, if_indexes: &[u32]) -> Self {
        Self {
            community: community.to_string(),
            if_indexes: if_indexes.iter().copied().collect(),
            requests: 1,
        }
    }

    fn merge(&mut self, if_indexes: &[u32]) {
        self.if_indexes.extend(if_indexes.iter().copied());
        self.requests += 1;
    }
}

#[derive(Debug, Default)]
struct Requests {
    pending: HashMap<IpAddr, PendingRequest>,
    in_flight: HashSet<IpAddr>,
}

pub struct Dispatcher {
    requests: Mutex<Requests>,
    queue: mpsc::Sender<IpAddr>,
    config: PollerConfig,
    metrics: MetricsRegistry,
}

impl Dispatcher {
    /// Creates the dispatcher and the receiving end of its work queue
    pub fn new(config: &PollerConfig, metrics: MetricsRegistry) -> (Self, mpsc::Receiver<IpAddr>) {
        let (queue, queue_rx) = mpsc::channel(config.queue_length);
        let dispatcher = Self {
            requests: Mutex::new(Requests::default()),
            queue,
            config: config.clone(),
            metrics,
        };
        (dispatcher, queue_rx)
    }

    fn lock(&self) -> MutexGuard<'_, Requests> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedules a poll of `if_indexes` on `sampler` without waiting
    ///
    /// Returns false when the request was dropped because the work queue is
    /// full or closed.
    pub fn request(&self, sampler: IpAddr, if_indexes: &[u32]) -> bool {
        let mut requests = self.lock();
        if let Some(existing) = requests.pending.get_mut(&sampler) {
            existing.merge(if_indexes);
            tracing::trace!(
                "Merged {:?} into pending request for {} ({} requests)",
                if_indexes,
                sampler,
                existing.requests
            );
            return true;
        }

        // Inserted before queueing: a worker can only claim it once the lock is released.
        let community = self.config.community_for(&sampler);
        requests
            .pending
            .insert(sampler, PendingRequest::new(community, if_indexes));
        if requests.in_flight.contains(&sampler) {
            tracing::trace!(
                "Poll of {} in flight, holding {:?} until it completes",
                sampler,
                if_indexes
            );
            return true;
        }
        self.enqueue(&mut requests, sampler)
    }

    fn enqueue(&self, requests: &mut Requests, sampler: IpAddr) -> bool {
        match self.queue.try_send(sampler) {
            Ok(()) => {
                tracing::trace!("Queued poll of {}", sampler);
                true
            }
            Err(TrySendError::Full(_)) => {
                requests.pending.remove(&sampler);
                self.metrics.record_busy();
                tracing::debug!("Poller queue full, dropping request for {}", sampler);
                false
            }
            Err(TrySendError::Closed(_)) => {
                requests.pending.remove(&sampler);
                tracing::trace!("Poller queue closed, dropping request for {}", sampler);
                false
            }
        }
    }

    /// Detaches the pending request of `sampler` and turns it into a poll
    ///
    /// The sampler stays in flight until [`Dispatcher::release`]. Nothing is
    /// claimed for a sampler already in flight.
    pub fn claim(&self, sampler: IpAddr) -> Option<PollRequest> {
        let claimed = {
            let mut requests = self.lock();
            if requests.in_flight.contains(&sampler) {
                tracing::trace!("Poll of {} already in flight", sampler);
                return None;
            }
            let claimed = requests.pending.remove(&sampler)?;
            requests.in_flight.insert(sampler);
            claimed
        };
        if claimed.requests > 1 {
            self.metrics.record_coalesced(claimed.requests);
        }
        Some(PollRequest {
            sampler,
            port: self.config.port,
            version: self.config.version,
            community: claimed.community,
            if_indexes: claimed.if_indexes.into_iter().collect(),
        })
    }

    /// Ends the poll in flight for `sampler`
    ///
    /// Requests that arrived meanwhile are queued as the next window.
    pub fn release(&self, sampler: IpAddr) {
        let mut requests = self.lock();
        requests.in_flight.remove(&sampler);
        if requests.pending.contains_key(&sampler) {
            self.enqueue(&mut requests, sampler);
        }
    }

    #[cfg(test)]
    pub(crate) fn pending(&self, sampler: &IpAddr) -> Option<PendingRequest> {
        self.lock().pending.get(sampler).cloned()
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self, sampler: &IpAddr) -> bool {
        self.lock().in_flight.contains(sampler)
    }
}
