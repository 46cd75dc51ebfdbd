// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Poller worker tasks

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::cache::InterfaceCache;
use crate::metrics::MetricsRegistry;
use crate::poller::Poller;

use super::Dispatcher;
use super::limiter::ErrorLimiter;

/// At most one poll failure is logged per worker and interval
const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Everything a worker shares with the rest of the component
pub(crate) struct WorkerContext<P> {
    pub(crate) cache: Arc<InterfaceCache>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) poller: Arc<P>,
    pub(crate) queue: Arc<Mutex<mpsc::Receiver<IpAddr>>>,
    pub(crate) metrics: MetricsRegistry,
}

impl<P> Clone for WorkerContext<P> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            dispatcher: self.dispatcher.clone(),
            poller: self.poller.clone(),
            queue: self.queue.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

/// Spawns `count` workers sharing the dispatcher queue
pub(crate) fn spawn_workers<P: Poller>(
    count: usize,
    context: &WorkerContext<P>,
    shutdown_rx: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    tracing::info!("Starting {} poller worker(s)", count);
    (0..count)
        .map(|id| tokio::spawn(run_worker(id, context.clone(), shutdown_rx.clone())))
        .collect()
}

async fn run_worker<P: Poller>(
    id: usize,
    context: WorkerContext<P>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut limiter = ErrorLimiter::new(ERROR_LOG_INTERVAL);
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown_rx.wait_for(|stop| *stop) => break,
            next = async { context.queue.lock().await.recv().await } => next,
        };
        let Some(sampler) = next else {
            break;
        };
        let Some(request) = context.dispatcher.claim(sampler) else {
            continue;
        };

        tracing::trace!(
            "Worker {} polling {} for {:?}",
            id,
            sampler,
            request.if_indexes
        );
        let start = std::time::Instant::now();
        let result = tokio::select! {
            biased;
            _ = shutdown_rx.wait_for(|stop| *stop) => {
                tracing::debug!("Worker {} abandoning poll of {}", id, sampler);
                context.dispatcher.release(sampler);
                break;
            }
            result = context.poller.poll(&request) => result,
        };

        match result {
            Ok(reply) => {
                tracing::debug!(
                    "Polled {} interface(s) from {} in {:.3}s",
                    reply.interfaces.len(),
                    sampler,
                    start.elapsed().as_secs_f64()
                );
                context
                    .cache
                    .put(sampler, &reply.sampler_name, reply.interfaces);
            }
            Err(e) => {
                context.metrics.record_poll_failure(&sampler, &e);
                match limiter.allow() {
                    Some(0) => tracing::warn!("Failed to poll {}: {}", sampler, e),
                    Some(suppressed) => tracing::warn!(
                        "Failed to poll {}: {} ({} similar errors suppressed)",
                        sampler,
                        e,
                        suppressed
                    ),
                    None => tracing::trace!("Failed to poll {}: {}", sampler, e),
                }
            }
        }
        context.dispatcher.release(sampler);
    }
    tracing::debug!("Stopping poller worker {}", id);
}
