// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Interface metadata component
//!
//! Owns the cache, the dispatcher with its workers and the sweeper, and ties
//! their lifecycle to one shutdown signal. The snapshot is restored before
//! any background task starts and written only once all of them stopped.

use std::net::IpAddr;
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::cache::{Interface, InterfaceCache, load_snapshot, save_snapshot};
use crate::clock::Clock;
use crate::config::Config;
use crate::dispatcher::{Dispatcher, WorkerContext, spawn_workers};
use crate::error::{AppError, Result};
use crate::metrics::MetricsRegistry;
use crate::poller::Poller;
use crate::sweeper::Sweeper;

pub struct Component<P: Poller> {
    config: Config,
    clock: Clock,
    cache: Arc<InterfaceCache>,
    dispatcher: Arc<Dispatcher>,
    poller: Arc<P>,
    metrics: MetricsRegistry,
    queue: Arc<Mutex<tokio::sync::mpsc::Receiver<IpAddr>>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<P: Poller> Component<P> {
    /// Validates the configuration and builds the component without starting it
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the refresh schedule or pool sizing is invalid.
    pub fn new(config: Config, metrics: MetricsRegistry, poller: P) -> Result<Self> {
        config.validate()?;

        let clock = Clock::new();
        let cache = Arc::new(InterfaceCache::new(&config.cache, clock, metrics.clone()));
        let (dispatcher, queue_rx) = Dispatcher::new(&config.poller, metrics.clone());
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            clock,
            cache,
            dispatcher: Arc::new(dispatcher),
            poller: Arc::new(poller),
            metrics,
            queue: Arc::new(Mutex::new(queue_rx)),
            shutdown_tx,
            tasks: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Restores the persisted cache, then starts workers and the sweeper
    pub async fn start(&self) -> Result<()> {
        if !self.lock_tasks().is_empty() {
            tracing::warn!("Interface metadata component already started");
            return Ok(());
        }
        if let Some(path) = &self.config.cache.persist_file {
            match load_snapshot(path).await {
                Ok(Some(records)) => {
                    let total = records.len();
                    let restored = self.cache.restore(records);
                    tracing::info!(
                        "Restored {}/{} cache entries from {}",
                        restored,
                        total,
                        path.display()
                    );
                }
                Ok(None) => tracing::debug!("No cache snapshot at {}", path.display()),
                Err(e) => tracing::warn!(
                    "Unable to load cache snapshot from {}: {}. Starting cold.",
                    path.display(),
                    e
                ),
            }
        }

        let context = WorkerContext {
            cache: self.cache.clone(),
            dispatcher: self.dispatcher.clone(),
            poller: self.poller.clone(),
            queue: self.queue.clone(),
            metrics: self.metrics.clone(),
        };
        let shutdown_rx = self.shutdown_tx.subscribe();
        let mut handles = spawn_workers(self.config.poller.workers, &context, &shutdown_rx);

        let sweeper = Sweeper {
            cache: self.cache.clone(),
            dispatcher: self.dispatcher.clone(),
            clock: self.clock,
            metrics: self.metrics.clone(),
        };
        handles.push(sweeper.spawn(self.config.cache.check_interval, shutdown_rx));

        self.lock_tasks().extend(handles);
        Ok(())
    }

    /// Returns the cached sampler name and interface
    ///
    /// # Errors
    ///
    /// Returns `AppError::CacheMiss` when the entry is unknown or expired; a
    /// poll is then scheduled in background and a later lookup may succeed.
    pub fn lookup(&self, sampler: IpAddr, if_index: u32) -> Result<(String, Interface)> {
        if let Some(found) = self.cache.lookup(sampler, if_index) {
            return Ok(found);
        }
        self.dispatcher.request(sampler, &[if_index]);
        Err(AppError::CacheMiss)
    }

    /// Stops background tasks, then persists the cache
    ///
    /// A failed snapshot is logged and does not fail the shutdown.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Task` if a background task panicked.
    pub async fn stop(&self) -> Result<()> {
        self.shutdown_tx.send_replace(true);
        let handles: Vec<_> = self.lock_tasks().drain(..).collect();
        let count = handles.len();
        let mut failure = None;
        for joined in futures_util::future::join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!("Background task failed: {}", e);
                failure.get_or_insert(e);
            }
        }
        tracing::debug!("Stopped {} background task(s)", count);

        if let Some(path) = &self.config.cache.persist_file {
            let records = self.cache.snapshot();
            match save_snapshot(path, &records).await {
                Ok(()) => tracing::info!(
                    "Saved {} cache entries to {}",
                    records.len(),
                    path.display()
                ),
                Err(e) => tracing::error!(
                    "Unable to save cache snapshot to {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn poller(&self) -> &P {
        &self.poller
    }

    pub fn cache(&self) -> &InterfaceCache {
        &self.cache
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
