// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Interface metadata cache
//!
//! Maps `(sampler, ifIndex)` to interface metadata with freshness bookkeeping.
//! Reads never block on network I/O: a lookup either finds a valid entry or
//! reports a miss. Eviction of expired entries happens in [`InterfaceCache::sweep`].

mod persist;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::metrics::MetricsRegistry;

pub use persist::{load_snapshot, save_snapshot};

/// Human-readable metadata of a sampler interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub description: String,
    /// Link speed in Mbps
    pub speed: u64,
}

/// One persisted cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub sampler: IpAddr,
    pub if_index: u32,
    pub sampler_name: String,
    pub interface: Interface,
    pub last_updated: SystemTime,
}

/// Result of one sweep pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Entries evicted during the pass
    pub expired: usize,
    /// Stale but still valid ifIndexes, grouped by sampler
    pub stale: BTreeMap<IpAddr, Vec<u32>>,
}

impl SweepOutcome {
    #[must_use]
    pub fn stale_entries(&self) -> usize {
        self.stale.values().map(Vec::len).sum()
    }
}

/// Default sampler name: its address with separators replaced by `_`
#[must_use]
pub fn normalize_sampler_name(sampler: &IpAddr) -> String {
    sampler.to_string().replace(['.', ':'], "_")
}

#[derive(Debug, Clone)]
struct CachedInterface {
    interface: Interface,
    last_updated: SystemTime,
}

#[derive(Debug, Clone)]
struct CachedSampler {
    name: String,
    interfaces: HashMap<u32, CachedInterface>,
}

pub struct InterfaceCache {
    samplers: RwLock<HashMap<IpAddr, CachedSampler>>,
    duration: Duration,
    refresh: Duration,
    clock: Clock,
    metrics: MetricsRegistry,
}

impl InterfaceCache {
    #[must_use]
    pub fn new(config: &CacheConfig, clock: Clock, metrics: MetricsRegistry) -> Self {
        Self {
            samplers: RwLock::new(HashMap::new()),
            duration: config.duration,
            refresh: config.refresh,
            clock,
            metrics,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<IpAddr, CachedSampler>> {
        self.samplers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<IpAddr, CachedSampler>> {
        self.samplers.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn age(&self, last_updated: SystemTime, now: SystemTime) -> Duration {
        now.duration_since(last_updated).unwrap_or_default()
    }

    /// Returns the sampler name and interface if cached and not expired
    pub fn lookup(&self, sampler: IpAddr, if_index: u32) -> Option<(String, Interface)> {
        let now = self.clock.now();
        let found = {
            let samplers = self.read();
            samplers.get(&sampler).and_then(|cached| {
                cached
                    .interfaces
                    .get(&if_index)
                    .filter(|entry| self.age(entry.last_updated, now) < self.duration)
                    .map(|entry| (cached.name.clone(), entry.interface.clone()))
            })
        };
        if found.is_some() {
            self.metrics.record_hit();
        } else {
            self.metrics.record_miss();
        }
        found
    }

    /// Inserts or refreshes interfaces of a sampler, stamped with the current time
    pub fn put<I>(&self, sampler: IpAddr, sampler_name: &str, interfaces: I)
    where
        I: IntoIterator<Item = (u32, Interface)>,
    {
        let now = self.clock.now();
        let mut samplers = self.write();
        let cached = samplers.entry(sampler).or_insert_with(|| CachedSampler {
            name: sampler_name.to_string(),
            interfaces: HashMap::new(),
        });
        if cached.name != sampler_name {
            cached.name = sampler_name.to_string();
        }
        let mut stored = 0;
        for (if_index, interface) in interfaces {
            cached.interfaces.insert(
                if_index,
                CachedInterface {
                    interface,
                    last_updated: now,
                },
            );
            stored += 1;
        }
        if cached.interfaces.is_empty() {
            samplers.remove(&sampler);
        }
        tracing::trace!("Cached {} interface(s) for sampler {}", stored, sampler);
        self.update_gauges(&samplers);
    }

    /// Evicts expired entries and collects the ones due for a refresh
    pub fn sweep(&self, now: SystemTime) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        let mut samplers = self.write();
        samplers.retain(|sampler, cached| {
            cached.interfaces.retain(|if_index, entry| {
                let age = self.age(entry.last_updated, now);
                if age >= self.duration {
                    outcome.expired += 1;
                    return false;
                }
                if !self.refresh.is_zero() && age >= self.refresh {
                    outcome.stale.entry(*sampler).or_default().push(*if_index);
                }
                true
            });
            !cached.interfaces.is_empty()
        });
        for if_indexes in outcome.stale.values_mut() {
            if_indexes.sort_unstable();
        }
        if outcome.expired > 0 {
            self.metrics.record_expired(outcome.expired);
            tracing::debug!("Evicted {} expired cache entries", outcome.expired);
        }
        self.update_gauges(&samplers);
        outcome
    }

    /// Copies every entry with its original timestamp
    pub fn snapshot(&self) -> Vec<SnapshotRecord> {
        let samplers = self.read();
        let mut records: Vec<SnapshotRecord> = samplers
            .iter()
            .flat_map(|(sampler, cached)| {
                cached
                    .interfaces
                    .iter()
                    .map(|(if_index, entry)| SnapshotRecord {
                        sampler: *sampler,
                        if_index: *if_index,
                        sampler_name: cached.name.clone(),
                        interface: entry.interface.clone(),
                        last_updated: entry.last_updated,
                    })
            })
            .collect();
        records.sort_by(|a, b| (a.sampler, a.if_index).cmp(&(b.sampler, b.if_index)));
        records
    }

    /// Loads records keeping their timestamps; returns how many were kept
    ///
    /// Records already past the cache duration are skipped, and a record never
    /// replaces a more recent entry.
    pub fn restore(&self, records: Vec<SnapshotRecord>) -> usize {
        let now = self.clock.now();
        let mut restored = 0;
        let mut samplers = self.write();
        for record in records {
            if self.age(record.last_updated, now) >= self.duration {
                continue;
            }
            let cached = samplers
                .entry(record.sampler)
                .or_insert_with(|| CachedSampler {
                    name: record.sampler_name.clone(),
                    interfaces: HashMap::new(),
                });
            let newer_exists = cached
                .interfaces
                .get(&record.if_index)
                .is_some_and(|entry| entry.last_updated >= record.last_updated);
            if newer_exists {
                continue;
            }
            cached.name = record.sampler_name;
            cached.interfaces.insert(
                record.if_index,
                CachedInterface {
                    interface: record.interface,
                    last_updated: record.last_updated,
                },
            );
            restored += 1;
        }
        self.update_gauges(&samplers);
        restored
    }

    /// Number of cached interfaces
    pub fn len(&self) -> usize {
        self.read().values().map(|cached| cached.interfaces.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn update_gauges(&self, samplers: &HashMap<IpAddr, CachedSampler>) {
        let interfaces = samplers.values().map(|cached| cached.interfaces.len()).sum();
        self.metrics.update_cache_size(interfaces, samplers.len());
    }
}
