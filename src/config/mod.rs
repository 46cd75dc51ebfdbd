// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Configuration module for the flow metadata cache
//!
//! Loads configuration from environment variables and JSON, and checks the
//! refresh schedule invariants before any background task starts.

use ipnetwork::IpNetwork;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::Interface;
use crate::error::{AppError, Result};
use crate::poller::ProtocolVersion;


/// Default configuration values
pub mod defaults {
    pub const SERVER_ADDR: &str = "0.0.0.0:9090";
    pub const CACHE_DURATION_SECS: u64 = 3 * 3600;
    pub const CACHE_REFRESH_SECS: u64 = 3600;
    pub const CACHE_CHECK_INTERVAL_SECS: u64 = 120;
    pub const POLLER_WORKERS: usize = 1;
    pub const POLLER_QUEUE_LENGTH: usize = 1024;
    pub const POLLER_PORT: u16 = 161;
    pub const DEFAULT_COMMUNITY: &str = "public";
}

/// Environment variable names used by the application
pub mod env_vars {
    pub const SERVER_ADDR: &str = "SERVER_ADDR";
    pub const CACHE_DURATION: &str = "CACHE_DURATION_SECONDS";
    pub const CACHE_REFRESH: &str = "CACHE_REFRESH_SECONDS";
    pub const CACHE_CHECK_INTERVAL: &str = "CACHE_CHECK_INTERVAL_SECONDS";
    pub const CACHE_PERSIST_FILE: &str = "CACHE_PERSIST_FILE";
    pub const POLLER_WORKERS: &str = "POLLER_WORKERS";
    pub const POLLER_QUEUE_LENGTH: &str = "POLLER_QUEUE_LENGTH";
    pub const POLLER_PORT: &str = "POLLER_PORT";
    pub const POLLER_VERSION: &str = "POLLER_VERSION";
    pub const DEFAULT_COMMUNITY: &str = "DEFAULT_COMMUNITY";
    pub const COMMUNITIES: &str = "COMMUNITIES";
    pub const SAMPLERS_CONFIG: &str = "SAMPLERS_CONFIG";
}

/// Freshness horizons and persistence of the interface cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries older than this are evicted and never returned
    pub duration: Duration,
    /// Entries older than this are refreshed in background (zero disables)
    pub refresh: Duration,
    /// Period of the sweeper
    pub check_interval: Duration,
    /// Snapshot file written on stop and read on start
    pub persist_file: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(defaults::CACHE_DURATION_SECS),
            refresh: Duration::from_secs(defaults::CACHE_REFRESH_SECS),
            check_interval: Duration::from_secs(defaults::CACHE_CHECK_INTERVAL_SECS),
            persist_file: None,
        }
    }
}

/// Dispatcher and credential settings
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub workers: usize,
    pub queue_length: usize,
    pub port: u16,
    pub version: ProtocolVersion,
    pub default_community: String,
    pub communities: HashMap<IpAddr, String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            workers: defaults::POLLER_WORKERS,
            queue_length: defaults::POLLER_QUEUE_LENGTH,
            port: defaults::POLLER_PORT,
            version: ProtocolVersion::default(),
            default_community: defaults::DEFAULT_COMMUNITY.to_string(),
            communities: HashMap::new(),
        }
    }
}

impl PollerConfig {
    /// Community for a sampler, falling back to the default one
    #[must_use]
    pub fn community_for(&self, sampler: &IpAddr) -> &str {
        self.communities
            .get(sampler)
            .map_or(self.default_community.as_str(), String::as_str)
    }
}

/// One interface of a statically described sampler
#[derive(Debug, Clone, Deserialize)]
pub struct StaticInterfaceConfig {
    pub if_index: u32,
    #[serde(flatten)]
    pub interface: Interface,
}

/// Samplers whose interfaces are described in configuration
///
/// `address` is a prefix (`192.0.2.0/24`) or a single address, which stands
/// for a host prefix.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticSamplerConfig {
    pub address: IpNetwork,
    #[serde(default)]
    pub name: Option<String>,
    /// Answered for any ifIndex missing from `interfaces`
    #[serde(default)]
    pub default: Option<Interface>,
    #[serde(default)]
    pub interfaces: Vec<StaticInterfaceConfig>,
}

/// Application-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub cache: CacheConfig,
    pub poller: PollerConfig,
    pub samplers: Vec<StaticSamplerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: defaults::SERVER_ADDR.to_string(),
            cache: CacheConfig::default(),
            poller: PollerConfig::default(),
            samplers: vec![],
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let server_addr = std::env::var(env_vars::SERVER_ADDR)
            .unwrap_or_else(|_| defaults::SERVER_ADDR.to_string());

        let cache = CacheConfig {
            duration: env_secs(env_vars::CACHE_DURATION, defaults::CACHE_DURATION_SECS),
            refresh: env_secs(env_vars::CACHE_REFRESH, defaults::CACHE_REFRESH_SECS),
            check_interval: env_secs(
                env_vars::CACHE_CHECK_INTERVAL,
                defaults::CACHE_CHECK_INTERVAL_SECS,
            ),
            persist_file: std::env::var(env_vars::CACHE_PERSIST_FILE)
                .ok()
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        };

        let version = match std::env::var(env_vars::POLLER_VERSION) {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("Failed to parse {}: {}. Using default.", env_vars::POLLER_VERSION, e);
                ProtocolVersion::default()
            }),
            Err(_) => ProtocolVersion::default(),
        };

        let poller = PollerConfig {
            workers: env_parse(env_vars::POLLER_WORKERS, defaults::POLLER_WORKERS),
            queue_length: env_parse(env_vars::POLLER_QUEUE_LENGTH, defaults::POLLER_QUEUE_LENGTH),
            port: env_parse(env_vars::POLLER_PORT, defaults::POLLER_PORT),
            version,
            default_community: std::env::var(env_vars::DEFAULT_COMMUNITY)
                .unwrap_or_else(|_| defaults::DEFAULT_COMMUNITY.to_string()),
            communities: env_json(env_vars::COMMUNITIES),
        };

        let samplers: Vec<StaticSamplerConfig> = env_json(env_vars::SAMPLERS_CONFIG);
        if samplers.is_empty() {
            tracing::warn!(
                "No sampler configuration found. Service will start but every lookup will miss."
            );
        }

        Config {
            server_addr,
            cache,
            poller,
            samplers,
        }
    }

    /// Checks the refresh schedule and pool sizing
    ///
    /// With refresh enabled, the cache duration must leave room for a full
    /// refresh horizon after an entry turns stale, so it has to be strictly
    /// greater than twice the refresh period.
    pub fn validate(&self) -> Result<()> {
        let cache = &self.cache;
        if cache.duration.is_zero() {
            return Err(AppError::Config("cache duration must be positive".to_string()));
        }
        if cache.check_interval.is_zero() {
            return Err(AppError::Config(
                "cache check interval must be positive".to_string(),
            ));
        }
        if std::time::Instant::now()
            .checked_add(cache.check_interval)
            .is_none()
        {
            return Err(AppError::Config(format!(
                "cache check interval ({:?}) is out of range",
                cache.check_interval
            )));
        }
        if !cache.refresh.is_zero() {
            if cache
                .refresh
                .checked_mul(2)
                .is_none_or(|twice| cache.duration <= twice)
            {
                return Err(AppError::Config(format!(
                    "cache duration ({:?}) must be greater than twice the cache refresh ({:?})",
                    cache.duration, cache.refresh
                )));
            }
            if cache.check_interval > cache.refresh {
                tracing::warn!(
                    "Cache check interval ({:?}) exceeds cache refresh ({:?}); stale entries may wait a full interval",
                    cache.check_interval,
                    cache.refresh
                );
            }
        }
        if self.poller.workers == 0 {
            return Err(AppError::Config("at least one poller worker is required".to_string()));
        }
        if self.poller.queue_length == 0 {
            return Err(AppError::Config("poller queue length must be positive".to_string()));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}. Using default.", name, e);
            default
        }),
        Err(_) => default,
    }
}

fn env_secs(name: &str, default: u64) -> Duration {
    Duration::from_secs(env_parse(name, default))
}

fn env_json<T: serde::de::DeserializeOwned + Default>(name: &str) -> T {
    match std::env::var(name) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}. Using empty value.", name, e);
            T::default()
        }),
        Err(_) => T::default(),
    }
}
