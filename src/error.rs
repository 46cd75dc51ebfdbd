// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Error types for the flow metadata cache

use thiserror::Error;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error, fatal at construction time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested metadata is not cached (yet)
    #[error("cache miss")]
    CacheMiss,

    /// Filesystem or network IO error
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot file is unusable (checksum, version)
    #[error("Persistence error: {0}")]
    Persist(String),

    /// Metrics encoding error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Address parsing error
    #[error("Address parse error")]
    AddrParse(#[from] std::net::AddrParseError),

    /// A background task panicked
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    /// Returns true for the non-fatal "not cached yet" condition
    #[must_use]
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::CacheMiss)
    }
}

/// Convenient alias for Result with application error
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure reported by a poller for one exchange with a sampler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// No answer within the poller's deadline
    #[error("timeout waiting for sampler")]
    Timeout,

    /// Sampler rejected the credential
    #[error("credential rejected")]
    Credential,

    /// Poller has no knowledge of this sampler
    #[error("unknown sampler")]
    UnknownSampler,

    /// Reply could not be decoded
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl PollError {
    /// Short label used for the failure counter
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Credential => "credential",
            Self::UnknownSampler => "unknown_sampler",
            Self::Malformed(_) => "malformed",
        }
    }
}
