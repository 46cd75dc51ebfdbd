// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for convenient use.
//! Users of the library can import everything they need with:
//!
//! ```rust
//! use flowmeta::prelude::*;
//! ```

// Core types
pub use crate::config::{CacheConfig, Config, PollerConfig};
pub use crate::error::{AppError, PollError, Result};

// Cache and lifecycle
pub use crate::cache::Interface;
pub use crate::component::Component;
pub use crate::metrics::MetricsRegistry;

// Pollers
pub use crate::poller::{MockPoller, PollReply, PollRequest, Poller, StaticPoller};
