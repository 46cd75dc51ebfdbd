// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

mod health;
mod lookup;
mod metrics;

pub use health::{HealthResponse, health_check};
pub use lookup::{ErrorResponse, LookupQuery, LookupResponse, lookup_handler};
pub use metrics::metrics_handler;
