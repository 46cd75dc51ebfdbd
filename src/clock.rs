// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Wall clock for cache timestamps
//!
//! Timestamps must survive restarts, so they are wall-clock `SystemTime`s.
//! They advance with tokio's monotonic clock from an anchor taken at creation,
//! which keeps them consistent with the sweeper ticker, including when tokio
//! time is paused in tests.

use std::time::SystemTime;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor_instant: Instant,
    anchor_wall: SystemTime,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            anchor_instant: Instant::now(),
            anchor_wall: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn now(&self) -> SystemTime {
        self.anchor_wall + self.anchor_instant.elapsed()
    }
}
