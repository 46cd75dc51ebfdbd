// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Log rate limiting for poll failures

use std::time::Duration;
use tokio::time::Instant;

/// Allows one event per interval and counts the ones it suppresses
pub(super) struct ErrorLimiter {
    interval: Duration,
    last: Option<Instant>,
    suppressed: u64,
}

impl ErrorLimiter {
    pub(super) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            suppressed: 0,
        }
    }

    /// Returns the number of events suppressed since the last allowed one,
    /// or `None` if this event must be suppressed too
    pub(super) fn allow(&mut self) -> Option<u64> {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }
}
