// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Simulated sampler backend

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cache::{Interface, normalize_sampler_name};
use crate::error::PollError;

use super::{PollReply, PollRequest, Poller};

/// Answers any sampler using community `public`, times out otherwise
///
/// Interface `N` is described as `Gi0/0/N`, "Interface N", 1000 Mbps.
#[derive(Debug, Default)]
pub struct MockPoller {
    polls: AtomicUsize,
}

impl MockPoller {
    pub const COMMUNITY: &'static str = "public";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of exchanges attempted so far
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn describe(if_index: u32) -> Interface {
        Interface {
            name: format!("Gi0/0/{if_index}"),
            description: format!("Interface {if_index}"),
            speed: 1000,
        }
    }
}

impl Poller for MockPoller {
    async fn poll(&self, request: &PollRequest) -> Result<PollReply, PollError> {
        self.polls.fetch_add(1, Ordering::Relaxed);
        if request.community != Self::COMMUNITY {
            return Err(PollError::Timeout);
        }
        Ok(PollReply {
            sampler_name: normalize_sampler_name(&request.sampler),
            interfaces: request
                .if_indexes
                .iter()
                .map(|&if_index| (if_index, Self::describe(if_index)))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::ProtocolVersion;

    fn request(community: &str, if_indexes: Vec<u32>) -> PollRequest {
        PollRequest {
            sampler: "127.0.0.1".parse().unwrap(),
            port: 161,
            version: ProtocolVersion::V2c,
            community: community.to_string(),
            if_indexes,
        }
    }

    #[tokio::test]
    async fn test_mock_answers_public() {
        let poller = MockPoller::new();
        let reply = poller.poll(&request("public", vec![765, 766])).await.unwrap();

        assert_eq!(reply.sampler_name, "127_0_0_1");
        assert_eq!(reply.interfaces.len(), 2);
        assert_eq!(reply.interfaces[0], (765, MockPoller::describe(765)));
        assert_eq!(reply.interfaces[1].1.name, "Gi0/0/766");
        assert_eq!(poller.polls(), 1);
    }

    #[tokio::test]
    async fn test_mock_rejects_other_communities() {
        let poller = MockPoller::new();
        let err = poller.poll(&request("private", vec![765])).await.unwrap_err();

        assert_eq!(err, PollError::Timeout);
        assert_eq!(poller.polls(), 1);
    }
}
