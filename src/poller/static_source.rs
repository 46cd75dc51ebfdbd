// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Poller answering from statically configured sampler tables

use ipnetwork::IpNetwork;
use std::collections::HashMap;
use std::net::IpAddr;

use crate::cache::{Interface, normalize_sampler_name};
use crate::config::StaticSamplerConfig;
use crate::error::PollError;

use super::{PollReply, PollRequest, Poller};

#[derive(Debug, Clone)]
struct StaticSampler {
    network: IpNetwork,
    name: Option<String>,
    default: Option<Interface>,
    interfaces: HashMap<u32, Interface>,
}

/// Serves interface metadata described in configuration
///
/// A sampler is matched against the configured prefixes and the most specific
/// one answers. The community is not checked. Unknown ifIndexes are answered
/// with the default interface when one is configured, and left out otherwise.
#[derive(Debug, Clone, Default)]
pub struct StaticPoller {
    /// Sorted by decreasing prefix length
    samplers: Vec<StaticSampler>,
}

impl StaticPoller {
    #[must_use]
    pub fn new(samplers: &[StaticSamplerConfig]) -> Self {
        let mut samplers: Vec<StaticSampler> = samplers
            .iter()
            .map(|sampler| StaticSampler {
                network: sampler.address,
                name: sampler.name.clone(),
                default: sampler.default.clone(),
                interfaces: sampler
                    .interfaces
                    .iter()
                    .map(|iface| (iface.if_index, iface.interface.clone()))
                    .collect(),
            })
            .collect();
        samplers.sort_by(|a, b| b.network.prefix().cmp(&a.network.prefix()));
        Self { samplers }
    }

    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }

    fn find(&self, sampler: IpAddr) -> Option<&StaticSampler> {
        self.samplers
            .iter()
            .find(|candidate| candidate.network.contains(sampler))
    }
}

impl Poller for StaticPoller {
    async fn poll(&self, request: &PollRequest) -> Result<PollReply, PollError> {
        let sampler = self
            .find(request.sampler)
            .ok_or(PollError::UnknownSampler)?;

        let interfaces = request
            .if_indexes
            .iter()
            .filter_map(|&if_index| {
                sampler
                    .interfaces
                    .get(&if_index)
                    .or(sampler.default.as_ref())
                    .map(|iface| (if_index, iface.clone()))
            })
            .collect();

        Ok(PollReply {
            sampler_name: sampler
                .name
                .clone()
                .unwrap_or_else(|| normalize_sampler_name(&request.sampler)),
            interfaces,
        })
    }
}
