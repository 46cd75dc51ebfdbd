// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Poller capability
//!
//! A poller performs the actual exchange with a sampler for a batch of
//! interface indexes. The dispatcher owns scheduling and writes the reply
//! into the cache; the poller only answers.

mod mock;
mod static_source;

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::str::FromStr;

use crate::cache::Interface;
use crate::error::PollError;

pub use mock::MockPoller;
pub use static_source::StaticPoller;

/// Management protocol version spoken to samplers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProtocolVersion {
    V1,
    #[default]
    V2c,
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(Self::V1),
            "2c" | "v2c" => Ok(Self::V2c),
            other => Err(format!("unknown protocol version '{other}'")),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "1"),
            Self::V2c => write!(f, "2c"),
        }
    }
}

/// One poll for a sampler, built from a claimed pending request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub sampler: IpAddr,
    pub port: u16,
    pub version: ProtocolVersion,
    pub community: String,
    pub if_indexes: Vec<u32>,
}

/// Answer of a successful poll
///
/// Indexes the sampler did not describe are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReply {
    pub sampler_name: String,
    pub interfaces: Vec<(u32, Interface)>,
}

/// Queries interface metadata on a sampler
pub trait Poller: Send + Sync + 'static {
    fn poll(
        &self,
        request: &PollRequest,
    ) -> impl Future<Output = Result<PollReply, PollError>> + Send;
}
