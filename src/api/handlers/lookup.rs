// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

use crate::api::AppState;
use crate::cache::Interface;
use crate::poller::Poller;

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub sampler: IpAddr,
    pub if_index: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub sampler_name: String,
    pub interface: Interface,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /api/v0/lookup
///
/// Answers from the cache only. A miss returns 404 and schedules a poll, so
/// retrying later may succeed.
pub async fn lookup_handler<P: Poller>(
    State(state): State<Arc<AppState<P>>>,
    Query(query): Query<LookupQuery>,
) -> Response {
    match state.component.lookup(query.sampler, query.if_index) {
        Ok((sampler_name, interface)) => (
            StatusCode::OK,
            Json(LookupResponse {
                sampler_name,
                interface,
            }),
        )
            .into_response(),
        Err(e) => {
            let status = if e.is_cache_miss() {
                StatusCode::NOT_FOUND
            } else {
                tracing::error!("Lookup of {}/{} failed: {}", query.sampler, query.if_index, e);
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
