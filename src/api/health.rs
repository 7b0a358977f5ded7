// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{state::AppState, storage::StorageResult};

/// Readiness response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual readiness check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// User store reachability.
    pub users: String,
    /// Post store reachability.
    pub posts: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use readiness for that.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

fn probe(store: &str, result: StorageResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(store, error = %e, "Store readiness check failed");
            false
        }
    }
}

fn check_label(ok: bool) -> String {
    let label = if ok { "ok" } else { "unavailable" };
    label.to_string()
}

/// Readiness probe handler.
///
/// Returns 200 only when both the user and post stores answer.
#[utoipa::path(
    get,
    path = "/api/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let users_ok = probe("users", state.users.ping());
    let posts_ok = probe("posts", state.posts.ping());
    let ready = users_ok && posts_ok;

    let response = ReadyResponse {
        status: if ready { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            users: check_label(users_ok),
            posts: check_label(posts_ok),
        },
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
