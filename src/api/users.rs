// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::PublicUser,
    state::AppState,
    storage::OwnershipCheck,
};

/// Most results returned by a username search.
pub const SEARCH_LIMIT: usize = 20;

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses((status = 200, body = [PublicUser]))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = state.users.list()?;
    Ok(Json(users.iter().map(PublicUser::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/search/{prefix}",
    params(
        ("prefix" = String, Path, description = "Username prefix (case-insensitive)")
    ),
    tag = "Users",
    responses((status = 200, body = [PublicUser]))
)]
pub async fn search_users(
    Path(prefix): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err(ApiError::bad_request("search prefix is required"));
    }

    let users = state.users.search(prefix, SEARCH_LIMIT)?;
    Ok(Json(users.iter().map(PublicUser::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/{username}",
    params(
        ("username" = String, Path, description = "Username to look up")
    ),
    tag = "Users",
    responses(
        (status = 200, body = PublicUser),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_user(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state.users.get_by_username(&username)?;
    Ok(Json(PublicUser::from(&user)))
}

/// Delete an account. Callers may only delete themselves.
#[utoipa::path(
    delete,
    path = "/api/users/{username}",
    params(
        ("username" = String, Path, description = "Username of the account to delete")
    ),
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller does not own the account"),
        (status = 404, description = "No such user")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = state
        .users
        .get_by_username(&username)
        .verify_owner(&identity)?;

    state.users.soft_delete(&user.id)?;
    tracing::info!(user_id = %user.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
