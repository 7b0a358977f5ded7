// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CreatePostRequest, PostResponse, RecentQuery, UpdatePostRequest},
    state::AppState,
    storage::{NewPost, OwnershipCheck, PostChanges},
};

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = PostResponse),
        (status = 400, description = "Description missing"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    if request.description.trim().is_empty() {
        return Err(ApiError::bad_request("description is required"));
    }

    let post = state.posts.create(NewPost {
        owner_id: identity.subject_id,
        title: non_blank(request.title),
        photo_url: non_blank(request.photo_url),
        description: request.description,
    })?;

    tracing::info!(post_id = %post.id, owner_id = %post.owner_id, "Post created");
    Ok((StatusCode::CREATED, Json(post.into())))
}

#[utoipa::path(
    get,
    path = "/api/posts/recent",
    params(RecentQuery),
    tag = "Posts",
    responses((status = 200, body = [PostResponse]))
)]
pub async fn recent_posts(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = state.posts.recent(query.effective_limit())?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/posts/user/{username}",
    params(
        ("username" = String, Path, description = "Author username")
    ),
    tag = "Posts",
    responses(
        (status = 200, body = [PostResponse]),
        (status = 404, description = "No such user")
    )
)]
pub async fn user_posts(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let owner = state.users.get_by_username(&username)?;
    let posts = state.posts.list_by_owner(&owner.id)?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/posts/{post_id}",
    params(
        ("post_id" = String, Path, description = "Post identifier")
    ),
    tag = "Posts",
    responses(
        (status = 200, body = PostResponse),
        (status = 404, description = "No such post")
    )
)]
pub async fn get_post(
    Path(post_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(state.posts.get(&post_id)?.into()))
}

#[utoipa::path(
    put,
    path = "/api/posts/{post_id}",
    params(
        ("post_id" = String, Path, description = "Post identifier")
    ),
    request_body = UpdatePostRequest,
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = PostResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller does not own the post"),
        (status = 404, description = "No such post")
    )
)]
pub async fn update_post(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(post_id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    state.posts.get(&post_id).verify_owner(&identity)?;

    let post = state.posts.update(
        &post_id,
        PostChanges {
            title: request.title,
            photo_url: request.photo_url,
            description: request.description,
        },
    )?;
    Ok(Json(post.into()))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{post_id}",
    params(
        ("post_id" = String, Path, description = "Post identifier")
    ),
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller does not own the post"),
        (status = 404, description = "No such post")
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(post_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.posts.get(&post_id).verify_owner(&identity)?;
    state.posts.soft_delete(&post_id)?;

    tracing::info!(post_id = %post_id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}
