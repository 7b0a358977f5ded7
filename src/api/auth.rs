// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    auth::{
        cookies::{read_cookie, REFRESH_TOKEN_COOKIE},
        Auth, AuthError, AuthenticatedSession,
    },
    error::ApiError,
    models::{
        AuthResponse, LoginRequest, PublicUser, RefreshRequest, RefreshResponse, RegisterRequest,
        SignOutResponse,
    },
    state::AppState,
};

/// Write both cookies and build the sign-up/sign-in body.
fn session_response(
    state: &AppState,
    authenticated: AuthenticatedSession,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let mut headers = HeaderMap::new();
    state.sessions.attach(&mut headers, &authenticated.session)?;

    Ok((
        headers,
        Json(AuthResponse {
            user: authenticated.user,
            token: authenticated.session.access.token,
            refresh_token: authenticated.session.refresh.token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created and signed in", body = AuthResponse),
        (status = 400, description = "Username or email missing"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    let authenticated = state.auth.register(&request).await?;
    let (headers, body) = session_response(&state, authenticated)?;
    Ok((StatusCode::CREATED, headers, body))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let authenticated = state.auth.login(&request).await?;
    session_response(&state, authenticated)
}

/// Mint a new access token.
///
/// The refresh token is read from the `refresh_token` cookie, falling back
/// to the JSON body for clients without cookie support.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body(content = RefreshRequest, description = "Refresh token when no cookie is sent"),
    tag = "Auth",
    responses(
        (status = 200, description = "New access token issued", body = RefreshResponse),
        (status = 401, description = "Missing, expired or invalid refresh token")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<(HeaderMap, Json<RefreshResponse>), ApiError> {
    let from_body = body.and_then(|Json(request)| request.refresh_token);
    let refresh_token = read_cookie(&request_headers, REFRESH_TOKEN_COOKIE)
        .map(str::to_string)
        .or(from_body.filter(|token| !token.is_empty()))
        .ok_or(AuthError::MissingToken)?;

    let access = state.auth.refresh(&refresh_token)?;

    let mut headers = HeaderMap::new();
    state.sessions.attach_access(&mut headers, &access)?;
    Ok((headers, Json(RefreshResponse { token: access.token })))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    tag = "Auth",
    responses((status = 200, description = "Session cookies cleared", body = SignOutResponse))
)]
pub async fn sign_out(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<SignOutResponse>), ApiError> {
    let mut headers = HeaderMap::new();
    state.auth.logout(&mut headers)?;
    Ok((headers, Json(SignOutResponse { success: true })))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile of the caller", body = PublicUser),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<PublicUser>, ApiError> {
    Ok(Json(state.auth.whoami(&identity)?))
}
