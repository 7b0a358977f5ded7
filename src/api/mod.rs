// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_identity, Identity, TokenKind},
    models::{
        AuthResponse, CreatePostRequest, LoginRequest, PostResponse, PublicUser, RefreshRequest,
        RefreshResponse, RegisterRequest, SignOutResponse, UpdatePostRequest,
    },
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod posts;
pub mod users;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/users", get(users::list_users))
        .route("/users/search/{prefix}", get(users::search_users))
        .route("/users/{username}", get(users::get_user))
        .route("/posts/recent", get(posts::recent_posts))
        .route("/posts/user/{username}", get(posts::user_posts))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/users/{username}", delete(users::delete_user))
        .route("/posts", post(posts::create_post))
        .route(
            "/posts/{post_id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_identity,
        ));

    let api_routes = public_routes.merge(protected_routes).with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Bearer scheme referenced by protected operations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearer_auth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token from sign-in. The `access_token` cookie is accepted too.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::sign_up,
        auth::sign_in,
        auth::refresh,
        auth::sign_out,
        auth::me,
        users::list_users,
        users::search_users,
        users::get_user,
        users::delete_user,
        posts::create_post,
        posts::recent_posts,
        posts::user_posts,
        posts::get_post,
        posts::update_post,
        posts::delete_post,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthResponse,
            RefreshResponse,
            SignOutResponse,
            PublicUser,
            Identity,
            TokenKind,
            CreatePostRequest,
            UpdatePostRequest,
            PostResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, sign-in and session tokens"),
        (name = "Users", description = "User profiles"),
        (name = "Posts", description = "Ownership-gated posts"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_state;
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
            Request, StatusCode,
        },
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn sign_up(app: &Router, username: &str) -> Value {
        let response = send(
            app,
            json_request(
                "POST",
                "/api/auth/sign-up",
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "p@ss1",
                    "first_name": "Test",
                    "last_name": "User"
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(test_state());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn openapi_lists_bearer_scheme() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
        assert!(doc["paths"]["/api/auth/sign-in"].is_object());
    }

    #[tokio::test]
    async fn protected_route_without_token_is_missing_token() {
        let app = router(test_state());
        let response = send(
            &app,
            Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error_code"], "missing_token");
    }

    #[tokio::test]
    async fn basic_auth_header_is_malformed() {
        let app = router(test_state());
        let response = send(
            &app,
            Request::builder()
                .uri("/api/auth/me")
                .header(AUTHORIZATION, "Basic xxx")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error_code"], "malformed_header");
    }

    #[tokio::test]
    async fn sign_up_then_me_with_bearer_and_cookie() {
        let app = router(test_state());
        let signed_up = sign_up(&app, "alice").await;
        let token = signed_up["token"].as_str().unwrap();

        let response = send(
            &app,
            Request::builder()
                .uri("/api/auth/me")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let me = body_json(response).await;
        assert_eq!(me["username"], "alice");
        assert!(me.get("password").is_none());

        let response = send(
            &app,
            Request::builder()
                .uri("/api/auth/me")
                .header(COOKIE, format!("access_token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn refresh_token_cannot_call_protected_routes() {
        let app = router(test_state());
        let signed_up = sign_up(&app, "alice").await;
        let refresh_token = signed_up["refresh_token"].as_str().unwrap();

        let response = send(
            &app,
            Request::builder()
                .uri("/api/auth/me")
                .header(AUTHORIZATION, format!("Bearer {refresh_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error_code"], "wrong_token_kind");
    }

    #[tokio::test]
    async fn sign_in_sets_http_only_cookies() {
        let app = router(test_state());
        sign_up(&app, "alice").await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/auth/sign-in",
                json!({"username": "alice", "password": "p@ss1"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let cookies: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

        let body = body_json(response).await;
        assert!(body["token"].is_string());
        assert!(body["refresh_token"].is_string());
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn refresh_via_cookie_and_sign_out() {
        let app = router(test_state());
        let signed_up = sign_up(&app, "alice").await;
        let refresh_token = signed_up["refresh_token"].as_str().unwrap();

        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header(COOKIE, format!("refresh_token={refresh_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 1);
        assert!(body_json(response).await["token"].is_string());

        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/auth/sign-out")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);
    }

    #[tokio::test]
    async fn post_ownership_end_to_end() {
        let app = router(test_state());
        let alice = sign_up(&app, "alice").await;
        let bob = sign_up(&app, "bob").await;
        let alice_token = alice["token"].as_str().unwrap();
        let bob_token = bob["token"].as_str().unwrap();

        let mut create = json_request("POST", "/api/posts", json!({"description": "hello"}));
        create.headers_mut().insert(
            AUTHORIZATION,
            format!("Bearer {alice_token}").parse().unwrap(),
        );
        let response = send(&app, create).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let post_id = body_json(response).await["id"].as_str().unwrap().to_string();

        let delete_as = |token: &str, id: &str| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/posts/{id}"))
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let response = send(&app, delete_as(bob_token, &post_id)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&app, delete_as(bob_token, "post-404")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, delete_as(alice_token, &post_id)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(
            &app,
            Request::builder()
                .uri(format!("/api/posts/{post_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn public_reads_need_no_token() {
        let app = router(test_state());
        sign_up(&app, "alice").await;

        for uri in [
            "/api/users",
            "/api/users/alice",
            "/api/users/search/al",
            "/api/posts/recent?limit=5",
            "/api/posts/user/alice",
            "/api/health",
            "/api/health/ready",
        ] {
            let response = send(
                &app,
                Request::builder().uri(uri).body(Body::empty()).unwrap(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn deleting_a_user_requires_identity() {
        let app = router(test_state());
        sign_up(&app, "alice").await;

        let response = send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri("/api/users/alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
