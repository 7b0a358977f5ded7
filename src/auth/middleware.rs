// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Identity middleware for Axum.
//!
//! Resolves the caller before a protected handler runs:
//!
//! 1. `Authorization: Bearer <token>` if the header is present (any other
//!    shape is `MalformedHeader`)
//! 2. otherwise the `access_token` cookie
//! 3. neither => `MissingToken`
//! 4. decode; any failure => `Unauthenticated`
//! 5. refresh tokens => `WrongTokenKind`
//!
//! On success the [`Identity`] is inserted into the request extensions where
//! the `Auth` extractor picks it up. Nothing outside the request is touched.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use super::claims::{Identity, TokenKind};
use super::codec::TokenCodec;
use super::cookies::{read_cookie, ACCESS_TOKEN_COOKIE};
use super::AuthError;
use crate::state::AppState;

/// Where the access token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Header,
    Cookie,
}

/// Pull the raw access token out of the request headers.
pub fn extract_token(headers: &HeaderMap) -> Result<(&str, TokenSource), AuthError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
        if !value.is_empty() {
            let parts: Vec<&str> = value.split(' ').collect();
            return match parts.as_slice() {
                ["Bearer", ""] => Err(AuthError::MissingToken),
                ["Bearer", token] => Ok((*token, TokenSource::Header)),
                _ => Err(AuthError::MalformedHeader),
            };
        }
    }

    read_cookie(headers, ACCESS_TOKEN_COOKIE)
        .map(|token| (token, TokenSource::Cookie))
        .ok_or(AuthError::MissingToken)
}

/// Resolve the caller identity from request headers.
pub fn resolve_identity(headers: &HeaderMap, codec: &TokenCodec) -> Result<Identity, AuthError> {
    resolve_identity_at(headers, codec, Utc::now())
}

/// Resolve the caller identity as of `now`.
pub fn resolve_identity_at(
    headers: &HeaderMap,
    codec: &TokenCodec,
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    let (token, source) = extract_token(headers)?;

    let claims = codec.decode_at(token, now).map_err(|e| {
        tracing::debug!(reason = %e, ?source, "Access token rejected");
        AuthError::Unauthenticated
    })?;

    if claims.kind != TokenKind::Access {
        tracing::debug!(kind = %claims.kind, ?source, "Non-access token presented");
        return Err(AuthError::WrongTokenKind);
    }

    Ok(Identity::from(&claims))
}

/// Authentication middleware function.
///
/// ```rust,ignore
/// Router::new()
///     .route("/auth/me", get(me))
///     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_identity));
/// ```
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_identity(request.headers(), state.sessions.codec()) {
        Ok(identity) => {
            tracing::debug!(subject_id = %identity.subject_id, "Request authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::SessionClaims;
    use axum::http::{header::COOKIE, HeaderValue};
    use chrono::TimeDelta;

    fn codec() -> TokenCodec {
        TokenCodec::new("middleware-test-secret").unwrap()
    }

    fn token(kind: TokenKind, expires_at: DateTime<Utc>) -> String {
        codec()
            .encode(&SessionClaims::new(
                &Identity::new("user-1", "alice"),
                kind,
                expires_at,
            ))
            .unwrap()
    }

    fn with_header(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_header_authenticates() {
        let now = Utc::now();
        let headers = with_header(&format!(
            "Bearer {}",
            token(TokenKind::Access, now + TimeDelta::minutes(15))
        ));

        let identity = resolve_identity_at(&headers, &codec(), now).unwrap();
        assert_eq!(identity, Identity::new("user-1", "alice"));
        assert_eq!(extract_token(&headers).unwrap().1, TokenSource::Header);
    }

    #[test]
    fn cookie_is_used_without_header() {
        let now = Utc::now();
        let headers = with_cookie(&format!(
            "access_token={}",
            token(TokenKind::Access, now + TimeDelta::minutes(15))
        ));

        assert!(resolve_identity_at(&headers, &codec(), now).is_ok());
        assert_eq!(extract_token(&headers).unwrap().1, TokenSource::Cookie);
    }

    #[test]
    fn header_takes_precedence_over_cookie() {
        let now = Utc::now();
        let mut headers = with_cookie(&format!(
            "access_token={}",
            token(TokenKind::Access, now + TimeDelta::minutes(15))
        ));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xxx"));

        assert_eq!(
            resolve_identity_at(&headers, &codec(), now),
            Err(AuthError::MalformedHeader)
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for value in ["Basic xxx", "Bearer", "bearer abc", "Bearer a b", "Token abc"] {
            assert_eq!(
                extract_token(&with_header(value)).unwrap_err(),
                AuthError::MalformedHeader,
                "{value}"
            );
        }
    }

    #[test]
    fn no_header_and_no_cookie_is_missing_token() {
        assert_eq!(
            resolve_identity(&HeaderMap::new(), &codec()),
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            resolve_identity(&with_cookie("theme=dark"), &codec()),
            Err(AuthError::MissingToken)
        );
    }

    #[test]
    fn empty_bearer_token_is_missing_token() {
        assert_eq!(
            extract_token(&with_header("Bearer ")).unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn decode_failures_are_undifferentiated() {
        let now = Utc::now();
        let expired = with_header(&format!(
            "Bearer {}",
            token(TokenKind::Access, now - TimeDelta::seconds(1))
        ));
        let forged = with_header(&format!(
            "Bearer {}",
            TokenCodec::new("forger")
                .unwrap()
                .encode(&SessionClaims::new(
                    &Identity::new("user-1", "alice"),
                    TokenKind::Access,
                    now + TimeDelta::minutes(15),
                ))
                .unwrap()
        ));
        let garbage = with_header("Bearer not.a.token");

        for headers in [expired, forged, garbage] {
            assert_eq!(
                resolve_identity_at(&headers, &codec(), now),
                Err(AuthError::Unauthenticated)
            );
        }
    }

    #[test]
    fn refresh_token_cannot_authenticate() {
        let now = Utc::now();
        let headers = with_header(&format!(
            "Bearer {}",
            token(TokenKind::Refresh, now + TimeDelta::days(7))
        ));

        assert_eq!(
            resolve_identity_at(&headers, &codec(), now),
            Err(AuthError::WrongTokenKind)
        );
    }
}
