// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Session pair issuance, cookie attachment, refresh and revocation.
//!
//! ## Session Model
//!
//! - Login and registration mint an access token (default 15 minutes) and a
//!   refresh token (default 7 days) together.
//! - Refresh mints a new access token only. The refresh token is not rotated
//!   and stays valid until its own expiry.
//! - Revocation is client-side: both cookies are overwritten with an empty,
//!   already-expired value. There is no server-side deny list, so a copied
//!   refresh token keeps working until it expires.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use chrono::{DateTime, TimeDelta, Utc};

use super::claims::{Identity, SessionClaims, TokenKind};
use super::codec::{TokenCodec, TokenError};
use super::cookies::{CookiePolicy, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use super::AuthError;

/// Default access token lifetime in minutes.
pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;

/// Default refresh token lifetime in days.
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

/// A signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: SessionClaims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expiry()
    }
}

/// Access and refresh tokens minted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Mints session tokens and writes them to responses as cookies.
#[derive(Debug, Clone)]
pub struct SessionIssuer {
    codec: TokenCodec,
    cookies: CookiePolicy,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl SessionIssuer {
    /// Create an issuer with the default lifetimes.
    pub fn new(codec: TokenCodec, cookies: CookiePolicy) -> Self {
        Self {
            codec,
            cookies,
            access_ttl: TimeDelta::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            refresh_ttl: TimeDelta::days(DEFAULT_REFRESH_TTL_DAYS),
        }
    }

    /// Override token lifetimes. Callers guarantee `access <= refresh`.
    pub fn with_lifetimes(mut self, access_ttl: TimeDelta, refresh_ttl: TimeDelta) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Issue a session pair for a verified identity.
    pub fn issue(&self, identity: &Identity) -> Result<SessionPair, AuthError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a session pair as of `now`.
    ///
    /// Deterministic for a fixed `now`.
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<SessionPair, AuthError> {
        Ok(SessionPair {
            access: self.mint(identity, TokenKind::Access, now + self.access_ttl)?,
            refresh: self.mint(identity, TokenKind::Refresh, now + self.refresh_ttl)?,
        })
    }

    fn mint(
        &self,
        identity: &Identity,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let claims = SessionClaims::new(identity, kind, expires_at);
        let token = self
            .codec
            .encode(&claims)
            .map_err(|e| AuthError::IssuanceFailure(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Write both session cookies.
    pub fn attach(&self, headers: &mut HeaderMap, pair: &SessionPair) -> Result<(), AuthError> {
        self.attach_access(headers, &pair.access)?;
        append_cookie(
            headers,
            self.cookies.set_cookie(
                REFRESH_TOKEN_COOKIE,
                &pair.refresh.token,
                pair.refresh.expires_at(),
            ),
        )
    }

    /// Write the access cookie only.
    pub fn attach_access(&self, headers: &mut HeaderMap, access: &IssuedToken) -> Result<(), AuthError> {
        append_cookie(
            headers,
            self.cookies
                .set_cookie(ACCESS_TOKEN_COOKIE, &access.token, access.expires_at()),
        )
    }

    /// Exchange a refresh token for a new access token.
    pub fn refresh(&self, refresh_token: &str) -> Result<IssuedToken, AuthError> {
        self.refresh_at(refresh_token, Utc::now())
    }

    /// Exchange a refresh token for a new access token as of `now`.
    ///
    /// An expired refresh token is `Unauthenticated`; any other decode
    /// failure, or an access token, is `InvalidRefresh`.
    pub fn refresh_at(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let claims = self
            .codec
            .decode_at(refresh_token, now)
            .map_err(|e| {
                tracing::debug!(reason = %e, "Refresh token rejected");
                match e {
                    TokenError::Expired => AuthError::Unauthenticated,
                    _ => AuthError::InvalidRefresh,
                }
            })?;

        if claims.kind != TokenKind::Refresh {
            tracing::debug!(kind = %claims.kind, "Non-refresh token presented to refresh");
            return Err(AuthError::InvalidRefresh);
        }

        self.mint(&Identity::from(&claims), TokenKind::Access, now + self.access_ttl)
    }

    /// Overwrite both session cookies with expired blanks.
    pub fn revoke(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        append_cookie(headers, self.cookies.expired_cookie(ACCESS_TOKEN_COOKIE))?;
        append_cookie(headers, self.cookies.expired_cookie(REFRESH_TOKEN_COOKIE))
    }
}

fn append_cookie(headers: &mut HeaderMap, cookie: String) -> Result<(), AuthError> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| AuthError::Internal(format!("invalid Set-Cookie value: {e}")))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}
