// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Session cookie transport.
//!
//! The [`CookiePolicy`] is derived from configuration once at startup and is
//! read-only afterwards. Every session cookie is `HttpOnly` so scripts never
//! see token values.

use axum::http::{header::COOKIE, HeaderMap};
use chrono::{DateTime, Utc};

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Path attribute for every session cookie.
pub const COOKIE_PATH: &str = "/";

/// HTTP-date layout used for the `Expires` attribute.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    /// Parse a mode name (case-insensitive).
    pub fn parse(value: &str) -> Option<SameSite> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl std::fmt::Display for SameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport attributes applied to every session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    /// Emit the `Secure` attribute
    pub secure: bool,
    /// `SameSite` mode
    pub same_site: SameSite,
    /// `Domain` attribute; empty means host-only
    pub domain: String,
    /// `Path` attribute
    pub path: String,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::new(false, SameSite::Lax, "")
    }
}

impl CookiePolicy {
    pub fn new(secure: bool, same_site: SameSite, domain: impl Into<String>) -> Self {
        Self {
            secure,
            same_site,
            domain: domain.into(),
            path: COOKIE_PATH.to_string(),
        }
    }

    /// Render a `Set-Cookie` value that expires at `expires`.
    pub fn set_cookie(&self, name: &str, value: &str, expires: DateTime<Utc>) -> String {
        let mut cookie = format!(
            "{name}={value}; Path={}; Expires={}",
            self.path,
            expires.format(HTTP_DATE_FORMAT)
        );
        self.push_attributes(&mut cookie);
        cookie
    }

    /// Render a `Set-Cookie` value that makes the client discard `name`.
    pub fn expired_cookie(&self, name: &str) -> String {
        let mut cookie = format!(
            "{name}=; Path={}; Expires={}; Max-Age=0",
            self.path,
            DateTime::<Utc>::default().format(HTTP_DATE_FORMAT)
        );
        self.push_attributes(&mut cookie);
        cookie
    }

    fn push_attributes(&self, cookie: &mut String) {
        if !self.domain.is_empty() {
            cookie.push_str("; Domain=");
            cookie.push_str(&self.domain);
        }
        cookie.push_str("; HttpOnly");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site.as_str());
    }
}

/// Interpret a boolean flag the way deploy scripts set it (`1`, `true`, `yes`).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Find a non-empty cookie value by name across all `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}
