// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`AppConfig`] loaded from
//! them once at startup. Nothing here changes after the server starts.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HMAC secret for session tokens | Required |
//! | `COOKIE_SECURE` | `1`/`true`/`yes` sets the `Secure` attribute | `false` |
//! | `COOKIE_SAMESITE` | `Strict`, `Lax` or `None` | `Lax` |
//! | `COOKIE_DOMAIN` | Cookie `Domain` attribute | host-only |
//! | `ACCESS_TOKEN_TTL_MINUTES` | Access token lifetime | `15` |
//! | `REFRESH_TOKEN_TTL_DAYS` | Refresh token lifetime | `7` |
//! | `DATA_DIR` | Directory for the redb database | in-memory store |
//! | `TLS_CERT_PATH` | PEM certificate chain | plain HTTP |
//! | `TLS_KEY_PATH` | PEM private key | plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::TimeDelta;

use crate::auth::cookies::parse_flag;
use crate::auth::session::{DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS};
use crate::auth::{CookiePolicy, SameSite, SessionIssuer, TokenCodec};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// HMAC signing secret. Startup fails when missing or empty.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
pub const COOKIE_SAMESITE_ENV: &str = "COOKIE_SAMESITE";
pub const COOKIE_DOMAIN_ENV: &str = "COOKIE_DOMAIN";

pub const ACCESS_TOKEN_TTL_ENV: &str = "ACCESS_TOKEN_TTL_MINUTES";
pub const REFRESH_TOKEN_TTL_ENV: &str = "REFRESH_TOKEN_TTL_DAYS";

/// Environment variable name for the data directory path.
///
/// When unset the server keeps everything in memory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set to a non-empty value")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("access token lifetime must not exceed refresh token lifetime")]
    LifetimeOrder,

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}

/// Certificate and key locations for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; anything else is pretty.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    /// Read `LOG_FORMAT` from the process environment.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }
}

/// Process configuration, read once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub cookies: CookiePolicy,
    pub access_ttl: TimeDelta,
    pub refresh_ttl: TimeDelta,
    pub data_dir: Option<PathBuf>,
    pub tls: Option<TlsPaths>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("cookies", &self.cookies)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("data_dir", &self.data_dir)
            .field("tls", &self.tls)
            .finish()
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    value: host.clone(),
                    reason: e.to_string(),
                })?;

        // The secret is used verbatim; only an all-blank value is rejected
        let jwt_secret = lookup(JWT_SECRET_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let secure = get(COOKIE_SECURE_ENV).is_some_and(|v| parse_flag(&v));
        let same_site = match get(COOKIE_SAMESITE_ENV) {
            Some(raw) => SameSite::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unknown COOKIE_SAMESITE value, using Lax");
                SameSite::Lax
            }),
            None => SameSite::Lax,
        };
        let domain = get(COOKIE_DOMAIN_ENV).unwrap_or_default();

        let access_ttl = TimeDelta::minutes(positive(
            ACCESS_TOKEN_TTL_ENV,
            get(ACCESS_TOKEN_TTL_ENV),
            DEFAULT_ACCESS_TTL_MINUTES,
        )?);
        let refresh_ttl = TimeDelta::days(positive(
            REFRESH_TOKEN_TTL_ENV,
            get(REFRESH_TOKEN_TTL_ENV),
            DEFAULT_REFRESH_TTL_DAYS,
        )?);
        if access_ttl > refresh_ttl {
            return Err(ConfigError::LifetimeOrder);
        }

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            cookies: CookiePolicy::new(secure, same_site, domain),
            access_ttl,
            refresh_ttl,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            tls,
        })
    }

    /// Build the session issuer described by this configuration.
    pub fn session_issuer(&self) -> Result<SessionIssuer, ConfigError> {
        let codec = TokenCodec::new(&self.jwt_secret).map_err(|e| ConfigError::Invalid {
            name: JWT_SECRET_ENV,
            value: "<redacted>".to_string(),
            reason: e.to_string(),
        })?;

        Ok(SessionIssuer::new(codec, self.cookies.clone())
            .with_lifetimes(self.access_ttl, self.refresh_ttl))
    }
}

fn positive(name: &'static str, raw: Option<String>, default: i64) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(ConfigError::Invalid {
            name,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_with_only_secret() {
        let config = load(&[(JWT_SECRET_ENV, "s3cret")]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert!(!config.cookies.secure);
        assert_eq!(config.cookies.same_site, SameSite::Lax);
        assert_eq!(config.cookies.domain, "");
        assert_eq!(config.cookies.path, "/");
        assert_eq!(config.access_ttl, TimeDelta::minutes(15));
        assert_eq!(config.refresh_ttl, TimeDelta::days(7));
        assert!(config.data_dir.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(Some(" JSON ")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("text")), LogFormat::Pretty);
    }

    #[test]
    fn missing_secret_is_fatal() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing(JWT_SECRET_ENV))));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, "   ")]),
            Err(ConfigError::Missing(JWT_SECRET_ENV))
        ));
    }

    #[test]
    fn cookie_settings_are_parsed() {
        let config = load(&[
            (JWT_SECRET_ENV, "s3cret"),
            (COOKIE_SECURE_ENV, " TRUE "),
            (COOKIE_SAMESITE_ENV, "strict"),
            (COOKIE_DOMAIN_ENV, " critiqal.example "),
        ])
        .unwrap();

        assert!(config.cookies.secure);
        assert_eq!(config.cookies.same_site, SameSite::Strict);
        assert_eq!(config.cookies.domain, "critiqal.example");
    }

    #[test]
    fn unknown_same_site_falls_back_to_lax() {
        let config = load(&[(JWT_SECRET_ENV, "s3cret"), (COOKIE_SAMESITE_ENV, "sometimes")]).unwrap();
        assert_eq!(config.cookies.same_site, SameSite::Lax);
    }

    #[test]
    fn invalid_lifetimes_are_rejected() {
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, "s"), (ACCESS_TOKEN_TTL_ENV, "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, "s"), (REFRESH_TOKEN_TTL_ENV, "week")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            load(&[
                (JWT_SECRET_ENV, "s"),
                (ACCESS_TOKEN_TTL_ENV, "20000"),
                (REFRESH_TOKEN_TTL_ENV, "1"),
            ]),
            Err(ConfigError::LifetimeOrder)
        ));
    }

    #[test]
    fn tls_paths_must_come_in_pairs() {
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, "s"), (TLS_CERT_PATH_ENV, "/certs/cert.pem")]),
            Err(ConfigError::PartialTls)
        ));

        let config = load(&[
            (JWT_SECRET_ENV, "s"),
            (TLS_CERT_PATH_ENV, "/certs/cert.pem"),
            (TLS_KEY_PATH_ENV, "/certs/key.pem"),
        ])
        .unwrap();
        assert_eq!(config.tls.unwrap().key, PathBuf::from("/certs/key.pem"));
    }

    #[test]
    fn session_issuer_uses_configured_lifetimes() {
        let config = load(&[(JWT_SECRET_ENV, "s3cret"), (ACCESS_TOKEN_TTL_ENV, "5")]).unwrap();
        let issuer = config.session_issuer().unwrap();
        let now = chrono::Utc::now();
        let pair = issuer
            .issue_at(&crate::auth::Identity::new("user-1", "alice"), now)
            .unwrap();
        assert_eq!(
            pair.access.claims.expires_at,
            (now + TimeDelta::minutes(5)).timestamp()
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let config = load(&[(JWT_SECRET_ENV, "super-secret-value")]).unwrap();
        assert!(!format!("{config:?}").contains("super-secret-value"));
    }
}
