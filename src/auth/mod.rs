// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! # Authentication Module
//!
//! Session-token authentication for the Critiqal API.
//!
//! ## Auth Flow
//!
//! 1. Client registers or signs in with username and password
//! 2. Server verifies credentials and mints a session pair:
//!    - access token (short-lived) for ordinary requests
//!    - refresh token (long-lived) for minting new access tokens
//! 3. Both tokens are set as `HttpOnly` cookies and returned in the body
//! 4. Protected requests carry `Authorization: Bearer <access token>` or
//!    the `access_token` cookie
//! 5. The identity middleware verifies the token and publishes the caller
//!    [`Identity`] for handlers
//!
//! ## Security
//!
//! - Tokens are HMAC-signed JWTs; any non-HMAC `alg` is rejected
//! - Expiry is checked against the server clock on every decode
//! - Access and refresh tokens are never interchangeable
//! - Clients only ever see "unauthenticated" for a bad token; the precise
//!   reason is logged at debug level
//! - Logout clears cookies only; refresh tokens are not rotated or revoked
//!   server-side

pub mod claims;
pub mod codec;
pub mod cookies;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod service;
pub mod session;

pub use claims::{Identity, SessionClaims, TokenKind};
pub use codec::{TokenCodec, TokenError};
pub use cookies::{CookiePolicy, SameSite};
pub use error::AuthError;
pub use extractor::Auth;
pub use middleware::require_identity;
pub use password::{Argon2Hasher, Argon2Params, CredentialHasher};
pub use service::{AuthService, AuthenticatedSession};
pub use session::{IssuedToken, SessionIssuer, SessionPair};
