// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StorageError;

/// Authentication error type.
///
/// Every variant is recovered at the HTTP boundary. Token validation
/// failures collapse into `Unauthenticated` so callers cannot tell an
/// expired token from a forged one, and credential failures collapse into
/// `InvalidCredentials` so usernames cannot be enumerated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Required registration field missing
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    /// Username or email already taken
    #[error("A user with that username or email already exists")]
    DuplicateUser,
    /// Unknown user or wrong password
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// Neither bearer header nor access cookie present
    #[error("Authentication token is required")]
    MissingToken,
    /// Authorization header present but not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    MalformedHeader,
    /// Token failed verification (signature, structure or expiry)
    #[error("Invalid or expired token")]
    Unauthenticated,
    /// A refresh token was presented where an access token is required
    #[error("Refresh tokens cannot authenticate requests")]
    WrongTokenKind,
    /// Refresh token rejected by the refresh flow
    #[error("Invalid refresh token")]
    InvalidRefresh,
    /// Caller does not own the resource
    #[error("Not authorized to modify this resource")]
    Forbidden,
    /// Resource does not exist
    #[error("{0} not found")]
    NotFound(String),
    /// Token signing failed
    #[error("Failed to issue session: {0}")]
    IssuanceFailure(String),
    /// Collaborator (store, hasher) failure
    #[error("Internal authentication error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::ValidationFailed(_) => "validation_failed",
            AuthError::DuplicateUser => "duplicate_user",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::WrongTokenKind => "wrong_token_kind",
            AuthError::InvalidRefresh => "invalid_refresh",
            AuthError::Forbidden => "forbidden",
            AuthError::NotFound(_) => "not_found",
            AuthError::IssuanceFailure(_) => "issuance_failure",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateUser => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::MalformedHeader
            | AuthError::Unauthenticated
            | AuthError::WrongTokenKind
            | AuthError::InvalidRefresh => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::IssuanceFailure(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Internal failures are logged, never echoed.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::IssuanceFailure(_) => "Failed to issue session".to_string(),
            AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => AuthError::NotFound(what),
            StorageError::Conflict(_) => AuthError::DuplicateUser,
            StorageError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "Authentication request failed");
        }
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.public_message(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
