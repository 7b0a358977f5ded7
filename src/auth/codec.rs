// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Symmetric-key encoding and decoding of session tokens.
//!
//! Tokens are JWTs signed with HMAC-SHA256 under the server secret. Decoding
//! only accepts the HMAC family (`HS256`, `HS384`, `HS512`); tokens whose
//! header names any other algorithm, including `none`, are rejected before
//! the signature is looked at.
//!
//! Expiry is checked here against the caller-supplied clock rather than by
//! `jsonwebtoken`'s built-in validation, so the refresh flow and the identity
//! middleware see the same rule and tests can pin the current time.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};

use super::claims::SessionClaims;

/// Header algorithms accepted on decode.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Algorithm used when signing.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Token codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed")]
    MalformedToken,

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Issuance(String),

    #[error("signing secret must not be empty")]
    EmptySecret,
}

/// Encodes and verifies session tokens under a fixed server secret.
///
/// Constructed once at startup and shared read-only across requests.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec for the given signing secret.
    ///
    /// # Errors
    /// Returns `TokenError::EmptySecret` if the secret is empty.
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Serialize and sign a claim set.
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Issuance(e.to_string()))
    }

    /// Verify and decode a token against the current time.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Verify and decode a token against `now`.
    ///
    /// Checks, in order: header algorithm, signature, claim structure,
    /// expiry.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::MalformedToken)?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(TokenError::InvalidSignature);
        }

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::MalformedToken,
            })?;

        let claims = token_data.claims;
        if !claims.has_identity() {
            return Err(TokenError::MalformedToken);
        }
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
