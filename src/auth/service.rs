// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Register, login, refresh, logout and whoami flows.

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use super::claims::Identity;
use super::password::CredentialHasher;
use super::session::{IssuedToken, SessionIssuer, SessionPair};
use super::AuthError;
use crate::models::{LoginRequest, PublicUser, RegisterRequest};
use crate::storage::{NewUser, StorageError, UserRecord, UserStore};

/// A verified user together with freshly minted tokens.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: PublicUser,
    pub session: SessionPair,
}

/// Composes the user store, credential hasher and session issuer.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    sessions: SessionIssuer,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        sessions: SessionIssuer,
    ) -> Self {
        Self {
            users,
            hasher,
            sessions,
        }
    }

    /// Create an account and sign it in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthenticatedSession, AuthError> {
        self.register_at(request, Utc::now()).await
    }

    pub async fn register_at(
        &self,
        request: &RegisterRequest,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedSession, AuthError> {
        let username = request.username.trim();
        let email = request.email.trim();
        if username.is_empty() {
            return Err(AuthError::ValidationFailed("username is required".to_string()));
        }
        if email.is_empty() {
            return Err(AuthError::ValidationFailed("email is required".to_string()));
        }

        let password_hash = self.hash_password(&request.password).await?;

        self.users
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
            })
            .map_err(|e| match e {
                StorageError::Conflict(what) => {
                    tracing::info!(conflict = %what, "Registration rejected");
                    AuthError::DuplicateUser
                }
                other => other.into(),
            })?;

        // Read back the persisted row for store-assigned fields
        let user = self.users.get_by_username(username).map_err(|e| match e {
            StorageError::NotFound(_) => {
                AuthError::Internal(format!("user {username} missing after create"))
            }
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, "User registered");
        self.sign_in(&user, now)
    }

    /// Verify credentials and sign the user in.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthenticatedSession, AuthError> {
        self.login_at(request, Utc::now()).await
    }

    pub async fn login_at(
        &self,
        request: &LoginRequest,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedSession, AuthError> {
        let user = match self.users.get_by_username(request.username.trim()) {
            Ok(user) => user,
            Err(StorageError::NotFound(_)) => {
                tracing::debug!("Login for unknown username");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !self.verify_password(&request.password, &user.password_hash).await? {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User signed in");
        self.sign_in(&user, now)
    }

    /// Hash on a blocking thread; Argon2 is too slow for a runtime worker.
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("spawn password hashing task: {e}")))?
    }

    async fn verify_password(&self, password: &str, digest: &str) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AuthError::Internal(format!("spawn password verification task: {e}")))
    }

    fn sign_in(&self, user: &UserRecord, now: DateTime<Utc>) -> Result<AuthenticatedSession, AuthError> {
        let session = self
            .sessions
            .issue_at(&Identity::new(&user.id, &user.username), now)?;

        Ok(AuthenticatedSession {
            user: PublicUser::from(user),
            session,
        })
    }

    /// Mint a new access token from a refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<IssuedToken, AuthError> {
        self.sessions.refresh(refresh_token)
    }

    pub fn refresh_at(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        self.sessions.refresh_at(refresh_token, now)
    }

    /// Clear both session cookies on the outgoing response.
    pub fn logout(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        self.sessions.revoke(headers)
    }

    /// Public profile of the caller.
    pub fn whoami(&self, identity: &Identity) -> Result<PublicUser, AuthError> {
        let user = self.users.get_by_id(&identity.subject_id)?;
        Ok(PublicUser::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenKind;
    use crate::test_utils::{test_hasher, test_issuer};
    use crate::storage::InMemoryStore;
    use chrono::TimeDelta;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(test_hasher()),
            test_issuer(),
        )
    }

    fn registration(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
        }
    }

    fn credentials(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let auth = service();
        let registered = auth
            .register(&registration("alice", "alice@example.com", "p@ss1"))
            .await
            .unwrap();
        assert_eq!(registered.user.username, "alice");
        assert!(!registered.user.id.is_empty());

        let signed_in = auth.login(&credentials("alice", "p@ss1")).await.unwrap();
        assert_eq!(signed_in.user.id, registered.user.id);
        assert_eq!(signed_in.session.access.claims.kind, TokenKind::Access);
        assert_eq!(signed_in.session.refresh.claims.kind, TokenKind::Refresh);
        assert_eq!(signed_in.session.access.claims.subject_id, registered.user.id);

        assert!(matches!(
            auth.login(&credentials("alice", "wrong")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let auth = service();
        auth.register(&registration("alice", "alice@example.com", "p@ss1"))
            .await
            .unwrap();

        let unknown = auth.login(&credentials("mallory", "p@ss1")).await.unwrap_err();
        let wrong = auth.login(&credentials("alice", "nope")).await.unwrap_err();
        assert_eq!(unknown, wrong);
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn register_requires_username_and_email() {
        let auth = service();
        assert!(matches!(
            auth.register(&registration("  ", "alice@example.com", "p@ss1")).await,
            Err(AuthError::ValidationFailed(_))
        ));
        assert!(matches!(
            auth.register(&registration("alice", "", "p@ss1")).await,
            Err(AuthError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let auth = service();
        auth.register(&registration("alice", "alice@example.com", "p@ss1"))
            .await
            .unwrap();

        assert!(matches!(
            auth.register(&registration("alice", "other@example.com", "p@ss1")).await,
            Err(AuthError::DuplicateUser)
        ));
        assert!(matches!(
            auth.register(&registration("alice2", "alice@example.com", "p@ss1")).await,
            Err(AuthError::DuplicateUser)
        ));
    }

    #[tokio::test]
    async fn refresh_scenario_follows_token_lifetimes() {
        let auth = service();
        let issued = Utc::now();
        let session = auth
            .register_at(&registration("alice", "alice@example.com", "p@ss1"), issued)
            .await
            .unwrap()
            .session;

        let day_later = issued + TimeDelta::days(1);
        let access = auth.refresh_at(&session.refresh.token, day_later).unwrap();
        assert_eq!(
            access.claims.expires_at,
            (day_later + TimeDelta::minutes(15)).timestamp()
        );

        assert!(matches!(
            auth.refresh_at(&session.refresh.token, issued + TimeDelta::days(8)),
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            auth.refresh_at(&session.access.token, issued),
            Err(AuthError::InvalidRefresh)
        ));
    }

    #[tokio::test]
    async fn whoami_returns_public_profile() {
        let auth = service();
        let registered = auth
            .register(&registration("alice", "alice@example.com", "p@ss1"))
            .await
            .unwrap();

        let identity = Identity::new(&registered.user.id, "alice");
        let profile = auth.whoami(&identity).unwrap();
        assert_eq!(profile, registered.user);

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());

        assert!(matches!(
            auth.whoami(&Identity::new("ghost", "ghost")),
            Err(AuthError::NotFound(_))
        ));
    }

    /// Stores plaintext and records which thread did the work.
    #[derive(Default)]
    struct RecordingHasher {
        threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl RecordingHasher {
        fn record(&self) {
            self.threads
                .lock()
                .unwrap()
                .push(std::thread::current().id());
        }
    }

    impl CredentialHasher for RecordingHasher {
        fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
            self.record();
            Ok(format!("plain:{plaintext}"))
        }

        fn verify(&self, plaintext: &str, digest: &str) -> bool {
            self.record();
            digest == format!("plain:{plaintext}")
        }
    }

    struct PanickingHasher;

    impl CredentialHasher for PanickingHasher {
        fn hash(&self, _plaintext: &str) -> Result<String, AuthError> {
            panic!("hasher blew up");
        }

        fn verify(&self, _plaintext: &str, _digest: &str) -> bool {
            panic!("hasher blew up");
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn hashing_runs_off_the_runtime_thread() {
        let hasher = Arc::new(RecordingHasher::default());
        let auth = AuthService::new(
            Arc::new(InMemoryStore::new()),
            hasher.clone(),
            test_issuer(),
        );

        auth.register(&registration("alice", "alice@example.com", "p@ss1"))
            .await
            .unwrap();
        auth.login(&credentials("alice", "p@ss1")).await.unwrap();

        let runtime_thread = std::thread::current().id();
        let threads = hasher.threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id != runtime_thread));
    }

    #[tokio::test]
    async fn hasher_panic_is_internal_error() {
        let store = Arc::new(InMemoryStore::new());
        let auth = AuthService::new(store.clone(), Arc::new(PanickingHasher), test_issuer());
        assert!(matches!(
            auth.register(&registration("alice", "alice@example.com", "p@ss1"))
                .await,
            Err(AuthError::Internal(_))
        ));

        store
            .create(NewUser {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "plain:pw".to_string(),
                first_name: String::new(),
                last_name: String::new(),
            })
            .unwrap();
        assert!(matches!(
            auth.login(&credentials("bob", "pw")).await,
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn logout_clears_both_cookies() {
        let mut headers = HeaderMap::new();
        service().logout(&mut headers).unwrap();
        assert_eq!(headers.get_all(axum::http::header::SET_COOKIE).iter().count(), 2);
    }
}
