// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Axum extractors for authenticated requests.
//!
//! `Auth` verifies the bearer token and resolves the caller's profile
//! document from the store, so every handler works with current role and
//! balance data:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(caller): Auth) -> impl IntoResponse {
//!     // caller.user is the resolved profile
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedUser, Role};
use crate::models::{collections, User};
use crate::state::AppState;

/// Extractor requiring a valid bearer token and an existing profile.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?
            .trim();

        let claims = state.tokens.verify(token)?;

        // The profile is authoritative; a token for a deleted or never
        // materialized account does not authenticate.
        let doc = state
            .store
            .collection(collections::USERS)
            .doc(&claims.sub)
            .get()
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .ok_or(AuthError::UnknownUser)?;

        let user: User = doc
            .deserialize()
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        Ok(Auth(AuthenticatedUser { user }))
    }
}

/// Extractor that additionally requires verifier privileges.
pub struct VerifierOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for VerifierOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(caller) = Auth::from_request_parts(parts, state).await?;

        if !caller.has_role(Role::Verifier) {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(VerifierOnly(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::state::AppState;
    use crate::store::Document;

    fn test_user(role: Role) -> User {
        User {
            key: "user-key".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            wallet_address: None,
            role,
            total_weight_kg: 0.0,
            tokens_earned: 0.0,
            tokens_spent: 0.0,
            password_salt: "s".into(),
            password_hash: "h".into(),
            created_at: Utc::now(),
        }
    }

    async fn state_with_user(user: &User) -> (AppState, TempDir) {
        let (state, dir) = AppState::for_tests();
        state
            .store
            .collection(collections::USERS)
            .doc(&user.key)
            .set(Document::from_serializable(&user.key, user).unwrap().fields)
            .await
            .unwrap();
        (state, dir)
    }

    fn parts_with_header(value: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = value {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_requires_a_header() {
        let (state, _dir) = AppState::for_tests();
        let mut parts = parts_with_header(None);
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_rejects_non_bearer_schemes() {
        let (state, _dir) = AppState::for_tests();
        let mut parts = parts_with_header(Some("Basic abc".into()));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_resolves_the_stored_profile() {
        let user = test_user(Role::User);
        let (state, _dir) = state_with_user(&user).await;
        let token = state.tokens.issue(&user).unwrap();

        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let Auth(caller) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(caller.key(), "user-key");
        assert_eq!(caller.user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn auth_rejects_tokens_without_a_profile() {
        let (state, _dir) = AppState::for_tests();
        let token = state.tokens.issue(&test_user(Role::User)).unwrap();

        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }

    #[tokio::test]
    async fn verifier_only_rejects_plain_users() {
        let user = test_user(Role::User);
        let (state, _dir) = state_with_user(&user).await;
        let token = state.tokens.issue(&user).unwrap();

        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let result = VerifierOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn verifier_only_accepts_verifiers_and_admins() {
        for role in [Role::Verifier, Role::Admin] {
            let user = test_user(role);
            let (state, _dir) = state_with_user(&user).await;
            let token = state.tokens.issue(&user).unwrap();

            let mut parts = parts_with_header(Some(format!("Bearer {token}")));
            let result = VerifierOnly::from_request_parts(&mut parts, &state).await;
            assert!(result.is_ok(), "role {role} should pass");
        }
    }
}
