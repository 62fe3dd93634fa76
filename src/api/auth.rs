// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Registration and login endpoints.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    auth::{credentials, Role},
    error::ApiError,
    models::{collections, User, UserProfile},
    state::AppState,
    store::Document,
};

/// Request to create an account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Email address; the account key derives from its canonical form.
    pub email: String,
    /// Password (minimum 8 characters).
    pub password: String,
    /// Optional EVM wallet address for on-chain rewards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Requested role: `user` (default) or `verifier`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Request to log in.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the resolved profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    pub user: UserProfile,
}

fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    if !request.email.contains('@') {
        return Err(ApiError::bad_request("email is not a valid address"));
    }
    if request.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }
    if let Some(wallet) = &request.wallet_address {
        validate_wallet_address(wallet)?;
    }
    Ok(())
}

/// Validate an EVM address (0x + 40 hex chars).
pub fn validate_wallet_address(address: &str) -> Result<(), ApiError> {
    if !address.starts_with("0x")
        || address.len() != 42
        || !address[2..].chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(ApiError::bad_request(
            "wallet_address must be 0x followed by 40 hex characters",
        ));
    }
    Ok(())
}

/// Create an account.
///
/// The account document is created with an existence-guarded write, so a
/// concurrent duplicate registration loses cleanly.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 422, description = "Account already exists"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    validate_registration(&request)?;

    let role = match request.role.as_deref() {
        None => Role::User,
        Some(raw) => match Role::from_str(raw) {
            Some(Role::Admin) | None => {
                return Err(ApiError::bad_request("role must be 'user' or 'verifier'"))
            }
            Some(role) => role,
        },
    };

    let email = credentials::canonicalize_email(&request.email);
    let key = credentials::user_key_for_email(&email);
    let salt = credentials::generate_salt();
    let password_hash = credentials::hash_password(&salt, &request.password);

    let user = User {
        key: key.clone(),
        name: request.name.trim().to_string(),
        email,
        wallet_address: request.wallet_address.clone(),
        role,
        total_weight_kg: 0.0,
        tokens_earned: 0.0,
        tokens_spent: 0.0,
        password_salt: salt,
        password_hash,
        created_at: Utc::now(),
    };

    let doc = Document::from_serializable(&key, &user)?;
    state
        .store
        .collection(collections::USERS)
        .doc(&key)
        .set(doc.fields)
        .await
        .map_err(|e| match e {
            crate::store::StoreError::AlreadyExists(_) => {
                ApiError::unprocessable("An account already exists for this email")
            }
            other => other.into(),
        })?;

    // On-chain identity registration is best-effort.
    if let (Some(chain), Some(wallet)) = (&state.chain, &user.wallet_address) {
        if let Err(e) = chain.register_identity(wallet, &user.name).await {
            warn!(user_key = %key, error = %e, "identity registration failed; continuing");
        }
    }

    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Invalid email or password"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = credentials::canonicalize_email(&request.email);
    let key = credentials::user_key_for_email(&email);

    // Same response for unknown email and wrong password.
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let doc = state
        .store
        .collection(collections::USERS)
        .doc(&key)
        .get()
        .await?
        .ok_or_else(invalid)?;

    let user: User = doc.deserialize()?;

    if !credentials::verify_password(&user.password_salt, &request.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".into(),
            email: email.into(),
            password: "correct horse".into(),
            wallet_address: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trips() {
        let (state, _dir) = AppState::for_tests();

        let Json(registered) = register(
            State(state.clone()),
            Json(register_request("Ada@Example.com")),
        )
        .await
        .unwrap();
        assert_eq!(registered.user.email, "ada@example.com");
        assert_eq!(registered.user.role, Role::User);

        let Json(logged_in) = login(
            State(state),
            Json(LoginRequest {
                email: "  ada@example.COM ".into(),
                password: "correct horse".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(logged_in.user.key, registered.user.key);
        assert!(!logged_in.token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (state, _dir) = AppState::for_tests();

        register(State(state.clone()), Json(register_request("ada@example.com")))
            .await
            .unwrap();
        let err = register(
            State(state),
            Json(register_request("ADA@example.com")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_email() {
        let (state, _dir) = AppState::for_tests();
        register(State(state.clone()), Json(register_request("ada@example.com")))
            .await
            .unwrap();

        let err = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@example.com".into(),
                password: "wrong horse".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "ghost@example.com".into(),
                password: "correct horse".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_validates_input() {
        let (state, _dir) = AppState::for_tests();

        let mut bad_email = register_request("not-an-email");
        bad_email.email = "not-an-email".into();
        let err = register(State(state.clone()), Json(bad_email)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let mut short_password = register_request("ada@example.com");
        short_password.password = "short".into();
        let err = register(State(state.clone()), Json(short_password))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let mut bad_wallet = register_request("ada@example.com");
        bad_wallet.wallet_address = Some("0x123".into());
        let err = register(State(state.clone()), Json(bad_wallet)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let mut admin_grab = register_request("ada@example.com");
        admin_grab.role = Some("admin".into());
        let err = register(State(state), Json(admin_grab)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verifier_registration_is_allowed() {
        let (state, _dir) = AppState::for_tests();
        let mut request = register_request("gov@example.com");
        request.role = Some("verifier".into());
        let Json(response) = register(State(state), Json(request)).await.unwrap();
        assert_eq!(response.user.role, Role::Verifier);
    }
}
