// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Profile, dashboard, balance and redemption endpoints.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{collections, Redemption, UserProfile, WasteSubmission},
    rewards::{self, RewardItem},
    state::AppState,
    store::{Direction, Document, FieldValue, Op},
};

/// Dashboard summary for the authenticated user.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub profile: UserProfile,
    /// Most recent submissions, newest first.
    pub recent_submissions: Vec<WasteSubmission>,
    pub certificate_count: usize,
    pub unread_notifications: usize,
}

/// Token balance, preferring the on-chain value when available.
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    /// Balance according to the profile document.
    pub tokens_available: f64,
    /// On-chain balance; absent when no wallet is linked or the chain is
    /// unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_balance: Option<f64>,
    /// `chain` or `local`.
    pub source: String,
}

/// The redemption catalog.
#[derive(Debug, Serialize, ToSchema)]
pub struct RewardCatalogResponse {
    pub rewards: Vec<RewardItem>,
}

/// Request to redeem a catalog entry.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RedeemRequest {
    pub reward_id: String,
}

/// Result of a redemption.
#[derive(Debug, Serialize, ToSchema)]
pub struct RedeemResponse {
    pub redemption: Redemption,
    /// Balance after the debit.
    pub tokens_available: f64,
}

/// List of the caller's redemptions.
#[derive(Debug, Serialize, ToSchema)]
pub struct RedemptionListResponse {
    pub redemptions: Vec<Redemption>,
}

/// Get the caller's profile.
#[utoipa::path(
    get,
    path = "/api/user/profile",
    tag = "User",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn get_profile(Auth(caller): Auth) -> Json<UserProfile> {
    Json(caller.user.into())
}

/// Dashboard: profile, recent submissions, certificate count, unread
/// notifications.
#[utoipa::path(
    get,
    path = "/api/user/dashboard",
    tag = "User",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn get_dashboard(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let key = FieldValue::Str(caller.key().to_string());

    let submission_docs = state
        .store
        .collection(collections::SUBMISSIONS)
        .where_field("user_key", Op::Eq, key.clone())
        .order_by("created_at", Direction::Desc)
        .limit(10)
        .get()
        .await?;
    let recent_submissions = submission_docs
        .iter()
        .map(Document::deserialize)
        .collect::<Result<Vec<WasteSubmission>, _>>()?;

    let certificate_count = state
        .store
        .collection(collections::CERTIFICATES)
        .where_field("user_key", Op::Eq, key.clone())
        .get()
        .await?
        .len();

    let unread_notifications = state
        .store
        .collection(collections::NOTIFICATIONS)
        .where_field("user_key", Op::Eq, key)
        .where_field("read", Op::Eq, FieldValue::Bool(false))
        .get()
        .await?
        .len();

    Ok(Json(DashboardResponse {
        profile: caller.user.into(),
        recent_submissions,
        certificate_count,
        unread_notifications,
    }))
}

/// Token balance. Reads the chain when a wallet is linked; any chain
/// failure falls back to the profile balance.
#[utoipa::path(
    get,
    path = "/api/user/balance",
    tag = "User",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn get_balance(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Json<BalanceResponse> {
    let tokens_available = caller.user.tokens_available();

    let chain_balance = match (&state.chain, &caller.user.wallet_address) {
        (Some(chain), Some(wallet)) => match chain.token_balance(wallet).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(user_key = %caller.key(), error = %e, "chain balance read failed");
                None
            }
        },
        _ => None,
    };

    let source = if chain_balance.is_some() { "chain" } else { "local" };
    Json(BalanceResponse {
        tokens_available,
        chain_balance,
        source: source.to_string(),
    })
}

/// The redemption catalog.
#[utoipa::path(
    get,
    path = "/api/user/rewards",
    tag = "User",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Catalog", body = RewardCatalogResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_rewards(Auth(_caller): Auth) -> Json<RewardCatalogResponse> {
    Json(RewardCatalogResponse {
        rewards: rewards::catalog(),
    })
}

/// Redeem a catalog entry.
///
/// The balance check and debit run inside the store's native transaction,
/// so an overdraw can never slip through interleaved requests. On the
/// REST shim backend, which has no transaction primitive, redemption is
/// refused with 503.
#[utoipa::path(
    post,
    path = "/api/user/redeem",
    tag = "User",
    request_body = RedeemRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Redeemed", body = RedeemResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown reward"),
        (status = 422, description = "Insufficient balance"),
        (status = 503, description = "Backend does not support transactions"),
    )
)]
pub async fn redeem(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let item = rewards::catalog_item(&request.reward_id)
        .ok_or_else(|| ApiError::not_found("Unknown reward"))?;

    let redemption = Redemption {
        id: uuid::Uuid::new_v4().to_string(),
        user_key: caller.key().to_string(),
        reward_id: item.id.clone(),
        reward_title: item.title.clone(),
        cost_tokens: item.cost_tokens,
        created_at: Utc::now(),
    };

    let updated = state
        .store
        .debit_tokens(caller.key(), item.cost_tokens, &redemption)
        .await?;

    // Best-effort on-chain burn mirroring the debit.
    if let (Some(chain), Some(wallet)) = (&state.chain, &caller.user.wallet_address) {
        if let Err(e) = chain.burn_tokens(wallet, item.cost_tokens).await {
            warn!(user_key = %caller.key(), error = %e, "token burn failed; local debit stands");
        }
    }

    Ok(Json(RedeemResponse {
        redemption,
        tokens_available: updated.tokens_available(),
    }))
}

/// List the caller's redemption history, newest first.
#[utoipa::path(
    get,
    path = "/api/user/redemptions",
    tag = "User",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Redemptions", body = RedemptionListResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_redemptions(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<RedemptionListResponse>, ApiError> {
    let docs = state
        .store
        .collection(collections::REDEMPTIONS)
        .where_field("user_key", Op::Eq, FieldValue::Str(caller.key().to_string()))
        .order_by("created_at", Direction::Desc)
        .get()
        .await?;

    let redemptions = docs
        .iter()
        .map(Document::deserialize)
        .collect::<Result<Vec<Redemption>, _>>()?;

    Ok(Json(RedemptionListResponse { redemptions }))
}
