// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Verifier workflow: review queue, confirmation and rejection.
//!
//! Verification is the only place rewards are credited. The terminal
//! status transition happens exactly once per submission; a second review
//! attempt is rejected before any side effect.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    auth::VerifierOnly,
    error::ApiError,
    models::{
        collections, Certificate, Notification, NotificationKind, SubmissionStatus, User,
        WasteSubmission,
    },
    rewards,
    state::AppState,
    store::{Direction, Document, FieldValue, Op},
};

use super::notifications::push_notification;

/// A pending submission joined with its submitter's name.
#[derive(Debug, Serialize, ToSchema)]
pub struct PendingSubmission {
    #[serde(flatten)]
    pub submission: WasteSubmission,
    /// Display name of the submitting user.
    pub submitter_name: String,
}

/// The review queue.
#[derive(Debug, Serialize, ToSchema)]
pub struct PendingListResponse {
    pub submissions: Vec<PendingSubmission>,
    pub total: usize,
}

/// Request to confirm a submission.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Weight confirmed at the collection point, in kilograms.
    pub actual_weight_kg: f64,
}

/// Request to reject a submission.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RejectRequest {
    /// Optional reason shown to the submitter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome of a confirmation.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub submission: WasteSubmission,
    /// Certificates issued by this verification (one per threshold level
    /// crossed; usually empty).
    pub certificates_issued: Vec<Certificate>,
}

/// Fetch a submission that is still open for review.
async fn load_pending_submission(
    state: &AppState,
    submission_id: &str,
) -> Result<WasteSubmission, ApiError> {
    let doc = state
        .store
        .collection(collections::SUBMISSIONS)
        .doc(submission_id)
        .get()
        .await?
        .ok_or_else(|| ApiError::not_found("Submission not found"))?;

    let submission: WasteSubmission = doc.deserialize()?;
    if submission.status.is_terminal() {
        return Err(ApiError::unprocessable("Submission has already been reviewed"));
    }
    Ok(submission)
}

async fn load_user(state: &AppState, user_key: &str) -> Result<User, ApiError> {
    let doc = state
        .store
        .collection(collections::USERS)
        .doc(user_key)
        .get()
        .await?
        .ok_or_else(|| {
            tracing::error!(user_key, "submission references a missing user document");
            ApiError::internal("Internal server error")
        })?;
    Ok(doc.deserialize()?)
}

/// List pending submissions, oldest first.
///
/// Each entry carries the submitter's display name, fetched per
/// submission.
#[utoipa::path(
    get,
    path = "/api/verifier/pending",
    tag = "Verifier",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Review queue", body = PendingListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - verifier role required"),
    )
)]
pub async fn list_pending(
    VerifierOnly(_caller): VerifierOnly,
    State(state): State<AppState>,
) -> Result<Json<PendingListResponse>, ApiError> {
    let docs = state
        .store
        .collection(collections::SUBMISSIONS)
        .where_field("status", Op::Eq, FieldValue::Str("pending".into()))
        .order_by("created_at", Direction::Asc)
        .limit(100)
        .get()
        .await?;

    let mut submissions = Vec::with_capacity(docs.len());
    for doc in &docs {
        let submission: WasteSubmission = doc.deserialize()?;
        let submitter_name = match state
            .store
            .collection(collections::USERS)
            .doc(&submission.user_key)
            .get()
            .await?
        {
            Some(user_doc) => user_doc.deserialize::<User>()?.name,
            None => "Unknown".to_string(),
        };
        submissions.push(PendingSubmission {
            submission,
            submitter_name,
        });
    }

    let total = submissions.len();
    Ok(Json(PendingListResponse { submissions, total }))
}

/// Confirm a submission and credit the reward.
///
/// The reward amount comes from the configured rate table. When the chain
/// gateway is configured and the submitter has a wallet, the recycling
/// record and token mint are anchored on-chain; anchor failures are
/// logged and the local amount stands.
#[utoipa::path(
    post,
    path = "/api/verifier/{submission_id}/verify",
    tag = "Verifier",
    params(
        ("submission_id" = String, Path, description = "Submission ID")
    ),
    request_body = VerifyRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Submission verified", body = VerifyResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - verifier role required"),
        (status = 404, description = "Submission not found"),
        (status = 422, description = "Submission already reviewed"),
    )
)]
pub async fn verify_submission(
    VerifierOnly(caller): VerifierOnly,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    if !request.actual_weight_kg.is_finite() || request.actual_weight_kg <= 0.0 {
        return Err(ApiError::bad_request("actual_weight_kg must be positive"));
    }

    let mut submission = load_pending_submission(&state, &submission_id).await?;
    let owner = load_user(&state, &submission.user_key).await?;

    let reward = rewards::compute_reward(
        &state.config.reward_rates,
        submission.category,
        request.actual_weight_kg,
    );

    // Best-effort on-chain anchor: recycling record plus token mint.
    let mut reward_tx = None;
    if let (Some(chain), Some(wallet)) = (&state.chain, &owner.wallet_address) {
        let grams = (request.actual_weight_kg * 1000.0).round() as u64;
        match chain
            .record_recycling(wallet, submission.category.chain_index(), grams)
            .await
        {
            Ok(_) => match chain.mint_reward(wallet, reward).await {
                Ok(tx) => reward_tx = Some(tx),
                Err(e) => {
                    warn!(submission_id, error = %e, "reward mint failed; crediting locally")
                }
            },
            Err(e) => {
                warn!(submission_id, error = %e, "recycling record failed; crediting locally")
            }
        }
    }

    submission.status = SubmissionStatus::Verified;
    submission.verifier_key = Some(caller.key().to_string());
    submission.actual_weight_kg = Some(request.actual_weight_kg);
    submission.reward_tokens = Some(reward);
    submission.reward_tx = reward_tx;
    submission.reviewed_at = Some(Utc::now());

    let doc = Document::from_serializable(&submission.id, &submission)?;
    state
        .store
        .collection(collections::SUBMISSIONS)
        .doc(&submission.id)
        .update(doc.fields)
        .await?;

    // Merge the owner's cumulative totals.
    let before_total = owner.total_weight_kg;
    let after_total = before_total + request.actual_weight_kg;
    let mut totals = crate::store::Fields::new();
    totals.insert("total_weight_kg".into(), FieldValue::Double(after_total));
    totals.insert(
        "tokens_earned".into(),
        FieldValue::Double(owner.tokens_earned + reward),
    );
    state
        .store
        .collection(collections::USERS)
        .doc(&owner.key)
        .update(totals)
        .await?;

    let certificates_issued =
        issue_certificates(&state, &owner, before_total, after_total).await?;

    push_notification(
        &state,
        Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_key: owner.key.clone(),
            kind: NotificationKind::SubmissionVerified,
            title: "Submission verified".into(),
            body: format!(
                "Your {} submission was verified at {:.2} kg. {:.2} karma tokens credited.",
                submission.category, request.actual_weight_kg, reward
            ),
            read: false,
            certificate_id: None,
            certificate_hash: None,
            created_at: Utc::now(),
        },
    )
    .await?;

    Ok(Json(VerifyResponse {
        submission,
        certificates_issued,
    }))
}

/// Reject a submission.
#[utoipa::path(
    post,
    path = "/api/verifier/{submission_id}/reject",
    tag = "Verifier",
    params(
        ("submission_id" = String, Path, description = "Submission ID")
    ),
    request_body = RejectRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Submission rejected", body = WasteSubmission),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - verifier role required"),
        (status = 404, description = "Submission not found"),
        (status = 422, description = "Submission already reviewed"),
    )
)]
pub async fn reject_submission(
    VerifierOnly(caller): VerifierOnly,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<WasteSubmission>, ApiError> {
    let mut submission = load_pending_submission(&state, &submission_id).await?;

    submission.status = SubmissionStatus::Rejected;
    submission.verifier_key = Some(caller.key().to_string());
    submission.rejection_reason = request.reason.clone();
    submission.reviewed_at = Some(Utc::now());

    let doc = Document::from_serializable(&submission.id, &submission)?;
    state
        .store
        .collection(collections::SUBMISSIONS)
        .doc(&submission.id)
        .update(doc.fields)
        .await?;

    let reason = request
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "No reason given".to_string());
    push_notification(
        &state,
        Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_key: submission.user_key.clone(),
            kind: NotificationKind::SubmissionRejected,
            title: "Submission rejected".into(),
            body: format!("Your {} submission was rejected: {reason}", submission.category),
            read: false,
            certificate_id: None,
            certificate_hash: None,
            created_at: Utc::now(),
        },
    )
    .await?;

    Ok(Json(submission))
}

/// Issue one certificate per threshold level crossed by this
/// verification, each with a tamper-evident content hash and an optional
/// on-chain anchor, plus a notification per certificate.
async fn issue_certificates(
    state: &AppState,
    owner: &User,
    before_total: f64,
    after_total: f64,
) -> Result<Vec<Certificate>, ApiError> {
    let threshold = state.config.cert_threshold_kg;
    let mut issued = Vec::new();

    for level in rewards::certificate_levels_crossed(threshold, before_total, after_total) {
        let issued_at = Utc::now();
        let content_hash =
            rewards::certificate_content_hash(&owner.key, level, threshold, after_total, &issued_at);

        let mut chain_tx = None;
        if let (Some(chain), Some(wallet)) = (&state.chain, &owner.wallet_address) {
            let hash_bytes = rewards::certificate_hash_bytes(
                &owner.key, level, threshold, after_total, &issued_at,
            );
            match chain.mint_certificate(wallet, hash_bytes).await {
                Ok(tx) => chain_tx = Some(tx),
                Err(e) => {
                    warn!(user_key = %owner.key, level, error = %e, "certificate anchor failed")
                }
            }
        }

        let certificate = Certificate {
            id: uuid::Uuid::new_v4().to_string(),
            user_key: owner.key.clone(),
            level,
            threshold_kg: threshold,
            total_weight_kg: after_total,
            content_hash,
            chain_tx,
            issued_at,
        };

        let doc = Document::from_serializable(&certificate.id, &certificate)?;
        state
            .store
            .collection(collections::CERTIFICATES)
            .doc(&certificate.id)
            .set(doc.fields)
            .await?;

        push_notification(
            state,
            Notification {
                id: uuid::Uuid::new_v4().to_string(),
                user_key: owner.key.clone(),
                kind: NotificationKind::Certificate,
                title: format!("Level {level} certificate earned"),
                body: format!(
                    "You crossed {:.0} kg of verified recycling. Certificate issued.",
                    level as f64 * threshold
                ),
                read: false,
                certificate_id: Some(certificate.id.clone()),
                certificate_hash: Some(certificate.content_hash.clone()),
                created_at: Utc::now(),
            },
        )
        .await?;

        issued.push(certificate);
    }

    Ok(issued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    use crate::auth::{AuthenticatedUser, Role};
    use crate::models::WasteCategory;

    fn test_user(key: &str, role: Role) -> User {
        User {
            key: key.into(),
            name: format!("Name of {key}"),
            email: format!("{key}@example.com"),
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

    async fn seed_user(state: &AppState, user: &User) {
        state
            .store
            .collection(collections::USERS)
            .doc(&user.key)
            .set(Document::from_serializable(&user.key, user).unwrap().fields)
            .await
            .unwrap();
    }

    async fn seed_submission(state: &AppState, id: &str, user_key: &str, category: WasteCategory) {
        let submission = WasteSubmission {
            id: id.into(),
            user_key: user_key.into(),
            category,
            declared_weight_kg: 2.0,
            image_ref: None,
            status: SubmissionStatus::Pending,
            verifier_key: None,
            actual_weight_kg: None,
            reward_tokens: None,
            reward_tx: None,
            rejection_reason: None,
            created_at: Utc::now(),
            reviewed_at: None,
        };
        state
            .store
            .collection(collections::SUBMISSIONS)
            .doc(id)
            .set(Document::from_serializable(id, &submission).unwrap().fields)
            .await
            .unwrap();
    }

    fn verifier() -> VerifierOnly {
        VerifierOnly(AuthenticatedUser {
            user: test_user("gov", Role::Verifier),
        })
    }

    async fn stored_user(state: &AppState, key: &str) -> User {
        state
            .store
            .collection(collections::USERS)
            .doc(key)
            .get()
            .await
            .unwrap()
            .unwrap()
            .deserialize()
            .unwrap()
    }

    #[tokio::test]
    async fn verify_credits_reward_and_updates_totals() {
        let (state, _dir) = AppState::for_tests();
        seed_user(&state, &test_user("alice", Role::User)).await;
        seed_submission(&state, "s1", "alice", WasteCategory::Metal).await;

        let Json(response) = verify_submission(
            verifier(),
            State(state.clone()),
            Path("s1".into()),
            Json(VerifyRequest {
                actual_weight_kg: 2.0,
            }),
        )
        .await
        .unwrap();

        // Default metal rate is 15 tokens/kg.
        assert_eq!(response.submission.status, SubmissionStatus::Verified);
        assert_eq!(response.submission.reward_tokens, Some(30.0));
        assert_eq!(response.submission.verifier_key.as_deref(), Some("gov"));
        assert!(response.certificates_issued.is_empty());

        let alice = stored_user(&state, "alice").await;
        assert_eq!(alice.total_weight_kg, 2.0);
        assert_eq!(alice.tokens_earned, 30.0);
    }

    #[tokio::test]
    async fn verify_is_exactly_once() {
        let (state, _dir) = AppState::for_tests();
        seed_user(&state, &test_user("alice", Role::User)).await;
        seed_submission(&state, "s1", "alice", WasteCategory::Paper).await;

        verify_submission(
            verifier(),
            State(state.clone()),
            Path("s1".into()),
            Json(VerifyRequest {
                actual_weight_kg: 1.0,
            }),
        )
        .await
        .unwrap();

        let err = verify_submission(
            verifier(),
            State(state.clone()),
            Path("s1".into()),
            Json(VerifyRequest {
                actual_weight_kg: 1.0,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        // Totals were credited exactly once.
        let alice = stored_user(&state, "alice").await;
        assert_eq!(alice.total_weight_kg, 1.0);
    }

    #[tokio::test]
    async fn reject_then_verify_is_refused() {
        let (state, _dir) = AppState::for_tests();
        seed_user(&state, &test_user("alice", Role::User)).await;
        seed_submission(&state, "s1", "alice", WasteCategory::Glass).await;

        reject_submission(
            verifier(),
            State(state.clone()),
            Path("s1".into()),
            Json(RejectRequest {
                reason: Some("contaminated".into()),
            }),
        )
        .await
        .unwrap();

        let err = verify_submission(
            verifier(),
            State(state.clone()),
            Path("s1".into()),
            Json(VerifyRequest {
                actual_weight_kg: 1.0,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let alice = stored_user(&state, "alice").await;
        assert_eq!(alice.tokens_earned, 0.0);
    }

    #[tokio::test]
    async fn verify_validates_actual_weight() {
        let (state, _dir) = AppState::for_tests();
        seed_user(&state, &test_user("alice", Role::User)).await;
        seed_submission(&state, "s1", "alice", WasteCategory::Paper).await;

        for bad in [0.0, -2.0, f64::NAN] {
            let err = verify_submission(
                verifier(),
                State(state.clone()),
                Path("s1".into()),
                Json(VerifyRequest {
                    actual_weight_kg: bad,
                }),
            )
            .await
            .unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn crossing_the_threshold_issues_a_hashed_certificate() {
        let (state, _dir) = AppState::for_tests();
        let mut alice = test_user("alice", Role::User);
        alice.total_weight_kg = 48.0; // 2 kg below the 50 kg threshold
        seed_user(&state, &alice).await;
        seed_submission(&state, "s1", "alice", WasteCategory::Plastic).await;

        let Json(response) = verify_submission(
            verifier(),
            State(state.clone()),
            Path("s1".into()),
            Json(VerifyRequest {
                actual_weight_kg: 5.0,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.certificates_issued.len(), 1);
        let cert = &response.certificates_issued[0];
        assert_eq!(cert.level, 1);
        assert!(rewards::verify_certificate_hash(cert));

        // Certificate notification embeds the reference and hash.
        let notes = state
            .store
            .collection(collections::NOTIFICATIONS)
            .where_field("user_key", Op::Eq, FieldValue::Str("alice".into()))
            .get()
            .await
            .unwrap();
        let cert_note = notes
            .iter()
            .map(|d| d.deserialize::<Notification>().unwrap())
            .find(|n| n.kind == NotificationKind::Certificate)
            .expect("certificate notification");
        assert_eq!(cert_note.certificate_id.as_deref(), Some(cert.id.as_str()));
        assert_eq!(
            cert_note.certificate_hash.as_deref(),
            Some(cert.content_hash.as_str())
        );
    }

    #[tokio::test]
    async fn a_large_verification_issues_one_certificate_per_level() {
        let (state, _dir) = AppState::for_tests();
        seed_user(&state, &test_user("alice", Role::User)).await;
        seed_submission(&state, "s1", "alice", WasteCategory::Metal).await;

        let Json(response) = verify_submission(
            verifier(),
            State(state.clone()),
            Path("s1".into()),
            Json(VerifyRequest {
                actual_weight_kg: 120.0,
            }),
        )
        .await
        .unwrap();

        let levels: Vec<i64> = response
            .certificates_issued
            .iter()
            .map(|c| c.level)
            .collect();
        assert_eq!(levels, vec![1, 2]);
    }

    #[tokio::test]
    async fn pending_list_joins_submitter_names_oldest_first() {
        let (state, _dir) = AppState::for_tests();
        seed_user(&state, &test_user("alice", Role::User)).await;
        seed_submission(&state, "s1", "alice", WasteCategory::Paper).await;
        seed_submission(&state, "s2", "ghost-user", WasteCategory::Glass).await;

        let Json(response) = list_pending(verifier(), State(state)).await.unwrap();
        assert_eq!(response.total, 2);

        let by_id: std::collections::HashMap<_, _> = response
            .submissions
            .iter()
            .map(|p| (p.submission.id.as_str(), p.submitter_name.as_str()))
            .collect();
        assert_eq!(by_id["s1"], "Name of alice");
        assert_eq!(by_id["s2"], "Unknown");
    }

    #[tokio::test]
    async fn missing_submission_is_404() {
        let (state, _dir) = AppState::for_tests();
        let err = verify_submission(
            verifier(),
            State(state),
            Path("ghost".into()),
            Json(VerifyRequest {
                actual_weight_kg: 1.0,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
