// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Waste submission endpoints.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::{Auth, Role},
    error::ApiError,
    models::{collections, SubmissionStatus, WasteCategory, WasteSubmission},
    state::AppState,
    store::{Direction, Document, FieldValue, Op},
};

/// Upper bound on a single declared weight.
const MAX_WEIGHT_KG: f64 = 1000.0;

/// List of the caller's submissions.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionListResponse {
    pub submissions: Vec<WasteSubmission>,
    pub total: usize,
}

fn parse_weight(raw: &str) -> Result<f64, ApiError> {
    let weight: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("weight_kg must be a number"))?;
    if !weight.is_finite() || weight <= 0.0 {
        return Err(ApiError::bad_request("weight_kg must be positive"));
    }
    if weight > MAX_WEIGHT_KG {
        return Err(ApiError::bad_request(format!(
            "weight_kg must not exceed {MAX_WEIGHT_KG}"
        )));
    }
    Ok(weight)
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some("image/jpeg") => "jpg",
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        _ => "bin",
    }
}

/// Persist an uploaded image; returns the stored filename.
fn save_image(state: &AppState, bytes: &[u8], content_type: Option<&str>) -> Result<String, ApiError> {
    let filename = format!("{}.{}", uuid::Uuid::new_v4(), extension_for(content_type));
    let dir = &state.config.uploads_dir;
    std::fs::create_dir_all(dir).map_err(|e| {
        tracing::error!(error = %e, "failed to create uploads directory");
        ApiError::internal("Internal server error")
    })?;
    std::fs::write(dir.join(&filename), bytes).map_err(|e| {
        tracing::error!(error = %e, "failed to store submission image");
        ApiError::internal("Internal server error")
    })?;
    Ok(filename)
}

/// Submit waste for verification.
///
/// Multipart form: `category` (one of the five categories), `weight_kg`,
/// and an optional `image` part.
#[utoipa::path(
    post,
    path = "/api/waste",
    tag = "Waste",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Submission created", body = WasteSubmission),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn submit_waste(
    Auth(caller): Auth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<WasteSubmission>, ApiError> {
    let mut category: Option<WasteCategory> = None;
    let mut weight_kg: Option<f64> = None;
    let mut image_ref: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("category") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid category field: {e}")))?;
                category = Some(
                    WasteCategory::parse(&raw)
                        .ok_or_else(|| ApiError::bad_request("unknown waste category"))?,
                );
            }
            Some("weight_kg") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid weight field: {e}")))?;
                weight_kg = Some(parse_weight(&raw)?);
            }
            Some("image") => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid image upload: {e}")))?;
                if !bytes.is_empty() {
                    image_ref = Some(save_image(&state, &bytes, content_type.as_deref())?);
                }
            }
            _ => {} // unknown parts are ignored
        }
    }

    let category = category.ok_or_else(|| ApiError::bad_request("category is required"))?;
    let weight_kg = weight_kg.ok_or_else(|| ApiError::bad_request("weight_kg is required"))?;

    let submission = WasteSubmission {
        id: uuid::Uuid::new_v4().to_string(),
        user_key: caller.key().to_string(),
        category,
        declared_weight_kg: weight_kg,
        image_ref,
        status: SubmissionStatus::Pending,
        verifier_key: None,
        actual_weight_kg: None,
        reward_tokens: None,
        reward_tx: None,
        rejection_reason: None,
        created_at: Utc::now(),
        reviewed_at: None,
    };

    let doc = Document::from_serializable(&submission.id, &submission)?;
    state
        .store
        .collection(collections::SUBMISSIONS)
        .doc(&submission.id)
        .set(doc.fields)
        .await?;

    Ok(Json(submission))
}

/// List the caller's own submissions, newest first.
#[utoipa::path(
    get,
    path = "/api/waste",
    tag = "Waste",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Submissions", body = SubmissionListResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_my_submissions(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<SubmissionListResponse>, ApiError> {
    let docs = state
        .store
        .collection(collections::SUBMISSIONS)
        .where_field("user_key", Op::Eq, FieldValue::Str(caller.key().to_string()))
        .order_by("created_at", Direction::Desc)
        .limit(100)
        .get()
        .await?;

    let submissions = docs
        .iter()
        .map(Document::deserialize)
        .collect::<Result<Vec<WasteSubmission>, _>>()?;

    let total = submissions.len();
    Ok(Json(SubmissionListResponse { submissions, total }))
}

/// Fetch one submission. Owners and verifiers only.
#[utoipa::path(
    get,
    path = "/api/waste/{submission_id}",
    tag = "Waste",
    params(
        ("submission_id" = String, Path, description = "Submission ID")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Submission", body = WasteSubmission),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - not the owner"),
        (status = 404, description = "Submission not found"),
    )
)]
pub async fn get_submission(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> Result<Json<WasteSubmission>, ApiError> {
    let doc = state
        .store
        .collection(collections::SUBMISSIONS)
        .doc(&submission_id)
        .get()
        .await?
        .ok_or_else(|| ApiError::not_found("Submission not found"))?;

    let submission: WasteSubmission = doc.deserialize()?;

    if submission.user_key != caller.key() && !caller.has_role(Role::Verifier) {
        return Err(ApiError::forbidden("You do not own this submission"));
    }

    Ok(Json(submission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;

    use crate::auth::AuthenticatedUser;
    use crate::models::User;

    fn test_user(key: &str, role: Role) -> User {
        User {
            key: key.into(),
            name: "Ada".into(),
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

    fn pending_submission(id: &str, user_key: &str) -> WasteSubmission {
        WasteSubmission {
            id: id.into(),
            user_key: user_key.into(),
            category: WasteCategory::Plastic,
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
        }
    }

    async fn seed_submission(state: &AppState, submission: &WasteSubmission) {
        state
            .store
            .collection(collections::SUBMISSIONS)
            .doc(&submission.id)
            .set(
                Document::from_serializable(&submission.id, submission)
                    .unwrap()
                    .fields,
            )
            .await
            .unwrap();
    }

    #[test]
    fn weight_parsing_enforces_bounds() {
        assert!(parse_weight("2.5").is_ok());
        assert_eq!(parse_weight("0").unwrap_err().status, StatusCode::BAD_REQUEST);
        assert_eq!(parse_weight("-3").unwrap_err().status, StatusCode::BAD_REQUEST);
        assert_eq!(parse_weight("NaN").unwrap_err().status, StatusCode::BAD_REQUEST);
        assert_eq!(parse_weight("1001").unwrap_err().status, StatusCode::BAD_REQUEST);
        assert_eq!(parse_weight("soon").unwrap_err().status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn image_extension_follows_content_type() {
        assert_eq!(extension_for(Some("image/jpeg")), "jpg");
        assert_eq!(extension_for(Some("image/png")), "png");
        assert_eq!(extension_for(Some("application/zip")), "bin");
        assert_eq!(extension_for(None), "bin");
    }

    #[tokio::test]
    async fn list_returns_only_the_callers_submissions_newest_first() {
        let (state, _dir) = AppState::for_tests();
        let mut early = pending_submission("s-early", "alice");
        early.created_at = Utc::now() - chrono::Duration::hours(2);
        seed_submission(&state, &early).await;
        seed_submission(&state, &pending_submission("s-late", "alice")).await;
        seed_submission(&state, &pending_submission("s-other", "bob")).await;

        let caller = AuthenticatedUser {
            user: test_user("alice", Role::User),
        };
        let Json(response) = list_my_submissions(Auth(caller), State(state)).await.unwrap();
        assert_eq!(response.total, 2);
        assert_eq!(response.submissions[0].id, "s-late");
        assert_eq!(response.submissions[1].id, "s-early");
    }

    #[tokio::test]
    async fn get_submission_enforces_ownership() {
        let (state, _dir) = AppState::for_tests();
        seed_submission(&state, &pending_submission("s1", "alice")).await;

        // Owner sees it.
        let owner = AuthenticatedUser {
            user: test_user("alice", Role::User),
        };
        let result = get_submission(Auth(owner), State(state.clone()), Path("s1".into())).await;
        assert!(result.is_ok());

        // A stranger does not.
        let stranger = AuthenticatedUser {
            user: test_user("mallory", Role::User),
        };
        let err = get_submission(Auth(stranger), State(state.clone()), Path("s1".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        // A verifier does.
        let verifier = AuthenticatedUser {
            user: test_user("gov", Role::Verifier),
        };
        let result = get_submission(Auth(verifier), State(state), Path("s1".into())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn get_missing_submission_is_404() {
        let (state, _dir) = AppState::for_tests();
        let caller = AuthenticatedUser {
            user: test_user("alice", Role::User),
        };
        let err = get_submission(Auth(caller), State(state), Path("ghost".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
