// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Public certificate verification.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    models::{collections, Certificate, User},
    rewards,
    state::AppState,
};

/// Outcome of a public verification check.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationResponse {
    /// Whether the stored content hash matches a recomputation. `false`
    /// means the record was altered after issuance.
    pub valid: bool,
    pub certificate_id: String,
    /// Holder display name, when the account still exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    pub level: i64,
    pub threshold_kg: f64,
    pub total_weight_kg: f64,
    pub content_hash: String,
    /// On-chain anchor transaction, when the certificate was anchored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_tx: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// Verify a certificate by ID. No authentication: this is the endpoint
/// behind printed QR codes.
#[utoipa::path(
    get,
    path = "/api/verify/{certificate_id}",
    tag = "Verify",
    params(
        ("certificate_id" = String, Path, description = "Certificate ID")
    ),
    responses(
        (status = 200, description = "Verification result", body = VerificationResponse),
        (status = 404, description = "Certificate not found"),
    )
)]
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let doc = state
        .store
        .collection(collections::CERTIFICATES)
        .doc(&certificate_id)
        .get()
        .await?
        .ok_or_else(|| ApiError::not_found("Certificate not found"))?;

    let certificate: Certificate = doc.deserialize()?;
    let valid = rewards::verify_certificate_hash(&certificate);

    let holder_name = match state
        .store
        .collection(collections::USERS)
        .doc(&certificate.user_key)
        .get()
        .await?
    {
        Some(user_doc) => Some(user_doc.deserialize::<User>()?.name),
        None => None,
    };

    Ok(Json(VerificationResponse {
        valid,
        certificate_id: certificate.id,
        holder_name,
        level: certificate.level,
        threshold_kg: certificate.threshold_kg,
        total_weight_kg: certificate.total_weight_kg,
        content_hash: certificate.content_hash,
        chain_tx: certificate.chain_tx,
        issued_at: certificate.issued_at,
    }))
}
