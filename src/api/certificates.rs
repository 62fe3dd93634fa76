// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Certificate endpoints (authenticated).

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::{Auth, Role},
    error::ApiError,
    models::{collections, Certificate},
    state::AppState,
    store::{Direction, Document, FieldValue, Op},
};

/// List of the caller's certificates.
#[derive(Debug, Serialize, ToSchema)]
pub struct CertificateListResponse {
    pub certificates: Vec<Certificate>,
}

/// List the caller's certificates, newest first.
#[utoipa::path(
    get,
    path = "/api/certificates",
    tag = "Certificates",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Certificates", body = CertificateListResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_my_certificates(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<CertificateListResponse>, ApiError> {
    let docs = state
        .store
        .collection(collections::CERTIFICATES)
        .where_field("user_key", Op::Eq, FieldValue::Str(caller.key().to_string()))
        .order_by("issued_at", Direction::Desc)
        .get()
        .await?;

    let certificates = docs
        .iter()
        .map(Document::deserialize)
        .collect::<Result<Vec<Certificate>, _>>()?;

    Ok(Json(CertificateListResponse { certificates }))
}

/// Fetch one certificate. Holder and admins only; the public
/// tamper-evidence check lives under `/api/verify`.
#[utoipa::path(
    get,
    path = "/api/certificates/{certificate_id}",
    tag = "Certificates",
    params(
        ("certificate_id" = String, Path, description = "Certificate ID")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Certificate", body = Certificate),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - not the holder"),
        (status = 404, description = "Certificate not found"),
    )
)]
pub async fn get_certificate(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<Json<Certificate>, ApiError> {
    let doc = state
        .store
        .collection(collections::CERTIFICATES)
        .doc(&certificate_id)
        .get()
        .await?
        .ok_or_else(|| ApiError::not_found("Certificate not found"))?;

    let certificate: Certificate = doc.deserialize()?;

    if certificate.user_key != caller.key() && !caller.has_role(Role::Admin) {
        return Err(ApiError::forbidden("You do not hold this certificate"));
    }

    Ok(Json(certificate))
}
