// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Notification endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{collections, Notification},
    state::AppState,
    store::{Direction, Document, FieldValue, Fields, Op},
};

/// List of the caller's notifications.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread: usize,
}

/// Result of a bulk mark-read.
#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    /// Number of notifications flipped to read.
    pub updated: usize,
}

/// Store a notification document. Used by the verifier workflow.
pub(crate) async fn push_notification(
    state: &AppState,
    notification: Notification,
) -> Result<(), ApiError> {
    let doc = Document::from_serializable(&notification.id, &notification)?;
    state
        .store
        .collection(collections::NOTIFICATIONS)
        .doc(&notification.id)
        .set(doc.fields)
        .await?;
    Ok(())
}

/// List the caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Notifications", body = NotificationListResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_notifications(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let docs = state
        .store
        .collection(collections::NOTIFICATIONS)
        .where_field("user_key", Op::Eq, FieldValue::Str(caller.key().to_string()))
        .order_by("created_at", Direction::Desc)
        .limit(50)
        .get()
        .await?;

    let notifications = docs
        .iter()
        .map(Document::deserialize)
        .collect::<Result<Vec<Notification>, _>>()?;

    let unread = notifications.iter().filter(|n| !n.read).count();
    Ok(Json(NotificationListResponse {
        notifications,
        unread,
    }))
}

/// Mark one notification read.
#[utoipa::path(
    post,
    path = "/api/notifications/{notification_id}/read",
    tag = "Notifications",
    params(
        ("notification_id" = String, Path, description = "Notification ID")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Notification updated", body = Notification),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - not the recipient"),
        (status = 404, description = "Notification not found"),
    )
)]
pub async fn mark_read(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let doc = state
        .store
        .collection(collections::NOTIFICATIONS)
        .doc(&notification_id)
        .get()
        .await?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    let mut notification: Notification = doc.deserialize()?;
    if notification.user_key != caller.key() {
        return Err(ApiError::forbidden("You are not the recipient"));
    }

    let mut fields = Fields::new();
    fields.insert("read".into(), FieldValue::Bool(true));
    state
        .store
        .collection(collections::NOTIFICATIONS)
        .doc(&notification_id)
        .update(fields)
        .await?;

    notification.read = true;
    Ok(Json(notification))
}

/// Mark all of the caller's notifications read.
///
/// One update per unread document; the loop is not atomic, matching the
/// rest of the store surface.
#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Notifications updated", body = MarkAllReadResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn mark_all_read(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let docs = state
        .store
        .collection(collections::NOTIFICATIONS)
        .where_field("user_key", Op::Eq, FieldValue::Str(caller.key().to_string()))
        .where_field("read", Op::Eq, FieldValue::Bool(false))
        .get()
        .await?;

    let mut read_flag = Fields::new();
    read_flag.insert("read".into(), FieldValue::Bool(true));

    let mut updated = 0;
    for doc in &docs {
        state
            .store
            .collection(collections::NOTIFICATIONS)
            .doc(&doc.id)
            .update(read_flag.clone())
            .await?;
        updated += 1;
    }

    Ok(Json(MarkAllReadResponse { updated }))
}
