// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::Role,
    models::{
        Certificate, Notification, NotificationKind, Redemption, SubmissionStatus, UserProfile,
        WasteCategory, WasteSubmission,
    },
    rewards::RewardItem,
    state::AppState,
};

pub mod auth;
pub mod certificates;
pub mod health;
pub mod notifications;
pub mod user;
pub mod verifier;
pub mod verify;
pub mod waste;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route(
            "/waste",
            post(waste::submit_waste).get(waste::list_my_submissions),
        )
        .route("/waste/{submission_id}", get(waste::get_submission))
        .route("/verifier/pending", get(verifier::list_pending))
        .route(
            "/verifier/{submission_id}/verify",
            post(verifier::verify_submission),
        )
        .route(
            "/verifier/{submission_id}/reject",
            post(verifier::reject_submission),
        )
        .route("/user/profile", get(user::get_profile))
        .route("/user/dashboard", get(user::get_dashboard))
        .route("/user/balance", get(user::get_balance))
        .route("/user/rewards", get(user::list_rewards))
        .route("/user/redeem", post(user::redeem))
        .route("/user/redemptions", get(user::list_redemptions))
        .route("/certificates", get(certificates::list_my_certificates))
        .route(
            "/certificates/{certificate_id}",
            get(certificates::get_certificate),
        )
        .route("/verify/{certificate_id}", get(verify::verify_certificate))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route(
            "/notifications/{notification_id}/read",
            post(notifications::mark_read),
        )
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        waste::submit_waste,
        waste::list_my_submissions,
        waste::get_submission,
        verifier::list_pending,
        verifier::verify_submission,
        verifier::reject_submission,
        user::get_profile,
        user::get_dashboard,
        user::get_balance,
        user::list_rewards,
        user::redeem,
        user::list_redemptions,
        certificates::list_my_certificates,
        certificates::get_certificate,
        verify::verify_certificate,
        notifications::list_notifications,
        notifications::mark_read,
        notifications::mark_all_read,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Role,
            UserProfile,
            WasteCategory,
            SubmissionStatus,
            WasteSubmission,
            Certificate,
            Notification,
            NotificationKind,
            Redemption,
            RewardItem,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            waste::SubmissionListResponse,
            verifier::PendingSubmission,
            verifier::PendingListResponse,
            verifier::VerifyRequest,
            verifier::RejectRequest,
            verifier::VerifyResponse,
            user::DashboardResponse,
            user::BalanceResponse,
            user::RewardCatalogResponse,
            user::RedeemRequest,
            user::RedeemResponse,
            user::RedemptionListResponse,
            certificates::CertificateListResponse,
            verify::VerificationResponse,
            notifications::NotificationListResponse,
            notifications::MarkAllReadResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Waste", description = "Waste submission"),
        (name = "Verifier", description = "Verifier review workflow"),
        (name = "User", description = "Profile, dashboard and redemption"),
        (name = "Certificates", description = "Achievement certificates"),
        (name = "Verify", description = "Public certificate verification"),
        (name = "Notifications", description = "Per-user notifications"),
        (name = "Health", description = "Liveness and readiness")
    )
)]
struct ApiDoc;
