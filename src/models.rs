// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! # Domain Models
//!
//! Documents persisted in the store and the shared API shapes derived from
//! them. All persisted types keep to scalar fields only; the document
//! store's wire codec rejects nested values.
//!
//! ## Model Categories
//!
//! - **Users**: account records keyed by the email-derived UUID
//! - **Submissions**: waste declared by users, reviewed by verifiers
//! - **Certificates**: threshold achievements with a tamper-evident hash
//! - **Notifications**: per-user messages (read/unread)
//! - **Redemptions**: token spends against the reward catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;

// =============================================================================
// Collections
// =============================================================================

/// Collection names, shared by both store backends.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SUBMISSIONS: &str = "submissions";
    pub const CERTIFICATES: &str = "certificates";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const REDEMPTIONS: &str = "redemptions";
}

// =============================================================================
// Users
// =============================================================================

/// A registered account.
///
/// The document ID is the UUIDv5 of the canonicalized email, so the same
/// email can never register twice regardless of request interleaving.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Email-derived document key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Canonicalized email address.
    pub email: String,
    /// Optional EVM wallet address for on-chain rewards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Account role.
    pub role: Role,
    /// Cumulative verified weight in kilograms. Never decreases.
    pub total_weight_kg: f64,
    /// Cumulative tokens credited by verifications. Never decreases.
    pub tokens_earned: f64,
    /// Cumulative tokens spent on redemptions. Grows only via the
    /// transactional debit.
    pub tokens_spent: f64,
    /// Salt for the password hash.
    pub password_salt: String,
    /// HMAC-SHA256 password hash (base64).
    pub password_hash: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Tokens currently available for redemption.
    pub fn tokens_available(&self) -> f64 {
        self.tokens_earned - self.tokens_spent
    }
}

/// Public profile shape. Never includes credential material.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub key: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    pub role: Role,
    pub total_weight_kg: f64,
    pub tokens_earned: f64,
    pub tokens_spent: f64,
    pub tokens_available: f64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let tokens_available = user.tokens_available();
        Self {
            key: user.key,
            name: user.name,
            email: user.email,
            wallet_address: user.wallet_address,
            role: user.role,
            total_weight_kg: user.total_weight_kg,
            tokens_earned: user.tokens_earned,
            tokens_spent: user.tokens_spent,
            tokens_available,
            created_at: user.created_at,
        }
    }
}

// =============================================================================
// Waste Submissions
// =============================================================================

/// The five accepted waste categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WasteCategory {
    Plastic,
    Paper,
    Glass,
    Metal,
    Electronic,
}

impl WasteCategory {
    /// Parse from the lowercase API representation.
    pub fn parse(s: &str) -> Option<WasteCategory> {
        match s.to_lowercase().as_str() {
            "plastic" => Some(WasteCategory::Plastic),
            "paper" => Some(WasteCategory::Paper),
            "glass" => Some(WasteCategory::Glass),
            "metal" => Some(WasteCategory::Metal),
            "electronic" => Some(WasteCategory::Electronic),
            _ => None,
        }
    }

    /// Stable index used by the on-chain recycling ledger.
    pub fn chain_index(&self) -> u8 {
        match self {
            WasteCategory::Plastic => 0,
            WasteCategory::Paper => 1,
            WasteCategory::Glass => 2,
            WasteCategory::Metal => 3,
            WasteCategory::Electronic => 4,
        }
    }
}

impl std::fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WasteCategory::Plastic => write!(f, "plastic"),
            WasteCategory::Paper => write!(f, "paper"),
            WasteCategory::Glass => write!(f, "glass"),
            WasteCategory::Metal => write!(f, "metal"),
            WasteCategory::Electronic => write!(f, "electronic"),
        }
    }
}

/// Submission lifecycle. `Pending` transitions to exactly one terminal
/// status, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Verified,
    Rejected,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

/// A waste submission awaiting or past verifier review.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WasteSubmission {
    /// Document ID.
    pub id: String,
    /// Owning user key.
    pub user_key: String,
    pub category: WasteCategory,
    /// Weight declared by the submitter, in kilograms.
    pub declared_weight_kg: f64,
    /// Stored filename of the uploaded photo, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub status: SubmissionStatus,
    /// Reviewing verifier's user key, set on the terminal transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_key: Option<String>,
    /// Weight confirmed by the verifier, in kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_weight_kg: Option<f64>,
    /// Tokens credited for this submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_tokens: Option<f64>,
    /// On-chain reward transaction hash, when anchoring succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Certificates
// =============================================================================

/// An achievement certificate issued when cumulative verified weight
/// crosses a threshold multiple. Immutable once written; `content_hash`
/// makes tampering detectable.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Certificate {
    /// Document ID.
    pub id: String,
    /// Owning user key.
    pub user_key: String,
    /// Ordinal of the threshold crossed (1 = first threshold).
    pub level: i64,
    /// Threshold in effect at issuance, in kilograms.
    pub threshold_kg: f64,
    /// Cumulative verified weight at issuance, in kilograms.
    pub total_weight_kg: f64,
    /// Base64 SHA-256 over the canonical certificate payload.
    pub content_hash: String,
    /// On-chain mint transaction hash, when anchoring succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_tx: Option<String>,
    pub issued_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SubmissionVerified,
    SubmissionRejected,
    Certificate,
}

/// A per-user message record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    /// Document ID.
    pub id: String,
    /// Recipient user key.
    pub user_key: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub read: bool,
    /// Certificate reference, present on certificate notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    /// Certificate content hash, carried so the notification is
    /// self-contained for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Redemptions
// =============================================================================

/// A token spend against the reward catalog. Created atomically with the
/// balance debit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Redemption {
    /// Document ID.
    pub id: String,
    /// Spending user key.
    pub user_key: String,
    /// Catalog item ID.
    pub reward_id: String,
    /// Catalog item title at redemption time.
    pub reward_title: String,
    /// Tokens debited.
    pub cost_tokens: f64,
    pub created_at: DateTime<Utc>,
}
