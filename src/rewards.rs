// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Reward computation, the redemption catalog and certificate issuance
//! rules.
//!
//! Reward amounts always come from the configured per-category rate
//! table. When the chain gateway is available the same amount is minted
//! on-chain; when it is not, or the mint fails, the locally computed
//! amount stands on its own.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::config::RewardRates;
use crate::models::{Certificate, WasteCategory};

// =============================================================================
// Reward rates
// =============================================================================

/// Tokens per kilogram for a category.
pub fn rate_for(rates: &RewardRates, category: WasteCategory) -> f64 {
    match category {
        WasteCategory::Plastic => rates.plastic,
        WasteCategory::Paper => rates.paper,
        WasteCategory::Glass => rates.glass,
        WasteCategory::Metal => rates.metal,
        WasteCategory::Electronic => rates.electronic,
    }
}

/// Flat-rate reward for a verified weight, rounded to two decimals.
pub fn compute_reward(rates: &RewardRates, category: WasteCategory, weight_kg: f64) -> f64 {
    (rate_for(rates, category) * weight_kg * 100.0).round() / 100.0
}

// =============================================================================
// Redemption catalog
// =============================================================================

/// An entry users can spend tokens on.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RewardItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub cost_tokens: f64,
}

/// The fixed redemption catalog.
pub fn catalog() -> Vec<RewardItem> {
    vec![
        RewardItem {
            id: "tree-sapling".into(),
            title: "Tree sapling".into(),
            description: "A sapling planted in your name by a local partner.".into(),
            cost_tokens: 50.0,
        },
        RewardItem {
            id: "transit-pass".into(),
            title: "Public transit day pass".into(),
            description: "One day of unlimited local public transit.".into(),
            cost_tokens: 120.0,
        },
        RewardItem {
            id: "compost-kit".into(),
            title: "Home compost kit".into(),
            description: "Starter kit for home composting.".into(),
            cost_tokens: 300.0,
        },
        RewardItem {
            id: "reusable-bottle".into(),
            title: "Reusable bottle".into(),
            description: "Insulated steel bottle.".into(),
            cost_tokens: 80.0,
        },
    ]
}

pub fn catalog_item(reward_id: &str) -> Option<RewardItem> {
    catalog().into_iter().find(|item| item.id == reward_id)
}

// =============================================================================
// Certificates
// =============================================================================

/// Threshold levels newly crossed when cumulative weight moves from
/// `before` to `after`: every `k` with `before < k*threshold <= after`.
pub fn certificate_levels_crossed(threshold_kg: f64, before_kg: f64, after_kg: f64) -> Vec<i64> {
    if threshold_kg <= 0.0 || after_kg <= before_kg {
        return Vec::new();
    }
    let first = (before_kg / threshold_kg).floor() as i64 + 1;
    let last = (after_kg / threshold_kg).floor() as i64;
    (first..=last).collect()
}

/// Canonical certificate payload hash: SHA-256 over the sorted-key JSON
/// serialization, base64-encoded.
pub fn certificate_content_hash(
    user_key: &str,
    level: i64,
    threshold_kg: f64,
    total_weight_kg: f64,
    issued_at: &DateTime<Utc>,
) -> String {
    Base64::encode_string(&certificate_hash_bytes(
        user_key,
        level,
        threshold_kg,
        total_weight_kg,
        issued_at,
    ))
}

/// Raw hash bytes, as anchored on-chain. serde_json maps are ordered by
/// key, so the serialization is canonical without extra sorting.
pub fn certificate_hash_bytes(
    user_key: &str,
    level: i64,
    threshold_kg: f64,
    total_weight_kg: f64,
    issued_at: &DateTime<Utc>,
) -> [u8; 32] {
    let payload = json!({
        "user_key": user_key,
        "level": level,
        "threshold_kg": threshold_kg,
        "total_weight_kg": total_weight_kg,
        "issued_at": issued_at,
    });

    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hasher.finalize().into()
}

/// Recompute a stored certificate's hash and compare. A mismatch means
/// the record was altered after issuance.
pub fn verify_certificate_hash(cert: &Certificate) -> bool {
    let recomputed = certificate_content_hash(
        &cert.user_key,
        cert.level,
        cert.threshold_kg,
        cert.total_weight_kg,
        &cert.issued_at,
    );
    recomputed == cert.content_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_scales_with_weight_and_category() {
        let rates = RewardRates::default();
        let light = compute_reward(&rates, WasteCategory::Paper, 1.0);
        let heavy = compute_reward(&rates, WasteCategory::Paper, 3.0);
        assert!((heavy - 3.0 * light).abs() < 1e-9);

        // Electronic outpays paper at the default rates.
        assert!(
            compute_reward(&rates, WasteCategory::Electronic, 1.0)
                > compute_reward(&rates, WasteCategory::Paper, 1.0)
        );
    }

    #[test]
    fn reward_rounds_to_two_decimals() {
        let rates = RewardRates::default();
        let reward = compute_reward(&rates, WasteCategory::Plastic, 0.333);
        assert_eq!(reward, 3.33);
    }

    #[test]
    fn catalog_items_resolve_by_id() {
        assert!(catalog_item("tree-sapling").is_some());
        assert!(catalog_item("yacht").is_none());
    }

    #[test]
    fn no_level_crossed_below_the_threshold() {
        assert!(certificate_levels_crossed(50.0, 0.0, 49.9).is_empty());
    }

    #[test]
    fn single_level_crossed_at_the_boundary() {
        assert_eq!(certificate_levels_crossed(50.0, 49.0, 50.0), vec![1]);
    }

    #[test]
    fn boundary_start_does_not_recross() {
        // Already exactly at level 1; nothing new until level 2.
        assert_eq!(certificate_levels_crossed(50.0, 50.0, 99.0), Vec::<i64>::new());
        assert_eq!(certificate_levels_crossed(50.0, 50.0, 100.0), vec![2]);
    }

    #[test]
    fn one_verification_can_cross_multiple_levels() {
        assert_eq!(certificate_levels_crossed(50.0, 40.0, 160.0), vec![1, 2, 3]);
    }

    #[test]
    fn degenerate_thresholds_yield_nothing() {
        assert!(certificate_levels_crossed(0.0, 0.0, 100.0).is_empty());
        assert!(certificate_levels_crossed(-5.0, 0.0, 100.0).is_empty());
    }

    #[test]
    fn content_hash_is_deterministic_and_sensitive() {
        let at = Utc::now();
        let a = certificate_content_hash("u1", 1, 50.0, 51.0, &at);
        let b = certificate_content_hash("u1", 1, 50.0, 51.0, &at);
        assert_eq!(a, b);

        let tampered = certificate_content_hash("u1", 1, 50.0, 999.0, &at);
        assert_ne!(a, tampered);
    }

    #[test]
    fn verify_detects_tampering() {
        let issued_at = Utc::now();
        let mut cert = Certificate {
            id: "c1".into(),
            user_key: "u1".into(),
            level: 1,
            threshold_kg: 50.0,
            total_weight_kg: 51.0,
            content_hash: certificate_content_hash("u1", 1, 50.0, 51.0, &issued_at),
            chain_tx: None,
            issued_at,
        };
        assert!(verify_certificate_hash(&cert));

        cert.total_weight_kg = 500.0;
        assert!(!verify_certificate_hash(&cert));
    }

    #[test]
    fn string_and_byte_hashes_agree() {
        let at = Utc::now();
        let s = certificate_content_hash("u1", 2, 50.0, 101.0, &at);
        let bytes = certificate_hash_bytes("u1", 2, 50.0, 101.0, &at);
        assert_eq!(s, Base64::encode_string(&bytes));
    }
}
