// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Token claims and the authenticated-request representation.

use serde::{Deserialize, Serialize};

use super::roles::Role;
use crate::models::User;

/// Claims carried in an issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the email-derived user key.
    pub sub: String,
    /// Email at issuance (informational; the profile is authoritative).
    pub email: String,
    /// Role at issuance.
    pub role: Role,
    /// Issued-at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// Issuer.
    pub iss: String,
}

/// The authenticated caller, with the profile document resolved from the
/// store. The profile, not the token, is authoritative for role and
/// balances: a role change takes effect on the next request, not the next
/// login.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
}

impl AuthenticatedUser {
    pub fn key(&self) -> &str {
        &self.user.key
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.user.role.has_privilege(required)
    }
}
