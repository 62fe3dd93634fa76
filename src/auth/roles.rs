// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account roles.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access, including every verifier operation
/// - `Verifier` - Government reviewer; confirms or rejects submissions
/// - `User` - Normal account; submits waste and redeems rewards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Reviews and settles waste submissions
    Verifier,
    /// Normal account (default)
    User,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::Verifier, Role::Verifier | Role::User) => true,
            (Role::User, Role::User) => true,
            _ => false,
        }
    }

    /// Parse role from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "verifier" => Some(Role::Verifier),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Least privilege for new accounts.
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Verifier => write!(f, "verifier"),
            Role::User => write!(f, "user"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        assert!(Role::Admin.has_privilege(Role::Admin));
        assert!(Role::Admin.has_privilege(Role::Verifier));
        assert!(Role::Admin.has_privilege(Role::User));
    }

    #[test]
    fn verifier_covers_user_but_not_admin() {
        assert!(!Role::Verifier.has_privilege(Role::Admin));
        assert!(Role::Verifier.has_privilege(Role::Verifier));
        assert!(Role::Verifier.has_privilege(Role::User));
    }

    #[test]
    fn user_only_has_user_privilege() {
        assert!(!Role::User.has_privilege(Role::Admin));
        assert!(!Role::User.has_privilege(Role::Verifier));
        assert!(Role::User.has_privilege(Role::User));
    }

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("VERIFIER"), Some(Role::Verifier));
        assert_eq!(Role::from_str("User"), Some(Role::User));
        assert_eq!(Role::from_str("unknown"), None);
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
