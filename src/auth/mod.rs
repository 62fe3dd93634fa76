// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! # Authentication Module
//!
//! Bearer-token authentication for the Green Karma API.
//!
//! ## Auth Flow
//!
//! 1. `POST /api/auth/register` creates the account document (key derived
//!    from the canonicalized email)
//! 2. `POST /api/auth/login` checks the password hash and issues an HS256
//!    token
//! 3. On every authenticated request the `Auth` extractor:
//!    - Verifies signature, expiry and issuer
//!    - Resolves the profile document from the store and attaches it
//!
//! ## Security
//!
//! - All endpoints except register/login, certificate verification and
//!   health require authentication
//! - Role checks read the resolved profile, not the token, so a role
//!   change applies immediately
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod roles;
pub mod tokens;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::{Auth, VerifierOnly};
pub use roles::Role;
pub use tokens::TokenSigner;
