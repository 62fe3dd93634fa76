// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Contract bindings for the pre-deployed Green Karma contract set.
//!
//! The contracts themselves live in a separate deployment repository;
//! only their ABI surface is fixed here.

use alloy::sol;

sol! {
    /// On-chain identity registry: links a wallet to a registered account.
    #[sol(rpc)]
    interface IGreenIdentity {
        function register(address account, string name) external;
        function isRegistered(address account) external view returns (bool);
    }

    /// Append-only log of verified recycling events.
    #[sol(rpc)]
    interface IRecyclingLedger {
        function recordRecycling(address account, uint8 category, uint256 weightGrams) external returns (uint256);
    }

    /// Reward token (18 decimals). Mint on verification, burn on
    /// redemption.
    #[sol(rpc)]
    interface IKarmaToken {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function transfer(address to, uint256 amount) external returns (bool);
        function mint(address to, uint256 amount) external;
        function burn(address from, uint256 amount) external;
    }

    /// Certificate anchor: stores the content hash of each issued
    /// certificate.
    #[sol(rpc)]
    interface ICertificateRegistry {
        function mintCertificate(address to, bytes32 contentHash) external returns (uint256);
    }
}
