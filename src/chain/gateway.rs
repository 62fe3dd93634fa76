// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! EVM gateway for the Green Karma contract set.
//!
//! Thin wrapper issuing transactions against the pre-deployed contracts.
//! The gateway is optional at runtime and every caller treats its errors
//! as recoverable: a failed anchor or mint is logged and the request
//! proceeds with the locally computed reward.

use std::str::FromStr;

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, FixedBytes, U256},
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    signers::local::PrivateKeySigner,
};

use super::contracts::{ICertificateRegistry, IGreenIdentity, IKarmaToken, IRecyclingLedger};
use crate::config::ChainConfig;

/// HTTP provider type with the recommended fillers plus a signing wallet.
type GatewayProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// Token decimals of the karma token.
const TOKEN_DECIMALS: u32 = 18;

/// Errors that can occur during chain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),
}

/// Parsed addresses of the contract set.
struct ContractSet {
    identity: Address,
    ledger: Address,
    token: Address,
    certificate: Address,
}

pub struct ChainGateway {
    provider: GatewayProvider,
    contracts: ContractSet,
}

impl ChainGateway {
    /// Build the gateway from configuration: parse the operator key and
    /// contract addresses, connect the HTTP provider.
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        let url: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let signer = create_signer(&config.private_key_hex)?;
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

        let contracts = ContractSet {
            identity: parse_address(&config.contracts.identity)?,
            ledger: parse_address(&config.contracts.ledger)?,
            token: parse_address(&config.contracts.token)?,
            certificate: parse_address(&config.contracts.certificate)?,
        };

        Ok(Self { provider, contracts })
    }

    /// Register a wallet in the identity registry.
    pub async fn register_identity(&self, wallet: &str, name: &str) -> Result<String, ChainError> {
        let account = parse_address(wallet)?;
        let contract = IGreenIdentity::new(self.contracts.identity, self.provider.clone());

        let pending = contract
            .register(account, name.to_string())
            .send()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(format!("{:#x}", receipt.transaction_hash))
    }

    /// Append a verified recycling event to the on-chain ledger.
    pub async fn record_recycling(
        &self,
        wallet: &str,
        category: u8,
        weight_grams: u64,
    ) -> Result<String, ChainError> {
        let account = parse_address(wallet)?;
        let contract = IRecyclingLedger::new(self.contracts.ledger, self.provider.clone());

        let pending = contract
            .recordRecycling(account, category, U256::from(weight_grams))
            .send()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(format!("{:#x}", receipt.transaction_hash))
    }

    /// Mint reward tokens to a wallet.
    pub async fn mint_reward(&self, wallet: &str, tokens: f64) -> Result<String, ChainError> {
        let account = parse_address(wallet)?;
        let amount = tokens_to_units(tokens)?;
        let contract = IKarmaToken::new(self.contracts.token, self.provider.clone());

        let pending = contract
            .mint(account, amount)
            .send()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(format!("{:#x}", receipt.transaction_hash))
    }

    /// Burn redeemed tokens from a wallet.
    pub async fn burn_tokens(&self, wallet: &str, tokens: f64) -> Result<String, ChainError> {
        let account = parse_address(wallet)?;
        let amount = tokens_to_units(tokens)?;
        let contract = IKarmaToken::new(self.contracts.token, self.provider.clone());

        let pending = contract
            .burn(account, amount)
            .send()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(format!("{:#x}", receipt.transaction_hash))
    }

    /// Read a wallet's karma token balance.
    pub async fn token_balance(&self, wallet: &str) -> Result<f64, ChainError> {
        let account = parse_address(wallet)?;
        let contract = IKarmaToken::new(self.contracts.token, self.provider.clone());

        let balance: U256 = contract
            .balanceOf(account)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        Ok(units_to_tokens(balance))
    }

    /// Anchor a certificate's content hash on-chain.
    pub async fn mint_certificate(
        &self,
        wallet: &str,
        content_hash: [u8; 32],
    ) -> Result<String, ChainError> {
        let account = parse_address(wallet)?;
        let contract = ICertificateRegistry::new(self.contracts.certificate, self.provider.clone());

        let pending = contract
            .mintCertificate(account, FixedBytes::from(content_hash))
            .send()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(format!("{:#x}", receipt.transaction_hash))
    }

    /// Current block number; used by the readiness probe.
    pub async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }
}

/// Create a signer from a hex private key (64 characters, no 0x prefix).
fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, ChainError> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim_start_matches("0x"))
        .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))
}

fn parse_address(address: &str) -> Result<Address, ChainError> {
    Address::from_str(address).map_err(|e| ChainError::InvalidAddress(e.to_string()))
}

/// Convert a token amount to base units (18 decimals). Integer math over
/// micro-tokens keeps the conversion exact to six decimal places.
fn tokens_to_units(tokens: f64) -> Result<U256, ChainError> {
    if !tokens.is_finite() || tokens < 0.0 {
        return Err(ChainError::InvalidAmount(format!(
            "token amount must be finite and non-negative, got {tokens}"
        )));
    }
    let micro = (tokens * 1_000_000.0).round();
    if micro > u128::MAX as f64 {
        return Err(ChainError::InvalidAmount(format!("token amount too large: {tokens}")));
    }
    let micro = U256::from(micro as u128);
    Ok(micro * U256::from(10u64).pow(U256::from(TOKEN_DECIMALS - 6)))
}

/// Convert base units back to a token amount for display.
fn units_to_tokens(units: U256) -> f64 {
    // Divide down to micro-tokens first so the f64 conversion stays in
    // range for realistic balances.
    let micro = units / U256::from(10u64).pow(U256::from(TOKEN_DECIMALS - 6));
    let micro: u128 = micro.try_into().unwrap_or(u128::MAX);
    micro as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_to_units_uses_18_decimals() {
        let one = tokens_to_units(1.0).unwrap();
        assert_eq!(one, U256::from(10u64).pow(U256::from(18u32)));

        let half = tokens_to_units(0.5).unwrap();
        assert_eq!(half, U256::from(5u64) * U256::from(10u64).pow(U256::from(17u32)));
    }

    #[test]
    fn tokens_to_units_rejects_bad_amounts() {
        assert!(tokens_to_units(-1.0).is_err());
        assert!(tokens_to_units(f64::NAN).is_err());
        assert!(tokens_to_units(f64::INFINITY).is_err());
    }

    #[test]
    fn units_round_trip_to_micro_precision() {
        for amount in [0.0, 1.0, 12.5, 0.000001, 123456.789] {
            let units = tokens_to_units(amount).unwrap();
            let back = units_to_tokens(units);
            assert!((back - amount).abs() < 1e-6, "{amount} -> {back}");
        }
    }

    #[test]
    fn signer_parses_with_and_without_prefix() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert!(create_signer(key).is_ok());
        assert!(create_signer(&format!("0x{key}")).is_ok());
        assert!(create_signer("nothex").is_err());
    }

    #[test]
    fn parse_address_validates() {
        assert!(parse_address("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").is_ok());
        assert!(parse_address("0x123").is_err());
        assert!(parse_address("").is_err());
    }
}
