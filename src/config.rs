// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! # Runtime Configuration
//!
//! All configuration is read from the environment once at startup into an
//! explicit [`Config`] value that is passed to the application state. No
//! module-level singletons; tests construct their own `Config`.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `GK_HOST` | Server bind address | `0.0.0.0` |
//! | `GK_PORT` | Server bind port | `8080` |
//! | `GK_DATA_DIR` | Data directory; presence selects the embedded store | unset |
//! | `GK_STORE_PROJECT` | Remote document-store project ID (REST shim) | unset |
//! | `GK_STORE_API_KEY` | Remote document-store API key (REST shim) | unset |
//! | `GK_STORE_BASE_URL` | Remote document-store base URL | Google-hosted endpoint |
//! | `GK_UPLOADS_DIR` | Directory for submission images | `uploads` |
//! | `GK_TOKEN_SECRET` | HS256 token signing secret | ephemeral random |
//! | `GK_TOKEN_TTL_SECS` | Token lifetime in seconds | `86400` |
//! | `GK_CERT_THRESHOLD_KG` | Verified weight per certificate level | `50` |
//! | `GK_RPC_URL` | EVM RPC endpoint | unset (chain disabled) |
//! | `GK_CHAIN_PRIVATE_KEY` | Operator private key (hex, no 0x) | unset (chain disabled) |
//! | `GK_CONTRACTS_FILE` | Deployment-output JSON with contract addresses | unset |
//! | `GK_IDENTITY_ADDRESS` | Identity registry address (overrides file) | unset |
//! | `GK_LEDGER_ADDRESS` | Recycling ledger address (overrides file) | unset |
//! | `GK_TOKEN_ADDRESS` | Karma token address (overrides file) | unset |
//! | `GK_CERTIFICATE_ADDRESS` | Certificate registry address (overrides file) | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use serde::Deserialize;

/// Default base URL of the remote document-store REST API.
pub const DEFAULT_STORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Default token lifetime (24 hours).
const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// Default cumulative verified weight (kg) per certificate level.
const DEFAULT_CERT_THRESHOLD_KG: f64 = 50.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("no store backend configured: set GK_DATA_DIR or GK_STORE_PROJECT + GK_STORE_API_KEY")]
    NoStoreBackend,

    #[error("failed to read contracts file {path}: {reason}")]
    ContractsFile { path: String, reason: String },

    #[error("contract address missing for {0} (set GK_CONTRACTS_FILE or the address variable)")]
    MissingContractAddress(&'static str),
}

/// Which document-store backend to run against.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// Embedded ACID database under the data directory. Supports the
    /// transaction primitive required by token redemption.
    Embedded { data_dir: PathBuf },
    /// REST shim against the remote document store. Development fallback
    /// when no data directory is configured; no transactions.
    Rest {
        base_url: String,
        project_id: String,
        api_key: String,
    },
}

/// Token reward rate per kilogram for each waste category.
///
/// Business configuration, not algorithm. Used directly when the chain
/// gateway is absent and as the credited amount when it is present.
#[derive(Debug, Clone)]
pub struct RewardRates {
    pub plastic: f64,
    pub paper: f64,
    pub glass: f64,
    pub metal: f64,
    pub electronic: f64,
}

impl Default for RewardRates {
    fn default() -> Self {
        Self {
            plastic: 10.0,
            paper: 5.0,
            glass: 8.0,
            metal: 15.0,
            electronic: 20.0,
        }
    }
}

/// Contract addresses for the pre-deployed contract set.
#[derive(Debug, Clone)]
pub struct ContractAddresses {
    pub identity: String,
    pub ledger: String,
    pub token: String,
    pub certificate: String,
}

/// Shape of the deployment-output file written by the contract deployer.
#[derive(Debug, Deserialize)]
struct DeploymentOutput {
    #[serde(default)]
    identity: Option<String>,
    #[serde(default)]
    ledger: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    certificate: Option<String>,
}

/// Chain gateway configuration. Absent entirely when the RPC URL or the
/// operator key is not set; every caller treats the gateway as optional.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub private_key_hex: String,
    pub contracts: ContractAddresses,
}

/// Application configuration resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub uploads_dir: PathBuf,
    /// HS256 signing secret. `None` means the caller should generate an
    /// ephemeral one (tokens will not survive a restart).
    pub token_secret: Option<String>,
    pub token_ttl_secs: i64,
    pub cert_threshold_kg: f64,
    pub reward_rates: RewardRates,
    pub chain: Option<ChainConfig>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("GK_HOST", "0.0.0.0");
        let port = parse_env("GK_PORT", 8080u16)?;

        let store = if let Some(dir) = env_optional("GK_DATA_DIR") {
            StoreBackend::Embedded {
                data_dir: PathBuf::from(dir),
            }
        } else {
            match (env_optional("GK_STORE_PROJECT"), env_optional("GK_STORE_API_KEY")) {
                (Some(project_id), Some(api_key)) => StoreBackend::Rest {
                    base_url: env_or_default("GK_STORE_BASE_URL", DEFAULT_STORE_BASE_URL),
                    project_id,
                    api_key,
                },
                _ => return Err(ConfigError::NoStoreBackend),
            }
        };

        let chain = match (env_optional("GK_RPC_URL"), env_optional("GK_CHAIN_PRIVATE_KEY")) {
            (Some(rpc_url), Some(private_key_hex)) => Some(ChainConfig {
                rpc_url,
                private_key_hex,
                contracts: load_contract_addresses()?,
            }),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            store,
            uploads_dir: PathBuf::from(env_or_default("GK_UPLOADS_DIR", "uploads")),
            token_secret: env_optional("GK_TOKEN_SECRET"),
            token_ttl_secs: parse_env("GK_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?,
            cert_threshold_kg: parse_env("GK_CERT_THRESHOLD_KG", DEFAULT_CERT_THRESHOLD_KG)?,
            reward_rates: RewardRates::default(),
            chain,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve contract addresses from the deployment-output file, with
/// individual environment variables taking precedence.
fn load_contract_addresses() -> Result<ContractAddresses, ConfigError> {
    let from_file = match env_optional("GK_CONTRACTS_FILE") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::ContractsFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            serde_json::from_str::<DeploymentOutput>(&raw).map_err(|e| {
                ConfigError::ContractsFile {
                    path,
                    reason: e.to_string(),
                }
            })?
        }
        None => DeploymentOutput {
            identity: None,
            ledger: None,
            token: None,
            certificate: None,
        },
    };

    let resolve = |env_name: &'static str,
                   file_value: Option<String>,
                   label: &'static str|
     -> Result<String, ConfigError> {
        env_optional(env_name)
            .or(file_value)
            .ok_or(ConfigError::MissingContractAddress(label))
    };

    Ok(ContractAddresses {
        identity: resolve("GK_IDENTITY_ADDRESS", from_file.identity, "identity registry")?,
        ledger: resolve("GK_LEDGER_ADDRESS", from_file.ledger, "recycling ledger")?,
        token: resolve("GK_TOKEN_ADDRESS", from_file.token, "karma token")?,
        certificate: resolve(
            "GK_CERTIFICATE_ADDRESS",
            from_file.certificate,
            "certificate registry",
        )?,
    })
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env_optional(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
