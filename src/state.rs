// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

use std::sync::Arc;

use crate::auth::TokenSigner;
use crate::chain::ChainGateway;
use crate::config::Config;
use crate::store::Datastore;

/// Shared application state, constructed once at startup from [`Config`]
/// and cloned into every handler. No module-level singletons: tests swap
/// in their own store and signer.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Datastore>,
    pub tokens: Arc<TokenSigner>,
    /// Absent when the chain is not configured; all call sites degrade.
    pub chain: Option<Arc<ChainGateway>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Datastore,
        tokens: TokenSigner,
        chain: Option<ChainGateway>,
        config: Config,
    ) -> Self {
        Self {
            store: Arc::new(store),
            tokens: Arc::new(tokens),
            chain: chain.map(Arc::new),
            config: Arc::new(config),
        }
    }

    /// Embedded store in a temp directory, ephemeral signer, no chain.
    #[cfg(test)]
    pub fn for_tests() -> (AppState, tempfile::TempDir) {
        use crate::config::{RewardRates, StoreBackend};
        use crate::store::EmbeddedStore;

        let dir = tempfile::TempDir::new().expect("tempdir");
        let store = EmbeddedStore::open(dir.path()).expect("open embedded store");

        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreBackend::Embedded {
                data_dir: dir.path().to_path_buf(),
            },
            uploads_dir: dir.path().join("uploads"),
            token_secret: None,
            token_ttl_secs: 3600,
            cert_threshold_kg: 50.0,
            reward_rates: RewardRates::default(),
            chain: None,
        };

        let state = AppState::new(
            Datastore::Embedded(store),
            TokenSigner::new(b"test-secret", 3600),
            None,
            config,
        );
        (state, dir)
    }
}
