// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use green_karma_server::{
    api::router,
    auth::TokenSigner,
    chain::ChainGateway,
    config::{Config, StoreBackend},
    state::AppState,
    store::{Datastore, EmbeddedStore, RestStore},
};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = Config::from_env().expect("invalid configuration");

    let store = match &config.store {
        StoreBackend::Embedded { data_dir } => {
            info!(data_dir = %data_dir.display(), "using embedded store");
            Datastore::Embedded(EmbeddedStore::open(data_dir).expect("failed to open embedded store"))
        }
        StoreBackend::Rest {
            base_url,
            project_id,
            api_key,
        } => {
            warn!(
                project_id,
                "no data directory configured; using the REST shim (no transactions, \
                 full-collection queries)"
            );
            Datastore::Rest(
                RestStore::new(base_url, project_id, api_key).expect("invalid REST store config"),
            )
        }
    };

    let tokens = match &config.token_secret {
        Some(secret) => TokenSigner::new(secret.as_bytes(), config.token_ttl_secs),
        None => {
            warn!("GK_TOKEN_SECRET not set; using an ephemeral key (tokens die with the process)");
            TokenSigner::ephemeral(config.token_ttl_secs)
        }
    };

    let chain = match &config.chain {
        Some(chain_config) => {
            let gateway = ChainGateway::new(chain_config).expect("invalid chain configuration");
            info!(rpc_url = %chain_config.rpc_url, "chain gateway enabled");
            Some(gateway)
        }
        None => {
            info!("chain gateway disabled; rewards are credited locally only");
            None
        }
    };

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .expect("failed to parse bind address");

    let state = AppState::new(store, tokens, chain, config);
    let app = router(state);

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown_signal(shutdown.clone()));

    info!("Green Karma server listening on http://{addr} (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .expect("server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Cancel the token on SIGINT or SIGTERM.
async fn wait_for_shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
    token.cancel();
}
