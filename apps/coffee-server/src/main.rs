// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::error::Error;
use std::sync::Arc;

use coffee_shop_server::{
    api::router,
    auth::{AuthGuard, HttpKeySource, KeySetCache, TokenVerifier},
    config::{AppConfig, LogFormat},
    state::AppState,
    storage::DrinkDatabase,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    let drinks = DrinkDatabase::open(&config.database_path)?;
    if config.reset_database {
        drinks.reset()?;
    }
    info!(path = %config.database_path.display(), "Drink database ready");

    let auth = &config.auth;
    let source = HttpKeySource::new(auth.jwks_url.as_str(), auth.fetch_timeout)?;
    let keys = KeySetCache::new(Arc::new(source))
        .with_cache_ttl(auth.cache_ttl)
        .with_fetch_timeout(auth.fetch_timeout)
        .with_min_refresh_interval(auth.min_refresh_interval);
    let verifier = TokenVerifier::new(auth.audience.clone(), auth.issuer.clone(), auth.algorithm);
    info!(
        issuer = %auth.issuer,
        audience = %auth.audience,
        algorithm = ?auth.algorithm,
        jwks_url = %auth.jwks_url,
        "Token verification configured"
    );

    let state = AppState::new(drinks, AuthGuard::new(keys, verifier));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Coffee shop server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
