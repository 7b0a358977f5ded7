// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use critiqal_server::{
    api::router,
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::RedbStore,
};

/// How long in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn fatal(message: &str, error: &dyn std::fmt::Display) -> ! {
    tracing::error!(error = %error, "{message}");
    std::process::exit(1);
}

async fn shutdown_signal(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

/// Serve `app` until `handle` is shut down; HTTPS when a TLS config is given.
async fn serve(
    app: Router,
    addr: SocketAddr,
    handle: Handle<SocketAddr>,
    tls: Option<RustlsConfig>,
) -> std::io::Result<()> {
    match tls {
        Some(tls_config) => {
            tracing::info!(%addr, "Critiqal server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            tracing::info!(%addr, "Critiqal server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing(LogFormat::from_env());

    let config = AppConfig::from_env().unwrap_or_else(|e| fatal("Invalid configuration", &e));
    let sessions = config
        .session_issuer()
        .unwrap_or_else(|e| fatal("Invalid session configuration", &e));

    let state = match &config.data_dir {
        Some(dir) => {
            let store = RedbStore::open_in(dir).unwrap_or_else(|e| fatal("Failed to open store", &e));
            AppState::with_store(Arc::new(store), sessions)
        }
        None => {
            tracing::warn!("DATA_DIR not set, using in-memory store");
            AppState::in_memory(sessions)
        }
    };

    let app = router(state);
    let addr = config.bind_addr;

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    let tls_config = match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls before any TLS operations
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                tracing::debug!("rustls crypto provider already installed");
            }

            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .unwrap_or_else(|e| fatal("Failed to load TLS certificate", &e));
            Some(tls_config)
        }
        None => None,
    };

    let served = serve(app, addr, handle, tls_config).await;

    if let Err(e) = served {
        fatal("Server failed", &e);
    }
    tracing::info!("Server stopped");
}
