// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use identity_auth_server::{
    api::router,
    config::{Config, LogFormat, LOG_FORMAT_ENV},
    state::AppState,
    storage::{IdentityDatabase, IdentityStore, MemoryIdentityStore},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Logging comes up before configuration so config errors are reported.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let json = env::var(LOG_FORMAT_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run() -> Result<(), String> {
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {e}"))?;
    if config.server.log_format == LogFormat::Json {
        info!("Structured JSON logging enabled");
    }

    info!(
        issuer_domain = %config.auth.issuer_domain,
        jwks_url = %config.auth.jwks_url,
        algorithm = ?config.auth.algorithm,
        providers = ?config.auth.providers.prefixes(),
        jwks_requests_per_minute = config.auth.jwks_requests_per_minute,
        clock_skew_seconds = config.auth.clock_skew_seconds,
        "Configuration loaded"
    );

    let store: Arc<dyn IdentityStore> = match &config.server.data_dir {
        Some(dir) => Arc::new(
            IdentityDatabase::open_in_dir(dir)
                .map_err(|e| format!("Failed to open identity database: {e}"))?,
        ),
        None => {
            warn!("DATA_DIR not set, identities are kept in memory only");
            Arc::new(MemoryIdentityStore::new())
        }
    };

    let state = AppState::new(&config.auth, store);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| format!("Invalid bind address: {e}"))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let handle: Handle<SocketAddr> = Handle::new();
    {
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });
    }

    match &config.server.tls {
        Some(tls) => {
            // Must happen before any TLS configuration is built.
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                warn!("rustls crypto provider already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .map_err(|e| format!("Failed to load TLS certificate: {e}"))?;

            info!("Identity auth server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| format!("HTTPS server failed: {e}"))?;
        }
        None => {
            info!("Identity auth server listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| format!("HTTP server failed: {e}"))?;
        }
    }

    info!("Identity auth server shutdown complete");
    Ok(())
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    shutdown.cancel();
}
