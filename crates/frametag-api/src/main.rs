//! Axum API server binary.

use std::net::SocketAddr;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use frametag_api::{create_router, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // rustls 0.23+ needs a process-wide crypto provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,frametag=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting frametag-api");

    let config = ApiConfig::from_env();
    info!(
        "API config: host={}, port={}, work_dir={}, language={}",
        config.host,
        config.port,
        config.work_dir.display(),
        config.language.code
    );
    if config.cloud.enabled && !config.cloud.has_credential() {
        warn!("Cloud provider enabled without OPENROUTER_API_KEY; cloud requests will fail");
    }

    let state = match AppState::new(config.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create application state: {}", e);
            std::process::exit(1);
        }
    };

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!("Server error: {}", e);
    }

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
