//! Kline Proxy Binary
//!
//! Starts the kline HTTP proxy and its health server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin kline-proxy
//! ```
//!
//! # Environment Variables
//!
//! - `KLINE_PROXY_PORT`: Proxy HTTP port (default: 8080)
//! - `KLINE_PROXY_HEALTH_PORT`: Health and metrics port, 0 disables (default: 8082)
//! - `KLINE_PROXY_UPSTREAM_URL`: Upstream base URL (default: <https://api.binance.com>)
//! - `KLINE_PROXY_UPSTREAM_TIMEOUT_MS`: Upstream timeout (default: 10000)
//! - `KLINE_PROXY_USER_AGENT`: User-Agent sent upstream (default: kline-proxy/<version>)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: kline-proxy)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use kline_proxy::infrastructure::telemetry;
use kline_proxy::{
    BinanceKlineClient, HealthServer, HealthServerState, ProxyConfig, ProxyServer,
    RequestTranslator, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let telemetry_guard = telemetry::init();

    tracing::info!(
        otel_export = telemetry_guard.is_exporting(),
        "Starting Kline Proxy"
    );

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = ProxyConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let client = BinanceKlineClient::new(&config.upstream)?;
    tracing::debug!(endpoint = %client.endpoint(), "Upstream client ready");

    let translator = Arc::new(RequestTranslator::new(client, config.klines.clone()));

    // Spawn health server
    if config.server.health_port == 0 {
        tracing::info!("Health server disabled");
    } else {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    // Spawn proxy server
    let proxy_server = ProxyServer::new(
        config.server.http_port,
        translator,
        shutdown_token.clone(),
    );
    let proxy_shutdown = shutdown_token.clone();
    let proxy_task = tokio::spawn(async move {
        let result = proxy_server.run().await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Proxy server error");
            proxy_shutdown.cancel();
        }
        result
    });

    tracing::info!("Kline proxy ready");

    tokio::select! {
        () = await_shutdown(shutdown_token.clone()) => {}
        () = shutdown_token.cancelled() => {
            tracing::warn!("Proxy server exited, shutting down");
        }
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, proxy_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => return Err(e.into()),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "In-flight requests did not drain before the shutdown timeout"
            );
        }
    }

    tracing::info!("Kline proxy stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ProxyConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        health_port = config.server.health_port,
        upstream = %config.upstream.base_url,
        timeout_ms = config.upstream.timeout.as_millis(),
        "Configuration loaded"
    );
    tracing::debug!(
        default_symbol = %config.klines.symbol,
        default_interval = %config.klines.interval,
        default_limit = config.klines.limit,
        max_limit = config.klines.max_limit,
        user_agent = %config.upstream.user_agent,
        "Kline defaults"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
