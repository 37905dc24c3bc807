//! CropGuard Server
//!
//! Crop disease diagnosis over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

use cropguard_server::{create_router, AppState, Cli, DiagnosisService, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    info!("Starting CropGuard server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServiceConfig::load(&cli.config, &cli)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    info!("Configuration loaded successfully");
    info!("Project root: {}", config.model.project_root().display());
    info!("Device: {:?}", config.model.device);
    info!("Max upload size: {} bytes", config.max_upload_bytes);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Load the model; nothing is served without it
    info!("Loading classifier...");
    let service = DiagnosisService::from_config(&config)
        .context("Failed to initialize the disease classifier")?;
    let state = AppState::new(config, service, Some(metrics_handle));

    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port).parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    // Graceful shutdown handler
    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("cropguard=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cropguard=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "cropguard_requests_total",
        "Total number of prediction requests received"
    );
    metrics::describe_counter!(
        "cropguard_predictions_total",
        "Total number of successful predictions by crop"
    );
    metrics::describe_counter!(
        "cropguard_errors_total",
        "Total number of failed prediction requests by error kind"
    );
    metrics::describe_histogram!(
        "cropguard_inference_latency_us",
        metrics::Unit::Microseconds,
        "Preprocessing plus inference latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
