//! revpred-api - Revenue prediction HTTP service
//!
//! Loads the gradient-boosted model once at startup, then serves single and
//! bulk (spreadsheet) predictions over JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use revpred_api::model::load_model;
use revpred_api::predict::PredictionService;
use revpred_api::{build_router, AppState};
use revpred_common::config::{ConfigOverrides, ConfigSource, TomlConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for revpred-api
#[derive(Parser, Debug)]
#[command(name = "revpred-api")]
#[command(about = "Company revenue prediction service")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "REVPRED_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "REVPRED_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "REVPRED_PORT")]
    port: Option<u16>,

    /// Model artifact (JSON)
    #[arg(short, long, env = "REVPRED_MODEL_PATH")]
    model: Option<PathBuf>,

    /// Largest accepted bulk upload in bytes
    #[arg(long, env = "REVPRED_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "REVPRED_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            model_path: self.model.clone(),
            max_upload_bytes: self.max_upload_bytes,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) =
        TomlConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    let config = config
        .with_overrides(args.overrides())
        .context("Invalid configuration")?;

    // RUST_LOG wins over the configured level
    let level = config.logging.level.to_ascii_lowercase();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("revpred_api={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting revpred-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &source {
        ConfigSource::File(path) => info!("Config: {}", path.display()),
        ConfigSource::Defaults => warn!("No config file found, using defaults"),
    }

    let max_upload_bytes = config.limits.max_upload_bytes;
    let state = match load_model(&config.model.path) {
        Ok(loaded) => {
            let service = PredictionService::new(loaded.predictor, max_upload_bytes);
            AppState::new(service, Some(loaded.info))
        }
        Err(e) if !config.model.require_loaded => {
            warn!("Model unavailable, starting degraded: {}", e);
            AppState::degraded(max_upload_bytes)
        }
        Err(e) => {
            error!("Failed to load model: {}", e);
            return Err(e).context("Model is required (model.require_loaded = true)");
        }
    };

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("revpred-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
    info!("Shutting down...");
}
