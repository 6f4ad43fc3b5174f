//! tlogkv Server Binary
//!
//! Replays the transaction log, then serves requests through the configured
//! frontend until Ctrl+C / SIGTERM.

use std::sync::Arc;

use clap::Parser;
use tlogkv::config::{ENV_FRONTEND, ENV_LISTEN_ADDR, ENV_LOGGER, ENV_LOG_FILE};
use tlogkv::frontend::Frontend;
use tlogkv::{Config, KvService};
use tokio::signal;
use tracing_subscriber::{fmt, EnvFilter};

/// tlogkv Server
///
/// Every flag falls back to its environment variable.
#[derive(Parser, Debug)]
#[command(name = "tlogkv-server")]
#[command(about = "Key-value store backed by an append-only transaction log")]
#[command(version)]
struct Args {
    /// Transaction logger kind: file | binary [env: TLOG_TYPE]
    #[arg(long)]
    logger: Option<String>,

    /// Transaction log path [env: TLOG_FILENAME]
    #[arg(long)]
    log_file: Option<String>,

    /// Frontend kind: rest | tcp [env: FRONTEND_TYPE]
    #[arg(short, long)]
    frontend: Option<String>,

    /// Listen address (host:port) [env: KV_LISTEN_ADDR]
    #[arg(short, long)]
    listen: Option<String>,
}

impl Args {
    fn lookup(&self, name: &str) -> Option<String> {
        let flag = match name {
            ENV_LOGGER => &self.logger,
            ENV_LOG_FILE => &self.log_file,
            ENV_FRONTEND => &self.frontend,
            ENV_LISTEN_ADDR => &self.listen,
            _ => &None,
        };
        flag.clone().or_else(|| std::env::var(name).ok())
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tlogkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let config = match Config::from_lookup(|name| args.lookup(name)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("tlogkv Server v{}", tlogkv::VERSION);
    tracing::info!("Transaction log: {} ({})", config.log_path.display(), config.logger_kind);
    tracing::info!("Frontend: {} on {}", config.frontend_kind, config.listen_addr);

    let service = match KvService::open(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open service: {}", e);
            std::process::exit(1);
        }
    };

    // A dead log writer means writes are no longer durable: stop serving.
    let writer_errors = service.err();
    std::thread::spawn(move || {
        if let Ok(e) = writer_errors.recv() {
            tracing::error!("Fatal: {}", e);
            std::process::exit(1);
        }
    });

    let frontend = Frontend::new(&config);
    if let Err(e) = frontend.start(Arc::clone(&service), shutdown_signal()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    match Arc::try_unwrap(service) {
        Ok(service) => {
            if let Err(e) = service.close() {
                tracing::error!("Transaction log did not drain: {}", e);
                std::process::exit(1);
            }
        }
        Err(_) => tracing::warn!("Service still in use at shutdown; log drained on drop"),
    }

    tracing::info!("Server stopped");
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl+C: {}", e);
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
                tracing::warn!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
