//! # Uptime Submission Backend
//!
//! Entry point of the ingestion service.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (from env)
//! 2. Load and validate configuration (file + env)
//! 3. Build storage destinations and the attempt counter
//! 4. Load the whitelist (fatal on failure unless disabled)
//! 5. Spawn the whitelist refresher and the attempt cleanup task
//! 6. Bind, signal ready, serve until Ctrl-C
//!
//! ## Shutdown
//!
//! In-flight requests complete, background tasks are signalled, then every
//! storage destination is closed.

mod config;
mod wiring;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use uptime_submission::{
    build_router, cleanup_task, AppState, AttemptCounter, Ed25519Verifier, PersistenceFanout,
    SignatureVerifier, SubmissionPipeline, SystemTimeSource, WhitelistRefresher,
};
use uptime_telemetry::{init_logging, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_logging(&telemetry).context("Failed to initialize logging")?;
    info!(
        service = %telemetry.service_name,
        version = uptime_submission::VERSION,
        "Starting uptime submission backend"
    );

    let config = config::load_config()?;
    config.validate().context("Invalid configuration")?;
    info!(
        network = %config.network_name,
        network_id = config.network_id(),
        max_attempts = config.rate_limit.max_attempts,
        "Configuration loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ready = Arc::new(AtomicBool::new(false));
    let mut tasks = Vec::new();

    let fanout = Arc::new(PersistenceFanout::new(wiring::build_destinations(
        &config.storage,
    )));

    let attempts = Arc::new(AttemptCounter::from_config(&config.rate_limit));
    tasks.push(tokio::spawn(cleanup_task(
        Arc::clone(&attempts),
        config.rate_limit.cleanup_interval(),
        shutdown_rx.clone(),
    )));

    let whitelist = if config.whitelist.disabled {
        warn!("Whitelist disabled, every submitter is accepted");
        None
    } else {
        let source = wiring::whitelist_source(&config.whitelist)?;
        let refresher = WhitelistRefresher::initial_load(source, &config.whitelist)
            .await
            .context("Failed to load whitelist")?;
        let snapshot = refresher.snapshot();
        tasks.push(tokio::spawn(refresher.run(shutdown_rx.clone())));
        Some(snapshot)
    };

    let verifier: Option<Arc<dyn SignatureVerifier>> = if config.verify_signature_disabled {
        warn!("Signature verification disabled");
        None
    } else {
        Some(Arc::new(Ed25519Verifier))
    };

    let addr = config.http_addr();
    let pipeline = Arc::new(SubmissionPipeline::new(
        config,
        attempts,
        whitelist,
        verifier,
        Arc::clone(&fanout),
        Arc::new(SystemTimeSource),
    ));
    let app = build_router(AppState::new(pipeline, Arc::clone(&ready)));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    ready.store(true, Ordering::Release);
    info!(%addr, "Listening for submissions");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    // Graceful shutdown
    ready.store(false, Ordering::Release);
    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            error!(error = %e, "Background task failed");
        }
    }
    fanout.close().await;
    info!("Uptime submission backend stopped");

    served.context("HTTP server error")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
    }
}
