#![doc = include_str!("../README.md")]

mod config;
mod telemetry;
mod worker;

use clap::Parser;
use config::{CliArgs, DemoConfig};
use portable_atomic::{AtomicU64, Ordering};
use spindle::{FastId, Supervisor};
use std::sync::Arc;
use telemetry::init_telemetry;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    init_telemetry(config.log_format)?;

    let generator = Arc::new(FastId::new(config.id_config)?);
    log_startup_info(&config, &generator);

    let supervisor = Supervisor::new();
    let drawn = Arc::new(AtomicU64::new(0));

    for index in 0..config.workers {
        let generator = Arc::clone(&generator);
        let drawn = Arc::clone(&drawn);
        supervisor.start_named(format!("worker-{index}"), move |token| {
            worker::draw_ids(index, generator, drawn, token)
        });
    }
    {
        let drawn = Arc::clone(&drawn);
        let every = config.report_interval;
        supervisor.start_named("reporter", move |token| {
            worker::report_throughput(drawn, every, token)
        });
    }

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, draining workers...");

    if supervisor
        .cancel_and_wait_timeout(config.shutdown_timeout)
        .await
    {
        tracing::info!(
            total = drawn.load(Ordering::Relaxed),
            "All workers stopped"
        );
    } else {
        tracing::warn!(
            live = ?supervisor.live_units(),
            "Shutdown timeout elapsed with workers still running"
        );
    }

    Ok(())
}

fn log_startup_info(config: &DemoConfig, generator: &FastId) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting {} workers with full config: {:#?}",
            config.workers,
            config
        );
    } else {
        tracing::info!("Starting {} workers", config.workers);
    }
    tracing::info!(node_id = generator.node_id(), layout = ?generator.layout(), "Generator ready");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
