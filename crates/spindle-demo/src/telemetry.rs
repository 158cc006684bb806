//! Console logging for the demo.
//!
//! Verbosity comes from `RUST_LOG` (default `info`); the format is chosen with
//! `--log-format`. Events emitted by `spindle` itself (unit panics, drain
//! progress, bounded-drain timeouts) go through the same subscriber.

use crate::config::LogFormat;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_file(true),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_thread_ids(true)
                    .with_current_span(false)
                    .flatten_event(true),
            )
            .try_init()?,
    }

    Ok(())
}
