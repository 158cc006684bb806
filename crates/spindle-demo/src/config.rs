use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;
use spindle::FastIdConfig;

/// Output format of the console log layer.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Runtime configuration for the `spindle-demo` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults matching the library's default id
/// layout.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "spindle-demo",
    version,
    about = "Supervised workers drawing time-ordered ids until shutdown"
)]
pub struct CliArgs {
    /// Number of supervised workers drawing ids concurrently from one shared
    /// generator.
    ///
    /// Environment variable: `SPINDLE_WORKERS`
    #[arg(long, env = "SPINDLE_WORKERS", default_value_t = 4)]
    pub workers: usize,

    /// Node id embedded in every id. When omitted it is derived from the
    /// host's private IPv4 address. Values wider than `--node-bits` are
    /// truncated.
    ///
    /// Environment variable: `SPINDLE_NODE_ID`
    #[arg(long, env = "SPINDLE_NODE_ID")]
    pub node_id: Option<i64>,

    /// Width of the timestamp field.
    ///
    /// Environment variable: `SPINDLE_TIME_BITS`
    #[arg(long, env = "SPINDLE_TIME_BITS", default_value_t = 45)]
    pub time_bits: u8,

    /// Width of the per-tick sequence field.
    ///
    /// Environment variable: `SPINDLE_STEP_BITS`
    #[arg(long, env = "SPINDLE_STEP_BITS", default_value_t = 12)]
    pub step_bits: u8,

    /// Width of the node field.
    ///
    /// Environment variable: `SPINDLE_NODE_BITS`
    #[arg(long, env = "SPINDLE_NODE_BITS", default_value_t = 6)]
    pub node_bits: u8,

    /// Milliseconds between throughput reports.
    ///
    /// Environment variable: `SPINDLE_REPORT_INTERVAL`
    #[arg(long, env = "SPINDLE_REPORT_INTERVAL", default_value_t = 1000)]
    pub report_interval: u64,

    /// Seconds to wait for workers to drain after a shutdown signal.
    ///
    /// Environment variable: `SPINDLE_SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SPINDLE_SHUTDOWN_TIMEOUT", default_value_t = 5)]
    pub shutdown_timeout: u64,

    /// Console log format.
    ///
    /// Environment variable: `SPINDLE_LOG_FORMAT`
    #[arg(long, env = "SPINDLE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub workers: usize,
    pub id_config: FastIdConfig,
    pub report_interval: Duration,
    pub shutdown_timeout: Duration,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.workers == 0 {
            bail!("SPINDLE_WORKERS must be greater than 0");
        }

        if args.report_interval == 0 {
            bail!("SPINDLE_REPORT_INTERVAL must be greater than 0");
        }

        let mut id_config =
            FastIdConfig::default().with_bits(args.time_bits, args.step_bits, args.node_bits);
        if let Some(node_id) = args.node_id {
            if node_id < 0 {
                bail!("SPINDLE_NODE_ID must not be negative (got {node_id})");
            }
            id_config = id_config.with_node_id(node_id);
        }
        id_config.layout()?;

        Ok(Self {
            workers: args.workers,
            id_config,
            report_interval: Duration::from_millis(args.report_interval),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            log_format: args.log_format,
        })
    }
}
