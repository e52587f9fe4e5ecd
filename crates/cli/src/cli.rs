//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry Hub - sensor telemetry ingestion and aggregation
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-hub",
    author,
    version,
    about = "Sensor telemetry ingestion and aggregation hub",
    long_about = "Ingests sequence-numbered sensor readings from many producers, \n\
                  tracks per-source loss, duplicates and reordering, aggregates \n\
                  value statistics, and periodically presents a snapshot to \n\
                  configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEMETRY_HUB_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_HUB_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run simulated sources through the hub until interrupted
    Run(RunArgs),

    /// Replay newline-delimited wire records through the hub
    Replay(ReplayArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in simulation if omitted
    #[arg(short, long, env = "TELEMETRY_HUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stop after this many seconds (0 = run until Ctrl+C)
    #[arg(long, default_value = "0", env = "TELEMETRY_HUB_DURATION")]
    pub duration: u64,

    /// Override presentation refresh interval (milliseconds)
    #[arg(long, env = "TELEMETRY_HUB_REFRESH_MS")]
    pub refresh_ms: Option<u64>,

    /// Override extra per-record delay of every source (milliseconds)
    #[arg(long, env = "TELEMETRY_HUB_DELAY_MS")]
    pub delay_ms: Option<u64>,

    /// Write every consumed record to this CSV file
    #[arg(long, env = "TELEMETRY_HUB_RECORD_LOG")]
    pub record_log: Option<PathBuf>,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between presenter and dispatcher
    #[arg(long, default_value = "100", env = "TELEMETRY_HUB_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TELEMETRY_HUB_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `replay` command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Input file with one JSON record per line ("-" for stdin)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path to configuration file (queue and aggregator settings)
    #[arg(short, long, env = "TELEMETRY_HUB_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
