//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Topic Curator - message bus curation pipeline
#[derive(Parser, Debug)]
#[command(
    name = "topic-curator",
    author,
    version,
    about = "Message bus topic curation pipeline",
    long_about = "A curation pipeline for machine telemetry on a publish/subscribe bus.\n\n\
                  Subscribes to raw topics, matches messages against approved schema \n\
                  mappings, transforms and republishes them to the curated bus, and \n\
                  records topic hierarchy, conformance and lineage in the store."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TOPIC_CURATOR_VERBOSE")]
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
        env = "TOPIC_CURATOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the curation pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "TOPIC_CURATOR_CONFIG"
    )]
    pub config: PathBuf,

    /// Override uncurated bus host from configuration
    #[arg(long, env = "TOPIC_CURATOR_UNCURATED_HOST")]
    pub uncurated_host: Option<String>,

    /// Override curated bus host from configuration
    #[arg(long, env = "TOPIC_CURATOR_CURATED_HOST")]
    pub curated_host: Option<String>,

    /// Override store path from configuration
    #[arg(long, env = "TOPIC_CURATOR_STORE_PATH")]
    pub store_path: Option<String>,

    /// Maximum ingested messages before exiting (0 = unlimited)
    #[arg(long, default_value = "0", env = "TOPIC_CURATOR_MAX_MESSAGES")]
    pub max_messages: u64,

    /// Run duration in seconds (0 = until shutdown signal)
    #[arg(long, default_value = "0", env = "TOPIC_CURATOR_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "9000", env = "TOPIC_CURATOR_METRICS_PORT")]
    pub metrics_port: u16,

    /// Health/readiness endpoint port (0 = disabled)
    #[arg(long, default_value = "8080", env = "TOPIC_CURATOR_HEALTH_PORT")]
    pub health_port: u16,

    /// Synthetic publisher interval in milliseconds (mock mode only)
    #[arg(long, default_value = "50", env = "TOPIC_CURATOR_SIM_INTERVAL_MS")]
    pub sim_interval_ms: u64,
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

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show bridge route details
    #[arg(long)]
    pub bridges: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
