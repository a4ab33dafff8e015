use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the portal-sync binary.
#[derive(Debug, Parser)]
#[command(
    name = "portal-sync",
    version,
    about = "Aggregate and inspect portal content for one subunit"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PORTAL_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Load one subunit and print its aggregated state as JSON.
    Snapshot(SnapshotArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SnapshotArgs {
    /// Identifier of the sector or subsector to load.
    #[arg(value_name = "SUBUNIT")]
    pub subunit: String,

    /// Content kinds whose drafts should be included (news,events,...).
    #[arg(long = "drafts", value_name = "KIND", value_delimiter = ',')]
    pub drafts: Vec<String>,

    /// Pretty-print the JSON output.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,

    #[command(flatten)]
    pub overrides: SnapshotOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SnapshotOverrides {
    /// Override the backend base URL.
    #[arg(long = "backend-url", value_name = "URL")]
    pub backend_url: Option<String>,

    /// Override the backend API key.
    #[arg(long = "api-key", env = "PORTAL_API_KEY", value_name = "KEY")]
    pub api_key: Option<String>,

    /// Override the per-attempt request timeout.
    #[arg(long = "retry-timeout-ms", value_name = "MILLIS")]
    pub retry_timeout_ms: Option<u64>,

    /// Override the maximum number of attempts per read.
    #[arg(long = "retry-max-attempts", value_name = "COUNT")]
    pub retry_max_attempts: Option<u32>,

    /// Override the reference-data cache ttl.
    #[arg(long = "cache-reference-ttl-seconds", value_name = "SECONDS")]
    pub cache_reference_ttl_secs: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}
