//! Command line arguments for the `logs-insights` binary.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Version string with the git branch and commit embedded by `build.rs`
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT"),
    " on ",
    env!("GIT_BRANCH"),
    ")"
);

/// How query results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `<@timestamp>  <@message>` per row
    Text,
    /// The whole outcome as one JSON document
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "logs-insights",
    version,
    long_version = LONG_VERSION,
    about = "Run CloudWatch Logs Insights queries for a Lambda function"
)]
pub struct CliArgs {
    /// Function key from the project configuration
    #[arg(short = 'f', long = "function")]
    pub function: String,

    /// Query preset key or a literal Logs Insights query
    #[arg(short = 'q', long)]
    pub query: Option<String>,

    /// Time window ending now (e.g. 30m, 1h, 2d)
    #[arg(short = 'i', long, default_value = "1h")]
    pub interval: String,

    /// Project configuration file
    #[arg(
        short = 'c',
        long,
        default_value = "logs-insights.toml",
        env = "LOGS_INSIGHTS_CONFIG"
    )]
    pub config: PathBuf,

    /// Deployment stage, overrides provider.stage
    #[arg(short = 's', long)]
    pub stage: Option<String>,

    /// AWS region, overrides provider.region and the environment
    #[arg(short = 'r', long)]
    pub region: Option<String>,

    /// Named AWS profile
    #[arg(long)]
    pub profile: Option<String>,

    /// Query this log group instead of the function's
    #[arg(long)]
    pub log_group: Option<String>,

    /// Wait between status polls, in milliseconds
    #[arg(long, default_value_t = 1500)]
    pub poll_interval_ms: u64,

    /// Give up polling after this long (e.g. 15m), or "none"
    #[arg(long, default_value = "15m")]
    pub max_wait: String,

    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Also log to stderr, at debug level
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
