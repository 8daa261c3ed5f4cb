//! Logs Insights Integration Module
//!
//! Runs CloudWatch Logs Insights queries end to end: submit a query, poll
//! until it reaches a terminal status, and hand back the rows.
//!
//! ## Features
//!
//! - Typed request, handle, status and row model
//! - Backend trait with a live `aws-sdk-cloudwatchlogs` implementation
//! - Bounded, cancellable polling with retry of transient failures
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use logs_insights::app::data_plane::logs_insights::{
//!     BackendConfig, CloudWatchLogsInsightsClient, QueryOrchestrator, QueryRequest,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = CloudWatchLogsInsightsClient::connect(&BackendConfig::new().with_region("us-east-1")).await?;
//! let orchestrator = QueryOrchestrator::new(Arc::new(client));
//!
//! let request = QueryRequest::new(
//!     "/aws/lambda/my-function",
//!     "fields @timestamp, @message | limit 20",
//!     1_700_000_000,
//!     1_700_003_600,
//! )?;
//!
//! let outcome = orchestrator.run_query(&request).await?;
//! for row in &outcome.result {
//!     println!("{}  {}", row.timestamp().unwrap_or(""), row.message().unwrap_or(""));
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod client;
pub mod errors;
pub mod orchestrator;
pub mod types;

// Re-export commonly used types
pub use client::{BackendConfig, CloudWatchLogsInsightsClient, QueryBackend};
pub use errors::{BackendOperation, QueryError};
pub use orchestrator::{PollSettings, QueryOrchestrator, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL};
pub use types::{
    PollSnapshot, QueryHandle, QueryOutcome, QueryRequest, QueryResult, QueryStatistics,
    QueryStatus, ResultField, ResultRow, MESSAGE_FIELD, TIMESTAMP_FIELD,
};
