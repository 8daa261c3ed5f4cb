//! logs-insights - CloudWatch Logs Insights queries for deployed Lambda functions
//!
//! Submits a Logs Insights query against a function's log group, polls the
//! query until the backend reports a terminal status, and prints the rows as a
//! time-ordered text stream.
//!
//! # Architecture Overview
//!
//! - **Query core** ([`app::data_plane::logs_insights`]): typed request and
//!   result model, the [`QueryBackend`](app::data_plane::logs_insights::QueryBackend)
//!   trait with its `aws-sdk-cloudwatchlogs` implementation, and the
//!   [`QueryOrchestrator`](app::data_plane::logs_insights::QueryOrchestrator)
//!   that owns the submit/poll/terminate loop.
//! - **Host runner** ([`app::host_runner`]): CLI flags, project configuration,
//!   log group and time window resolution, and rendering. Everything that reads
//!   the process environment lives here.
//!
//! The core never reads environment variables or prints; the host runner never
//! talks to AWS directly.

#![warn(clippy::all, rust_2018_idioms)]

// Include logging macros first
#[macro_use]
pub mod logging_macros;

pub mod app;
