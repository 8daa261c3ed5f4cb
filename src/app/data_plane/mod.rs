//! Data Plane Services Module
//!
//! Data plane services query data held inside AWS resources, as opposed to
//! managing the resources themselves.
//!
//! ## Available Services
//!
//! - **Logs Insights**: run analytics queries over CloudWatch log groups

pub mod logs_insights;

pub use logs_insights::{
    CloudWatchLogsInsightsClient, QueryError as LogsInsightsError,
    QueryOrchestrator as LogsInsightsOrchestrator, QueryOutcome as LogsInsightsOutcome,
};
