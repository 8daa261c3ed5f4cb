//! Logs Insights Data Types
//!
//! Data structures for Logs Insights query requests, handles, statuses and results.

#![warn(clippy::all, rust_2018_idioms)]

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::QueryError;

/// Field name CloudWatch uses for the event timestamp
pub const TIMESTAMP_FIELD: &str = "@timestamp";
/// Field name CloudWatch uses for the raw log line
pub const MESSAGE_FIELD: &str = "@message";

/// A query definition ready to be submitted.
///
/// Construction validates the time window, so a `QueryRequest` that exists is
/// always dispatchable. Times are Unix epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    log_group_name: String,
    query_string: String,
    start_time: i64,
    end_time: i64,
    region: Option<String>,
}

impl QueryRequest {
    /// Create a new request, rejecting empty targets and inverted time windows
    pub fn new(
        log_group_name: impl Into<String>,
        query_string: impl Into<String>,
        start_time: i64,
        end_time: i64,
    ) -> Result<Self, QueryError> {
        let request = Self {
            log_group_name: log_group_name.into(),
            query_string: query_string.into(),
            start_time,
            end_time,
            region: None,
        };
        request.validate()?;
        Ok(request)
    }

    /// Pin the request to a region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Check the request invariants
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.log_group_name.trim().is_empty() {
            return Err(QueryError::invalid_request("log group name is empty"));
        }
        if self.query_string.trim().is_empty() {
            return Err(QueryError::invalid_request("query string is empty"));
        }
        if self.start_time >= self.end_time {
            return Err(QueryError::invalid_request(format!(
                "start time {} must be before end time {}",
                self.start_time, self.end_time
            )));
        }
        Ok(())
    }

    pub fn log_group_name(&self) -> &str {
        &self.log_group_name
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// Identifies one submitted query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryHandle {
    query_id: String,
}

impl QueryHandle {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
        }
    }

    /// Handle for a submission whose response carried no query id
    pub fn missing() -> Self {
        Self {
            query_id: String::new(),
        }
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// True when the backend gave us nothing to poll
    pub fn is_missing(&self) -> bool {
        self.query_id.trim().is_empty()
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query_id)
    }
}

/// Execution status of a query as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryStatus {
    Scheduled,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
    Unknown,
}

impl QueryStatus {
    /// Parse a wire status. Anything unrecognised, including an empty value, is `Unknown`.
    pub fn from_wire(value: &str) -> Self {
        match value.trim() {
            "Scheduled" => QueryStatus::Scheduled,
            "Running" => QueryStatus::Running,
            "Complete" => QueryStatus::Complete,
            "Failed" => QueryStatus::Failed,
            "Cancelled" => QueryStatus::Cancelled,
            "Timeout" => QueryStatus::Timeout,
            _ => QueryStatus::Unknown,
        }
    }

    /// Whether the polling loop stops on this status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, QueryStatus::Scheduled | QueryStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Scheduled => "Scheduled",
            QueryStatus::Running => "Running",
            QueryStatus::Complete => "Complete",
            QueryStatus::Failed => "Failed",
            QueryStatus::Cancelled => "Cancelled",
            QueryStatus::Timeout => "Timeout",
            QueryStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named value inside a result row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultField {
    pub field: String,
    pub value: String,
}

impl ResultField {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// One matched log record: fields in backend order, names unique
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRow {
    fields: Vec<ResultField>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Returns false and keeps the first value if the name is already present.
    pub fn push(&mut self, field: ResultField) -> bool {
        if self.get(&field.field).is_some() {
            return false;
        }
        self.fields.push(field);
        true
    }

    /// Look a field up by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.field == name)
            .map(|f| f.value.as_str())
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.get(TIMESTAMP_FIELD)
    }

    pub fn message(&self) -> Option<&str> {
        self.get(MESSAGE_FIELD)
    }

    pub fn fields(&self) -> &[ResultField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<ResultField> for ResultRow {
    fn from_iter<I: IntoIterator<Item = ResultField>>(iter: I) -> Self {
        let mut row = ResultRow::new();
        for field in iter {
            row.push(field);
        }
        row
    }
}

/// Rows of a query in the order the backend returned them
pub type QueryResult = Vec<ResultRow>;

/// Statistics about a Logs Insights query
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStatistics {
    /// Number of records that matched the query
    pub records_matched: f64,
    /// Total number of records scanned
    pub records_scanned: f64,
    /// Bytes scanned during the query
    pub bytes_scanned: f64,
}

impl QueryStatistics {
    pub fn new(records_matched: f64, records_scanned: f64, bytes_scanned: f64) -> Self {
        Self {
            records_matched,
            records_scanned,
            bytes_scanned,
        }
    }
}

/// What one poll of the backend returned
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    pub status: QueryStatus,
    pub result: QueryResult,
    pub statistics: Option<QueryStatistics>,
}

impl PollSnapshot {
    pub fn new(status: QueryStatus, result: QueryResult) -> Self {
        Self {
            status,
            result,
            statistics: None,
        }
    }

    pub fn with_statistics(mut self, statistics: QueryStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }
}

/// Final outcome of one query run.
///
/// `status` is `None` only when the submission produced no query id and
/// nothing was polled. Non-`Complete` terminal statuses are reported here
/// rather than as errors so the caller can decide how to treat them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub handle: Option<QueryHandle>,
    pub status: Option<QueryStatus>,
    pub result: QueryResult,
    pub statistics: Option<QueryStatistics>,
    pub polls: u32,
}

impl QueryOutcome {
    /// Outcome for a submission that yielded no query id
    pub fn no_query() -> Self {
        Self {
            handle: None,
            status: None,
            result: Vec::new(),
            statistics: None,
            polls: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == Some(QueryStatus::Complete)
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    pub fn into_result(self) -> QueryResult {
        self.result
    }
}
