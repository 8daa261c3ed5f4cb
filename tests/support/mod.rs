//! Scripted query backend shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

use logs_insights::app::data_plane::logs_insights::{
    PollSnapshot, QueryBackend, QueryError, QueryHandle, QueryRequest, QueryStatus, ResultField,
    ResultRow,
};

/// Backend whose answers are scripted per log group (submit) and per query id (poll).
///
/// A poll script that runs dry keeps answering `Running` with no rows, which
/// models a backend stuck in a non-terminal state.
#[derive(Default)]
pub struct ScriptedBackend {
    submissions: Mutex<HashMap<String, Result<QueryHandle, QueryError>>>,
    scripts: Mutex<HashMap<String, VecDeque<Result<PollSnapshot, QueryError>>>>,
    submitted: Mutex<Vec<QueryRequest>>,
    polls: Mutex<Vec<(String, Instant)>>,
    stops: Mutex<Vec<String>>,
    stall_submits: bool,
    stall_polls: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer submissions for `log_group` with `result`
    pub fn on_submit(self, log_group: &str, result: Result<QueryHandle, QueryError>) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .insert(log_group.to_string(), result);
        self
    }

    /// Answer polls of `query_id` with `answers`, in order
    pub fn script(self, query_id: &str, answers: Vec<Result<PollSnapshot, QueryError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(query_id.to_string(), answers.into_iter().collect());
        self
    }

    /// Submissions are recorded but never answered
    pub fn stall_submits(mut self) -> Self {
        self.stall_submits = true;
        self
    }

    /// Polls are recorded but never answered
    pub fn stall_polls(mut self) -> Self {
        self.stall_polls = true;
        self
    }

    pub fn submitted(&self) -> Vec<QueryRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn poll_count(&self, query_id: &str) -> usize {
        self.polls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == query_id)
            .count()
    }

    pub fn total_polls(&self) -> usize {
        self.polls.lock().unwrap().len()
    }

    /// When each poll of `query_id` happened
    pub fn poll_times(&self, query_id: &str) -> Vec<Instant> {
        self.polls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == query_id)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn stops(&self) -> Vec<String> {
        self.stops.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn submit(&self, request: &QueryRequest) -> Result<QueryHandle, QueryError> {
        self.submitted.lock().unwrap().push(request.clone());
        if self.stall_submits {
            return std::future::pending().await;
        }
        self.submissions
            .lock()
            .unwrap()
            .get(request.log_group_name())
            .cloned()
            .unwrap_or_else(|| Err(QueryError::invalid_request("log group not scripted")))
    }

    async fn poll(&self, handle: &QueryHandle) -> Result<PollSnapshot, QueryError> {
        self.polls
            .lock()
            .unwrap()
            .push((handle.query_id().to_string(), Instant::now()));
        if self.stall_polls {
            return std::future::pending().await;
        }

        self.scripts
            .lock()
            .unwrap()
            .get_mut(handle.query_id())
            .and_then(|answers| answers.pop_front())
            .unwrap_or_else(|| Ok(PollSnapshot::new(QueryStatus::Running, Vec::new())))
    }

    async fn stop(&self, handle: &QueryHandle) -> Result<(), QueryError> {
        self.stops
            .lock()
            .unwrap()
            .push(handle.query_id().to_string());
        Ok(())
    }
}

pub fn row(timestamp: &str, message: &str) -> ResultRow {
    vec![
        ResultField::new("@timestamp", timestamp),
        ResultField::new("@message", message),
    ]
    .into_iter()
    .collect()
}

pub fn snapshot(status: QueryStatus, rows: Vec<ResultRow>) -> Result<PollSnapshot, QueryError> {
    Ok(PollSnapshot::new(status, rows))
}

pub fn request(log_group: &str) -> QueryRequest {
    QueryRequest::new(log_group, "fields @timestamp, @message | limit 20", 1000, 2000).unwrap()
}
