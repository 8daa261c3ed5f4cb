//! Query Orchestrator
//!
//! Drives one Logs Insights query from submission to a terminal status:
//! submit, then sleep-and-poll until the backend reports anything other than
//! `Scheduled` or `Running`. The most recent non-empty row set wins.
//!
//! The loop is bounded by [`PollSettings::max_wait`] and
//! [`PollSettings::max_polls`], retries transient poll failures with
//! exponential backoff, and stops between (or during) polls when the caller's
//! [`CancellationToken`] fires. The wait bound also covers a backend call that
//! never returns.

#![warn(clippy::all, rust_2018_idioms)]

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use super::client::QueryBackend;
use super::errors::QueryError;
use super::types::{
    PollSnapshot, QueryHandle, QueryOutcome, QueryRequest, QueryResult, QueryStatistics,
    QueryStatus,
};

/// Default wait between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
/// Default upper bound on how long one query may be polled
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(15 * 60);

/// Polling cadence, loop bound and transient retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait before every poll
    pub poll_interval: Duration,
    /// Give up once this much time has passed since submission (`None` = never)
    pub max_wait: Option<Duration>,
    /// Give up after this many poll calls (`None` = no limit)
    pub max_polls: Option<u32>,
    /// Consecutive `BackendUnavailable` poll failures tolerated before surfacing
    pub max_transient_retries: u32,
    /// First retry delay; doubles on every further attempt
    pub retry_backoff: Duration,
    /// Ceiling for the retry delay
    pub max_retry_backoff: Duration,
}

impl PollSettings {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_WAIT),
            max_polls: None,
            max_transient_retries: 3,
            retry_backoff: Duration::from_millis(500),
            max_retry_backoff: Duration::from_secs(10),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_transient_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.max_transient_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    /// Delay before retry number `attempt` (zero based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_backoff
            .saturating_mul(factor)
            .min(self.max_retry_backoff)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs queries against a [`QueryBackend`].
///
/// Cloning is cheap and every `run_query` call keeps its own loop state, so
/// one orchestrator can serve any number of concurrent queries.
#[derive(Clone)]
pub struct QueryOrchestrator {
    backend: Arc<dyn QueryBackend>,
    settings: PollSettings,
}

impl QueryOrchestrator {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self {
            backend,
            settings: PollSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Run a query to completion without external cancellation
    pub async fn run_query(&self, request: &QueryRequest) -> Result<QueryOutcome, QueryError> {
        self.run_query_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run a query to completion, stopping early when `cancel` fires
    pub async fn run_query_with_cancel(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome, QueryError> {
        let not_submitted = || QueryError::Cancelled {
            query_id: String::from("(not submitted)"),
        };
        if cancel.is_cancelled() {
            return Err(not_submitted());
        }

        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(not_submitted()),
            handle = self.backend.submit(request) => handle?,
        };

        if handle.is_missing() {
            tracing::warn!(
                log_group = request.log_group_name(),
                "Submission returned no query id; nothing to poll"
            );
            return Ok(QueryOutcome::no_query());
        }

        query_info!(
            handle,
            "Submitted query against {} ({}..{})",
            request.log_group_name(),
            request.start_time(),
            request.end_time()
        );

        let deadline = Deadline::after(self.settings.max_wait);
        let mut run = PollRun::default();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.abandon(&handle).await),
                _ = deadline.reached() => return Err(self.give_up(&handle, run.polls, &deadline).await),
                _ = sleep(self.settings.poll_interval) => {}
            }

            match self.poll_with_retry(&handle, cancel, &deadline, &mut run.polls).await {
                Ok(snapshot) => {
                    let status = run.absorb(snapshot);
                    if status.is_terminal() {
                        query_info!(
                            handle,
                            "Query finished with status {} after {} polls, {} rows",
                            status,
                            run.polls,
                            run.result.len()
                        );
                        return Ok(run.finish(handle, status));
                    }
                    query_debug!(handle, "Status {} after poll {}", status, run.polls);
                }
                Err(QueryError::MalformedResponse { message }) => {
                    query_warn!(
                        handle,
                        "Malformed poll response, keeping last {} rows: {}",
                        run.result.len(),
                        message
                    );
                    return Ok(run.finish(handle, QueryStatus::Unknown));
                }
                Err(QueryError::Cancelled { .. }) => return Err(self.abandon(&handle).await),
                Err(QueryError::PollTimeout { .. }) => {
                    return Err(self.give_up(&handle, run.polls, &deadline).await)
                }
                Err(err) => {
                    query_error!(handle, "Polling aborted ({}): {}", err.short_label(), err);
                    return Err(err);
                }
            }

            if self.out_of_polls(run.polls) {
                return Err(self.give_up(&handle, run.polls, &deadline).await);
            }
        }
    }

    /// One poll, retried with backoff while the failure is transient.
    ///
    /// Every wait races the cancellation token and the deadline. Retries count
    /// against `max_polls` like any other poll.
    async fn poll_with_retry(
        &self,
        handle: &QueryHandle,
        cancel: &CancellationToken,
        deadline: &Deadline,
        polls: &mut u32,
    ) -> Result<PollSnapshot, QueryError> {
        let mut attempt = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Self::cancelled(handle)),
                _ = deadline.reached() => return Err(Self::timed_out(handle, *polls, deadline)),
                result = self.backend.poll(handle) => result,
            };
            *polls += 1;

            match result {
                Err(err) if err.is_retryable() && attempt < self.settings.max_transient_retries => {
                    if self.out_of_polls(*polls) {
                        query_warn!(handle, "Poll limit reached while retrying: {}", err);
                        return Err(Self::timed_out(handle, *polls, deadline));
                    }

                    let delay = self.settings.backoff_for(attempt);
                    attempt += 1;
                    query_warn!(
                        handle,
                        "Transient poll failure, retry {}/{} in {:?}: {}",
                        attempt,
                        self.settings.max_transient_retries,
                        delay,
                        err
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Self::cancelled(handle)),
                        _ = deadline.reached() => return Err(Self::timed_out(handle, *polls, deadline)),
                        _ = sleep(delay) => {}
                    }
                }
                other => return other,
            }
        }
    }

    fn out_of_polls(&self, polls: u32) -> bool {
        self.settings.max_polls.is_some_and(|max| polls >= max)
    }

    fn cancelled(handle: &QueryHandle) -> QueryError {
        QueryError::Cancelled {
            query_id: handle.query_id().to_string(),
        }
    }

    fn timed_out(handle: &QueryHandle, polls: u32, deadline: &Deadline) -> QueryError {
        QueryError::PollTimeout {
            query_id: handle.query_id().to_string(),
            polls,
            elapsed: deadline.elapsed(),
        }
    }

    /// Loop bound hit: stop the backend query and report the timeout
    async fn give_up(&self, handle: &QueryHandle, polls: u32, deadline: &Deadline) -> QueryError {
        query_warn!(
            handle,
            "Query still running after {:?} and {} polls; giving up",
            deadline.elapsed(),
            polls
        );
        self.stop_quietly(handle).await;
        Self::timed_out(handle, polls, deadline)
    }

    /// Stop local polling and ask the backend to drop the query
    async fn abandon(&self, handle: &QueryHandle) -> QueryError {
        query_info!(handle, "Cancellation requested; stopping");
        self.stop_quietly(handle).await;
        Self::cancelled(handle)
    }

    async fn stop_quietly(&self, handle: &QueryHandle) {
        if let Err(err) = self.backend.stop(handle).await {
            query_warn!(handle, "Backend stop failed: {}", err);
        }
    }
}

/// Wall-clock bound of one query run, measured from submission
#[derive(Debug, Clone, Copy)]
struct Deadline {
    started: Instant,
    at: Option<Instant>,
}

impl Deadline {
    fn after(max_wait: Option<Duration>) -> Self {
        let started = Instant::now();
        Self {
            started,
            at: max_wait.and_then(|wait| started.checked_add(wait)),
        }
    }

    /// Resolves once the bound has passed; never resolves when unbounded
    async fn reached(&self) {
        match self.at {
            Some(at) => sleep_until(at).await,
            None => std::future::pending().await,
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Loop state of one query run
#[derive(Debug, Default)]
struct PollRun {
    polls: u32,
    result: QueryResult,
    statistics: Option<QueryStatistics>,
}

impl PollRun {
    /// Fold one snapshot into the run and return its status.
    ///
    /// Empty row sets never replace a previously seen non-empty one.
    fn absorb(&mut self, snapshot: PollSnapshot) -> QueryStatus {
        if !snapshot.result.is_empty() {
            self.result = snapshot.result;
        }
        if snapshot.statistics.is_some() {
            self.statistics = snapshot.statistics;
        }
        snapshot.status
    }

    fn finish(self, handle: QueryHandle, status: QueryStatus) -> QueryOutcome {
        QueryOutcome {
            handle: Some(handle),
            status: Some(status),
            result: self.result,
            statistics: self.statistics,
            polls: self.polls,
        }
    }
}
