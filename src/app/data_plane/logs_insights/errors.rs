//! Query error taxonomy and AWS SDK error classification.
//!
//! Every failure the client or orchestrator can report is a [`QueryError`].
//! SDK errors are mapped here and nowhere else: structured AWS error codes
//! first, message patterns as a fallback for codes we do not know.

use std::time::Duration;
use thiserror::Error;

/// Failures of a Logs Insights query run
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The service could not be reached or is temporarily unable to answer
    #[error("query backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// The backend (or local validation) rejected the query or its time range
    #[error("invalid query request: {message}")]
    InvalidRequest { message: String },

    /// Credentials or region could not be resolved, or access was denied
    #[error("authentication failed: {message}")]
    AuthFailure { message: String },

    /// The backend no longer recognises the query id
    #[error("query id '{query_id}' is not recognised by the backend")]
    UnknownQueryId { query_id: String },

    /// The backend answered with something we could not interpret
    #[error("malformed backend response: {message}")]
    MalformedResponse { message: String },

    /// The query never reached a terminal status within the configured bound
    #[error("query {query_id} did not finish after {polls} polls ({elapsed:?})")]
    PollTimeout {
        query_id: String,
        polls: u32,
        elapsed: Duration,
    },

    /// Polling was cancelled by the caller
    #[error("query {query_id} was cancelled before it finished")]
    Cancelled { query_id: String },
}

impl QueryError {
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        QueryError::BackendUnavailable {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        QueryError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn auth_failure(message: impl Into<String>) -> Self {
        QueryError::AuthFailure {
            message: message.into(),
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        QueryError::MalformedResponse {
            message: message.into(),
        }
    }

    /// Only transport-level failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::BackendUnavailable { .. })
    }

    /// Short label for log lines
    pub fn short_label(&self) -> &'static str {
        match self {
            QueryError::BackendUnavailable { .. } => "unavailable",
            QueryError::InvalidRequest { .. } => "invalid",
            QueryError::AuthFailure { .. } => "auth",
            QueryError::UnknownQueryId { .. } => "unknown-query",
            QueryError::MalformedResponse { .. } => "malformed",
            QueryError::PollTimeout { .. } => "poll-timeout",
            QueryError::Cancelled { .. } => "cancelled",
        }
    }
}

/// Which backend call produced an error. Decides how "not found" is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOperation {
    StartQuery,
    GetQueryResults,
    StopQuery,
}

impl BackendOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendOperation::StartQuery => "StartQuery",
            BackendOperation::GetQueryResults => "GetQueryResults",
            BackendOperation::StopQuery => "StopQuery",
        }
    }
}

/// Map an AWS error code (when the service sent one) to a [`QueryError`].
///
/// `query_id` is used for `ResourceNotFoundException` on the polling calls,
/// where the missing resource is the query itself.
pub fn classify_service_error(
    code: Option<&str>,
    message: &str,
    operation: BackendOperation,
    query_id: Option<&str>,
) -> QueryError {
    let message = truncate_message(message, 300);

    match code {
        Some("MalformedQueryException") | Some("InvalidParameterException") => {
            QueryError::invalid_request(message)
        }
        Some("ResourceNotFoundException") => match (operation, query_id) {
            (BackendOperation::StartQuery, _) | (_, None) => QueryError::invalid_request(message),
            (_, Some(id)) => QueryError::UnknownQueryId {
                query_id: id.to_string(),
            },
        },
        Some("ServiceUnavailableException")
        | Some("LimitExceededException")
        | Some("ThrottlingException")
        | Some("InternalFailure") => QueryError::backend_unavailable(message),
        Some("AccessDeniedException")
        | Some("UnrecognizedClientException")
        | Some("ExpiredTokenException")
        | Some("InvalidClientTokenId")
        | Some("SignatureDoesNotMatch") => QueryError::auth_failure(message),
        _ => categorize_error_string(&message),
    }
}

/// Categorize an error by its text when no known code is available.
///
/// This handles the common patterns seen in AWS SDK error messages.
pub fn categorize_error_string(error_str: &str) -> QueryError {
    let message = truncate_message(error_str, 300);

    // Credential chain failures often mention the connection they ran over.
    if mentions_auth(error_str) {
        return QueryError::auth_failure(message);
    }

    if error_str.contains("Throttling")
        || error_str.contains("TooManyRequestsException")
        || error_str.contains("LimitExceeded")
        || error_str.contains("RateExceeded")
        || error_str.contains("ServiceUnavailable")
        || error_str.contains("InternalServerError")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("DispatchFailure")
        || error_str.contains("connection")
        || error_str.contains("Connection")
        || error_str.contains("dns")
        || error_str.contains("DNS")
    {
        return QueryError::backend_unavailable(message);
    }

    if error_str.contains("MalformedQuery")
        || error_str.contains("InvalidParameter")
        || error_str.contains("ValidationException")
    {
        return QueryError::invalid_request(message);
    }

    QueryError::backend_unavailable(message)
}

/// Whether an error text points at credentials or identity rather than transport
pub fn mentions_auth(error_str: &str) -> bool {
    error_str.contains("AccessDenied")
        || error_str.contains("UnrecognizedClient")
        || error_str.contains("ExpiredToken")
        || error_str.contains("credential")
        || error_str.contains("Credential")
        || error_str.contains("region")
}

/// Truncate message to max length
fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.chars().count() <= max_len {
        msg.to_string()
    } else {
        let cut: String = msg.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
