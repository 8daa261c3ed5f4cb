//! Logs Insights Client Wrapper
//!
//! Typed call surface over the CloudWatch Logs Insights query API. The
//! orchestrator only sees the [`QueryBackend`] trait; the live implementation
//! is [`CloudWatchLogsInsightsClient`].

#![warn(clippy::all, rust_2018_idioms)]

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatchlogs as cloudwatchlogs;
use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_types::region::Region;

use super::errors::{
    categorize_error_string, classify_service_error, mentions_auth, BackendOperation, QueryError,
};
use super::types::{
    PollSnapshot, QueryHandle, QueryRequest, QueryResult, QueryStatistics, QueryStatus,
    ResultField, ResultRow,
};

/// Operations the orchestrator needs from a query service.
///
/// Implementations keep no per-query state between calls and never retry.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Start a query and return its handle
    async fn submit(&self, request: &QueryRequest) -> Result<QueryHandle, QueryError>;

    /// Fetch the current status and whatever rows the backend has so far
    async fn poll(&self, handle: &QueryHandle) -> Result<PollSnapshot, QueryError>;

    /// Ask the backend to stop a running query. Best effort.
    async fn stop(&self, _handle: &QueryHandle) -> Result<(), QueryError> {
        Ok(())
    }
}

/// Where and as whom to reach the backend.
///
/// Built once at the process boundary and handed to the client; nothing in
/// the query path reads the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    /// AWS region; falls back to the SDK provider chain when `None`
    pub region: Option<String>,
    /// Named profile from the shared AWS config files
    pub profile: Option<String>,
    /// Endpoint override, mostly for local emulators
    pub endpoint_url: Option<String>,
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }
}

/// CloudWatch Logs Insights client wrapper
#[derive(Clone)]
pub struct CloudWatchLogsInsightsClient {
    client: cloudwatchlogs::Client,
    region: String,
}

impl CloudWatchLogsInsightsClient {
    /// Resolve credentials and region and build the SDK client
    pub async fn connect(config: &BackendConfig) -> Result<Self, QueryError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        let sdk_config = loader.load().await;

        let region = sdk_config.region().map(|r| r.to_string()).ok_or_else(|| {
            QueryError::auth_failure(
                "no AWS region resolved; pass --region, set provider.region or AWS_REGION",
            )
        })?;

        if sdk_config.credentials_provider().is_none() {
            return Err(QueryError::auth_failure(format!(
                "no AWS credentials provider available for region {}",
                region
            )));
        }

        tracing::debug!(region = %region, profile = ?config.profile, "Created Logs Insights client");

        Ok(Self {
            client: cloudwatchlogs::Client::new(&sdk_config),
            region,
        })
    }

    /// Region every call of this client goes to
    pub fn region(&self) -> &str {
        &self.region
    }

    fn check_region(&self, request: &QueryRequest) -> Result<(), QueryError> {
        match request.region() {
            Some(region) if region != self.region => Err(QueryError::invalid_request(format!(
                "request targets region {} but the client is configured for {}",
                region, self.region
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl QueryBackend for CloudWatchLogsInsightsClient {
    async fn submit(&self, request: &QueryRequest) -> Result<QueryHandle, QueryError> {
        request.validate()?;
        self.check_region(request)?;

        let response = self
            .client
            .start_query()
            .log_group_name(request.log_group_name())
            .query_string(request.query_string())
            .start_time(request.start_time())
            .end_time(request.end_time())
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, BackendOperation::StartQuery, None))?;

        match response.query_id {
            Some(query_id) if !query_id.trim().is_empty() => Ok(QueryHandle::new(query_id)),
            _ => {
                tracing::warn!(
                    log_group = request.log_group_name(),
                    "StartQuery returned no query id"
                );
                Ok(QueryHandle::missing())
            }
        }
    }

    async fn poll(&self, handle: &QueryHandle) -> Result<PollSnapshot, QueryError> {
        let query_id = handle.query_id();

        let response = self
            .client
            .get_query_results()
            .query_id(query_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, BackendOperation::GetQueryResults, Some(query_id)))?;

        let status = match response.status.as_ref() {
            Some(status) => QueryStatus::from_wire(status.as_str()),
            None => {
                query_warn!(query_id, "GetQueryResults returned no status; treating as Unknown");
                QueryStatus::Unknown
            }
        };

        let result = convert_rows(response.results.unwrap_or_default(), query_id)?;

        let mut snapshot = PollSnapshot::new(status, result);
        if let Some(stats) = response.statistics {
            snapshot = snapshot.with_statistics(QueryStatistics::new(
                stats.records_matched,
                stats.records_scanned,
                stats.bytes_scanned,
            ));
        }

        Ok(snapshot)
    }

    async fn stop(&self, handle: &QueryHandle) -> Result<(), QueryError> {
        let query_id = handle.query_id();

        self.client
            .stop_query()
            .query_id(query_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, BackendOperation::StopQuery, Some(query_id)))?;

        query_info!(query_id, "Requested backend stop");
        Ok(())
    }
}

/// Convert SDK rows to our types, keeping backend order.
///
/// A field without a name makes the whole response malformed. Duplicate names
/// keep the first value.
fn convert_rows(
    rows: Vec<Vec<cloudwatchlogs::types::ResultField>>,
    query_id: &str,
) -> Result<QueryResult, QueryError> {
    let mut result = Vec::with_capacity(rows.len());

    for (index, aws_row) in rows.into_iter().enumerate() {
        let mut row = ResultRow::new();
        for aws_field in aws_row {
            let name = match aws_field.field {
                Some(name) if !name.is_empty() => name,
                _ => {
                    return Err(QueryError::malformed_response(format!(
                        "row {} of query {} has a field without a name",
                        index, query_id
                    )))
                }
            };
            let value = aws_field.value.unwrap_or_default();
            if !row.push(ResultField::new(name.clone(), value)) {
                query_warn!(query_id, "Row {} repeats field {}; keeping the first value", index, name);
            }
        }
        result.push(row);
    }

    Ok(result)
}

/// Map an SDK failure onto the query error taxonomy
fn classify_sdk_error<E, R>(
    err: SdkError<E, R>,
    operation: BackendOperation,
    query_id: Option<&str>,
) -> QueryError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = format!("{} failed: {}", operation.as_str(), DisplayErrorContext(&err));
    // Display text of the causes only; the Debug rendering in `detail` always
    // mentions a connection.
    let cause = source_chain(&err);

    let classified = match &err {
        SdkError::ServiceError(_) => {
            let code = err.as_service_error().and_then(|e| e.code());
            classify_service_error(code, &detail, operation, query_id)
        }
        SdkError::TimeoutError(_) => QueryError::backend_unavailable(detail),
        SdkError::DispatchFailure(dispatch_err) => {
            if mentions_auth(&cause) {
                QueryError::auth_failure(detail)
            } else if dispatch_err.is_user() {
                QueryError::invalid_request(detail)
            } else {
                QueryError::backend_unavailable(detail)
            }
        }
        SdkError::ResponseError(_) => QueryError::malformed_response(detail),
        SdkError::ConstructionFailure(_) => {
            if mentions_auth(&cause) {
                QueryError::auth_failure(detail)
            } else {
                QueryError::invalid_request(detail)
            }
        }
        _ => categorize_error_string(&detail),
    };

    tracing::debug!(
        operation = operation.as_str(),
        kind = classified.short_label(),
        "Classified backend error"
    );

    classified
}

/// Join the Display text of every source below `err`
fn source_chain(err: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
