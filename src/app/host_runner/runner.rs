//! Resolves a CLI invocation into a query, runs it, and renders the outcome.
//!
//! This is the only place that reads the process environment or the clock.
//! Resolution ([`plan`], [`backend_config`], [`poll_settings`]) is pure so it
//! can be tested without AWS; [`execute`] takes any orchestrator and any
//! writers.

use anyhow::{Context, Result};
use chrono::Utc;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::cli::{CliArgs, OutputFormat};
use super::project_config::ProjectConfig;
use super::render;
use super::window::{parse_duration, parse_optional_duration, TimeWindow};
use crate::app::data_plane::logs_insights::{
    BackendConfig, CloudWatchLogsInsightsClient, PollSettings, QueryError, QueryOrchestrator,
    QueryRequest,
};

/// Preset looked up when `--query` is not given
pub const DEFAULT_PRESET: &str = "errors";
/// Query used when neither a preset nor a literal query applies
pub const DEFAULT_QUERY: &str = "fields @timestamp, @message | limit 20";

/// How an invocation ended, mapped to the process exit code by `main`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The query reached a terminal status (any of them)
    Finished,
    /// The user interrupted the run
    Interrupted,
}

/// Everything needed to build a [`QueryRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub log_group_name: String,
    pub query_string: String,
    pub window: TimeWindow,
    pub region: Option<String>,
}

impl QueryPlan {
    pub fn to_request(&self) -> Result<QueryRequest, QueryError> {
        let request = QueryRequest::new(
            self.log_group_name.clone(),
            self.query_string.clone(),
            self.window.start,
            self.window.end,
        )?;
        Ok(match &self.region {
            Some(region) => request.with_region(region.clone()),
            None => request,
        })
    }
}

/// Log group of a Lambda function
pub fn lambda_log_group(function_name: &str) -> String {
    format!("/aws/lambda/{}", function_name)
}

/// Preset named by `query` (or the default preset), else the literal query, else the default
pub fn resolve_query_string(project: &ProjectConfig, query: Option<&str>) -> String {
    let key = query.unwrap_or(DEFAULT_PRESET);
    project
        .query_preset(key)
        .or(query)
        .unwrap_or(DEFAULT_QUERY)
        .to_string()
}

/// Turn CLI flags and project configuration into a concrete query
pub fn plan(args: &CliArgs, project: &ProjectConfig, now: i64) -> Result<QueryPlan> {
    let log_group_name = match &args.log_group {
        Some(log_group) => log_group.clone(),
        None => lambda_log_group(
            &project.deployed_function_name(&args.function, args.stage.as_deref())?,
        ),
    };

    let length = parse_duration(&args.interval).context("Invalid --interval")?;
    let window = TimeWindow::ending_at(now, length)?;

    Ok(QueryPlan {
        log_group_name,
        query_string: resolve_query_string(project, args.query.as_deref()),
        window,
        region: args.region.clone().or_else(|| project.provider.region.clone()),
    })
}

/// Backend settings: CLI first, then project file, then the environment
pub fn backend_config<F>(args: &CliArgs, project: &ProjectConfig, env: F) -> BackendConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    BackendConfig {
        region: args
            .region
            .clone()
            .or_else(|| project.provider.region.clone())
            .or_else(|| non_empty("AWS_REGION"))
            .or_else(|| non_empty("AWS_DEFAULT_REGION")),
        profile: args.profile.clone().or_else(|| non_empty("AWS_PROFILE")),
        endpoint_url: non_empty("AWS_ENDPOINT_URL_LOGS"),
    }
}

pub fn poll_settings(args: &CliArgs) -> Result<PollSettings> {
    if args.poll_interval_ms == 0 {
        anyhow::bail!("--poll-interval-ms must be greater than zero");
    }
    let max_wait = parse_optional_duration(&args.max_wait).context("Invalid --max-wait")?;

    Ok(PollSettings::new()
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
        .with_max_wait(max_wait))
}

/// Run a planned query and write the outcome.
///
/// Rows go to `out`; status lines and warnings go to `status`. Non-`Complete`
/// terminal statuses are reported as a warning, not an error.
pub async fn execute<O, S>(
    orchestrator: &QueryOrchestrator,
    plan: &QueryPlan,
    format: OutputFormat,
    cancel: &CancellationToken,
    out: &mut O,
    status: &mut S,
) -> Result<RunStatus>
where
    O: Write,
    S: Write,
{
    let request = plan.to_request()?;

    writeln!(status, "Running query on {}", plan.log_group_name)?;

    let outcome = match orchestrator.run_query_with_cancel(&request, cancel).await {
        Ok(outcome) => outcome,
        Err(QueryError::Cancelled { query_id }) => {
            tracing::info!(query_id = %query_id, "Run interrupted by user");
            writeln!(status, "Interrupted.")?;
            return Ok(RunStatus::Interrupted);
        }
        Err(err) => return Err(err).context("Logs Insights query failed"),
    };

    if let Some(warning) = render::status_warning(&outcome) {
        writeln!(status, "{}", warning)?;
    }

    match format {
        OutputFormat::Text => {
            writeln!(status, "{}", render::summary_line(&outcome))?;
            render::render_text(&outcome, out)?;
        }
        OutputFormat::Json => render::render_json(&outcome, out)?,
    }

    Ok(RunStatus::Finished)
}

/// Full CLI flow against the live backend, with Ctrl-C cancellation
pub async fn run(args: CliArgs) -> Result<RunStatus> {
    let project = ProjectConfig::load(&args.config)?;
    let plan = plan(&args, &project, Utc::now().timestamp())?;
    let settings = poll_settings(&args)?;

    let config = backend_config(&args, &project, |key| std::env::var(key).ok());
    tracing::info!(
        "Resolved query: log_group={} window={}..{} region={:?}",
        plan.log_group_name,
        plan.window.start,
        plan.window.end,
        config.region
    );

    let client = CloudWatchLogsInsightsClient::connect(&config)
        .await
        .context("Failed to set up the CloudWatch Logs client")?;
    let orchestrator = QueryOrchestrator::new(Arc::new(client)).with_settings(settings);

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling query");
            ctrl_c_token.cancel();
        }
    });

    let result = execute(
        &orchestrator,
        &plan,
        args.output,
        &cancel,
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .await;

    ctrl_c.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["logs-insights", "-f", "api"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    fn project() -> ProjectConfig {
        ProjectConfig::from_toml_str(
            r#"
service = "orders"

[provider]
region = "eu-west-1"

[queries]
errors = "fields @timestamp, @message | filter @message like /ERROR/"
slow = "filter @duration > 1000"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_plan_defaults() {
        let plan = plan(&args(&[]), &project(), 1_700_000_000).unwrap();

        assert_eq!(plan.log_group_name, "/aws/lambda/orders-dev-api");
        assert_eq!(
            plan.query_string,
            "fields @timestamp, @message | filter @message like /ERROR/"
        );
        assert_eq!(plan.window.end, 1_700_000_000);
        assert_eq!(plan.window.start, 1_700_000_000 - 3600);
        assert_eq!(plan.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_plan_overrides() {
        let plan = plan(
            &args(&["-q", "slow", "-i", "30m", "-s", "prod", "-r", "us-east-1"]),
            &project(),
            10_000,
        )
        .unwrap();

        assert_eq!(plan.log_group_name, "/aws/lambda/orders-prod-api");
        assert_eq!(plan.query_string, "filter @duration > 1000");
        assert_eq!(plan.window, TimeWindow { start: 8_200, end: 10_000 });
        assert_eq!(plan.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_plan_log_group_override_skips_name_resolution() {
        let plan = plan(
            &args(&["--log-group", "/custom/group"]),
            &ProjectConfig::default(),
            10_000,
        )
        .unwrap();
        assert_eq!(plan.log_group_name, "/custom/group");
        assert_eq!(plan.query_string, DEFAULT_QUERY);
    }

    #[test]
    fn test_plan_rejects_bad_interval() {
        assert!(plan(&args(&["-i", "soon"]), &project(), 10_000).is_err());
    }

    #[test]
    fn test_resolve_query_string() {
        let project = project();

        assert_eq!(
            resolve_query_string(&project, Some("fields @message | limit 5")),
            "fields @message | limit 5"
        );
        assert_eq!(resolve_query_string(&project, Some("slow")), "filter @duration > 1000");
        assert_eq!(resolve_query_string(&ProjectConfig::default(), None), DEFAULT_QUERY);
    }

    #[test]
    fn test_backend_config_precedence() {
        let env: HashMap<&str, &str> = [
            ("AWS_REGION", "ap-southeast-2"),
            ("AWS_PROFILE", "from-env"),
            ("AWS_ENDPOINT_URL_LOGS", "http://localhost:4566"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let config = backend_config(&args(&[]), &ProjectConfig::default(), lookup);
        assert_eq!(config.region.as_deref(), Some("ap-southeast-2"));
        assert_eq!(config.profile.as_deref(), Some("from-env"));
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));

        let config = backend_config(&args(&[]), &project(), lookup);
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));

        let config = backend_config(&args(&["-r", "us-west-2", "--profile", "cli"]), &project(), lookup);
        assert_eq!(config.region.as_deref(), Some("us-west-2"));
        assert_eq!(config.profile.as_deref(), Some("cli"));
    }

    #[test]
    fn test_backend_config_ignores_blank_env() {
        let config = backend_config(&args(&[]), &ProjectConfig::default(), |key| match key {
            "AWS_REGION" => Some(String::new()),
            "AWS_DEFAULT_REGION" => Some("eu-central-1".to_string()),
            _ => None,
        });
        assert_eq!(config.region.as_deref(), Some("eu-central-1"));
    }

    #[test]
    fn test_poll_settings_from_args() {
        let settings = poll_settings(&args(&["--poll-interval-ms", "250", "--max-wait", "none"])).unwrap();
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.max_wait, None);

        assert!(poll_settings(&args(&["--poll-interval-ms", "0"])).is_err());
        assert!(poll_settings(&args(&["--max-wait", "forever"])).is_err());
    }
}
