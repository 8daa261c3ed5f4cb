//! Project configuration file.
//!
//! A small TOML file describing the deployed service: its name, the default
//! region and stage, per-function deployed names, and named query presets.
//!
//! ```toml
//! service = "orders"
//!
//! [provider]
//! region = "eu-west-1"
//! stage = "prod"
//!
//! [functions.api]
//! name = "orders-api-handler"
//!
//! [queries]
//! errors = "fields @timestamp, @message | filter @message like /ERROR/ | sort @timestamp desc | limit 50"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Stage used when neither the CLI nor the file names one
pub const DEFAULT_STAGE: &str = "dev";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Service name, used to derive deployed function names
    pub service: Option<String>,
    pub provider: ProviderConfig,
    pub functions: BTreeMap<String, FunctionConfig>,
    /// Named query presets
    pub queries: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub region: Option<String>,
    pub stage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FunctionConfig {
    /// Deployed function name, when it differs from `<service>-<stage>-<key>`
    pub name: Option<String>,
}

impl ProjectConfig {
    /// Load the file at `path`. A missing file yields an empty configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No project configuration at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project configuration {:?}", path))?;

        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse project configuration {:?}", path))?;

        tracing::info!(
            "Loaded project configuration from {:?}: {} functions, {} query presets",
            path,
            config.functions.len(),
            config.queries.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Stage to use, preferring an explicit override
    pub fn stage<'a>(&'a self, stage_override: Option<&'a str>) -> &'a str {
        stage_override
            .or(self.provider.stage.as_deref())
            .unwrap_or(DEFAULT_STAGE)
    }

    /// Deployed Lambda name for a function key.
    ///
    /// An explicit `functions.<key>.name` wins; otherwise the name is
    /// `<service>-<stage>-<key>`.
    pub fn deployed_function_name(&self, function: &str, stage_override: Option<&str>) -> Result<String> {
        if let Some(name) = self
            .functions
            .get(function)
            .and_then(|f| f.name.as_deref())
            .filter(|name| !name.trim().is_empty())
        {
            return Ok(name.to_string());
        }

        let Some(service) = self.service.as_deref().filter(|s| !s.trim().is_empty()) else {
            bail!(
                "Cannot derive the deployed name of function '{}': set `service` or `functions.{}.name` in the project configuration",
                function,
                function
            );
        };

        Ok(format!("{}-{}-{}", service, self.stage(stage_override), function))
    }

    pub fn query_preset(&self, key: &str) -> Option<&str> {
        self.queries.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SAMPLE: &str = r#"
service = "orders"

[provider]
region = "eu-west-1"
stage = "prod"

[functions.api]
name = "orders-api-handler"

[functions.worker]

[queries]
errors = "fields @timestamp, @message | filter @message like /ERROR/"
"#;

    #[test]
    fn test_parse_sample() {
        let config = ProjectConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.service.as_deref(), Some("orders"));
        assert_eq!(config.provider.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.functions.len(), 2);
        assert_eq!(
            config.query_preset("errors"),
            Some("fields @timestamp, @message | filter @message like /ERROR/")
        );
    }

    #[test]
    fn test_deployed_function_name() {
        let config = ProjectConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.deployed_function_name("api", None).unwrap(), "orders-api-handler");
        assert_eq!(config.deployed_function_name("worker", None).unwrap(), "orders-prod-worker");
        assert_eq!(
            config.deployed_function_name("worker", Some("staging")).unwrap(),
            "orders-staging-worker"
        );
        assert_eq!(config.deployed_function_name("cron", None).unwrap(), "orders-prod-cron");
    }

    #[test]
    fn test_stage_defaults_to_dev() {
        let config = ProjectConfig::from_toml_str(r#"service = "svc""#).unwrap();
        assert_eq!(config.deployed_function_name("fn", None).unwrap(), "svc-dev-fn");
    }

    #[test]
    fn test_missing_service_is_an_error() {
        let config = ProjectConfig::default();
        let err = config.deployed_function_name("fn", None).unwrap_err();
        assert!(err.to_string().contains("functions.fn.name"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(ProjectConfig::from_toml_str("servce = \"typo\"").is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ProjectConfig::load(file.path()).unwrap();
        assert_eq!(config.service.as_deref(), Some("orders"));
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"service = [").unwrap();

        let err = ProjectConfig::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse project configuration"));
    }
}
