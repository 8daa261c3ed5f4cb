//! Host runner: the `logs-insights` command line front end.
//!
//! Resolves which log group to query and over which window from CLI flags and
//! the project configuration file, builds the backend configuration from the
//! environment, runs the query through the orchestrator, and renders rows.

pub mod cli;
pub mod project_config;
pub mod render;
pub mod runner;
pub mod window;

pub use cli::{CliArgs, OutputFormat};
pub use project_config::ProjectConfig;
pub use runner::{execute, plan, run, QueryPlan, RunStatus};
