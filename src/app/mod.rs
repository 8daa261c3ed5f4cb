//! Application modules for logs-insights.
//!
//! # Module Organization
//!
//! - [`data_plane`] - query services that read data inside AWS resources
//! - [`host_runner`] - command line front end that resolves configuration and renders results
//!
//! [`host_runner`] depends on [`data_plane`], never the other way round.

pub mod data_plane;
pub mod host_runner;
