//! Rapport CLI library.
//!
//! This library provides the scenario runner behind the `rapport` binary:
//! configuration loading, scenario scripts, execution against the in-memory
//! relationship service, and output formatting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod runner;
pub mod script;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
pub use runner::{RunReport, ScenarioRunner};
pub use script::{Scenario, Script};
