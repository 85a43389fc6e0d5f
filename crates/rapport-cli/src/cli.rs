//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rapport - Run relationship scenarios against an in-memory service.
#[derive(Debug, Parser)]
#[command(name = "rapport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "RAPPORT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a scenario script and print each step plus the final status matrix
    Run(RunArgs),

    /// Validate a scenario script without running it
    Check(CheckArgs),
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Scenario script (TOML)
    pub script: PathBuf,

    /// Print command metrics after the run
    #[arg(short, long)]
    pub metrics: bool,
}

/// Arguments for the check command.
#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// Scenario script (TOML)
    pub script: PathBuf,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["rapport", "run", "scenario.toml", "--metrics"]);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.script, PathBuf::from("scenario.toml"));
                assert!(args.metrics);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "rapport",
            "check",
            "scenario.toml",
            "--format",
            "json",
            "--no-color",
            "--config",
            "rapport.toml",
        ]);
        assert!(matches!(cli.command, Command::Check(_)));
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        assert!(cli.no_color);
        assert_eq!(cli.config, Some(PathBuf::from("rapport.toml")));
    }

    #[test]
    fn test_script_is_required() {
        assert!(Cli::try_parse_from(["rapport", "run"]).is_err());
    }

    #[test]
    fn test_format_conversion() {
        let format: OutputFormat = CliFormat::Json.into();
        assert_eq!(format, OutputFormat::Json);
    }
}
