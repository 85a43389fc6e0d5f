//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use crate::runner::{RunReport, StepOutcome};
use crate::script::Scenario;
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the report of a scenario run.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Table => Ok(self.format_report_table(report)),
        }
    }

    fn format_report_table(&self, report: &RunReport) -> String {
        let mut sections = Vec::new();

        if let Some(name) = &report.name {
            sections.push(self.info(name));
        }

        if report.steps.is_empty() {
            sections.push(self.colorize("No steps to run.", "yellow"));
        } else {
            sections.push(steps_table(report));
        }

        sections.push(matrix_table(report));

        if let Some(violation) = &report.invariant_violation {
            sections.push(self.error(violation));
        }

        let failed = report.failed_expectations();
        if failed > 0 {
            sections.push(self.warning(&format!("{} expectation(s) not met", failed)));
        } else {
            sections.push(self.success(&format!(
                "{} step(s) run: {} completed, {} no-op, {} rejected",
                report.steps.len(),
                report.metrics.completed,
                report.metrics.no_ops,
                report.metrics.rejected
            )));
        }

        sections.join("\n\n")
    }

    /// Format the result of validating a script.
    pub fn format_check(&self, scenario: &Scenario) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "valid": true,
                    "name": scenario.name,
                    "accounts": scenario.accounts,
                    "steps": scenario.steps.len(),
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Table => Ok(self.success(&format!(
                "Script OK: {} account(s), {} step(s)",
                scenario.accounts.len(),
                scenario.steps.len()
            ))),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn steps_table(report: &RunReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(["#", "Actor", "Action", "Subject", "Result", "Expected"]);

    for step in &report.steps {
        let result = match &step.outcome {
            StepOutcome::Ok {
                status,
                dispatched: false,
                ..
            } => format!("{} (no-op)", status),
            StepOutcome::Ok { status, .. } => status.clone(),
            StepOutcome::Error { kind, .. } => format!("error: {}", kind),
        };
        let expected = match (&step.expected, step.met) {
            (Some(expected), Some(false)) => format!("{} ✗", expected),
            (Some(expected), _) => format!("{} ✓", expected),
            (None, _) => String::new(),
        };

        builder.push_record([
            step.index.to_string(),
            step.actor.clone(),
            step.action.clone(),
            step.subject.clone(),
            result,
            expected,
        ]);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

fn matrix_table(report: &RunReport) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["viewer \\ subject".to_string()];
    header.extend(report.accounts.iter().cloned());
    builder.push_record(header);

    for viewer in &report.accounts {
        let mut row = vec![viewer.clone()];
        for subject in &report.accounts {
            let cell = report
                .matrix
                .get(viewer)
                .and_then(|statuses| statuses.get(subject))
                .cloned()
                .unwrap_or_else(|| "-".to_string());
            row.push(cell);
        }
        builder.push_record(row);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}
