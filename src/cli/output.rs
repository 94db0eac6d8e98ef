//! Output formatting for CLI commands.

use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::api::{WorkloadStatus, WorkloadSummary};
use crate::lifecycle::RemovalReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Workload row for table display.
#[derive(Tabled)]
struct WorkloadRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
}

/// Status payload for JSON output.
#[derive(Serialize)]
struct StatusJson<'a> {
    id: &'a str,
    phase: Option<&'a str>,
    endpoints: &'a HashMap<String, String>,
    conditions: &'a [String],
}

/// Removal payload for JSON output.
#[derive(Serialize)]
struct RemovalJson {
    attempted: usize,
    succeeded: usize,
    any_failed: bool,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the status of one workload.
    #[must_use]
    pub fn format_status(&self, workload_id: &str, status: &WorkloadStatus) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&StatusJson {
                id: workload_id,
                phase: status.raw_phase.as_deref(),
                endpoints: &status.endpoints,
                conditions: &status.conditions,
            })
            .unwrap_or_default(),
            OutputFormat::Text => Self::format_status_text(workload_id, status),
        }
    }

    fn format_status_text(workload_id: &str, status: &WorkloadStatus) -> String {
        let mut output = String::new();

        let phase = status.raw_phase.as_deref().unwrap_or("Unknown");
        let _ = writeln!(output, "Workload: {workload_id}");
        let _ = writeln!(output, "Phase:    {}", colorize_phase(phase));

        if !status.endpoints.is_empty() {
            let _ = writeln!(output, "Endpoints:");
            for (name, url) in &status.endpoints {
                let _ = writeln!(output, "  {name}: {url}");
            }
        }

        if !status.conditions.is_empty() {
            let _ = writeln!(output, "Conditions:");
            for condition in &status.conditions {
                let _ = writeln!(output, "  - {condition}");
            }
        }

        output
    }

    /// Formats a workload listing.
    #[must_use]
    pub fn format_list(&self, workloads: &[WorkloadSummary]) -> String {
        match self.format {
            OutputFormat::Json => {
                let rows: Vec<serde_json::Value> = workloads
                    .iter()
                    .map(|w| {
                        serde_json::json!({
                            "id": w.id,
                            "name": w.name,
                            "phase": w.phase,
                            "endpoints": w.endpoints,
                        })
                    })
                    .collect();
                serde_json::to_string_pretty(&rows).unwrap_or_default()
            }
            OutputFormat::Text => {
                if workloads.is_empty() {
                    return String::from("No workloads found.\n");
                }
                let rows: Vec<WorkloadRow> = workloads
                    .iter()
                    .map(|w| WorkloadRow {
                        id: w.id.clone(),
                        name: w.name.clone(),
                        phase: w.phase.clone(),
                        endpoint: w
                            .endpoints
                            .values()
                            .next()
                            .cloned()
                            .unwrap_or_default(),
                    })
                    .collect();
                let mut table = Table::new(rows).to_string();
                table.push('\n');
                table
            }
        }
    }

    /// Formats the result of a successful deploy or update.
    #[must_use]
    pub fn format_serving(
        &self,
        workload_id: &str,
        endpoints: &HashMap<String, String>,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "id": workload_id,
                "phase": "Serving",
                "endpoints": endpoints,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(
                    output,
                    "{} Workload {workload_id} is serving.",
                    "\u{2713}".green()
                );
                for (name, url) in endpoints {
                    let _ = writeln!(output, "  {name}: {url}");
                }
                output
            }
        }
    }

    /// Formats an acceptance receipt when the caller does not wait.
    #[must_use]
    pub fn format_accepted(&self, workload_id: &str) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "id": workload_id,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                format!("Workload accepted with ID {workload_id}\n")
            }
        }
    }

    /// Formats completion of a custom action.
    #[must_use]
    pub fn format_action(&self, workload_id: &str, verb: &str) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "id": workload_id,
                "action": verb,
                "status": "done",
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                format!(
                    "{} {verb} of workload {workload_id} complete.\n",
                    "\u{2713}".green()
                )
            }
        }
    }

    /// Formats a bulk removal report.
    #[must_use]
    pub fn format_removal(&self, report: &RemovalReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&RemovalJson {
                attempted: report.attempted,
                succeeded: report.succeeded,
                any_failed: report.any_failed,
            })
            .unwrap_or_default(),
            OutputFormat::Text => {
                if report.any_failed {
                    format!(
                        "{} Removed {} of {} workloads; see log output for failures.\n",
                        "\u{26a0}".yellow(),
                        report.succeeded,
                        report.attempted
                    )
                } else {
                    format!(
                        "{} Removed {} workloads.\n",
                        "\u{2713}".green(),
                        report.succeeded
                    )
                }
            }
        }
    }

    /// Formats server-side validation results.
    #[must_use]
    pub fn format_validation(&self, errors: &[String]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "valid": errors.is_empty(),
                "errors": errors,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                if errors.is_empty() {
                    format!("{} Spec is valid.\n", "\u{2713}".green())
                } else {
                    let mut output =
                        format!("{} Spec has {} problem(s):\n", "\u{2717}".red(), errors.len());
                    for error in errors {
                        let _ = writeln!(output, "  - {error}");
                    }
                    output
                }
            }
        }
    }
}

/// Colors a phase string by its liveness.
fn colorize_phase(phase: &str) -> String {
    match phase {
        "Serving" => phase.green().to_string(),
        "Failed" => phase.red().to_string(),
        "Deleted" | "Paused" => phase.dimmed().to_string(),
        _ => phase.yellow().to_string(),
    }
}
