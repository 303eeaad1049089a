//! Output formatting for CLI commands.
//!
//! This module renders plans, outcomes and stored contexts either as colored
//! text with tables or as JSON for scripting.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::context::{ContextRecord, LockInfo, ReconcileProgress};
use crate::handler::ProgressOutcome;
use crate::model::{RequestDocument, ValidationResult};
use crate::planner::{ReconcilePlan, StepKey};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan step row for table display.
#[derive(Tabled)]
struct PlanStepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Target")]
    target: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, document: &RequestDocument, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "valid": result.is_valid(),
                "resource": document.desired_resource_state.label(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = format!("{} Request is valid\n", "✓".green());
                let _ = writeln!(output, "   Group: {}", document.desired_resource_state.label());
                let _ = writeln!(
                    output,
                    "   Instance: {}",
                    document.desired_resource_state.instance().unwrap_or("<unchanged>")
                );

                if show_warnings && !result.warnings.is_empty() {
                    let _ = writeln!(output, "\n{} Warnings:", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                } else if result.warning_count() > 0 {
                    let _ = writeln!(output, "   ({} warning(s), use --warnings to show)", result.warning_count());
                }
                output
            }
        }
    }

    /// Formats a reconcile plan.
    #[must_use]
    pub fn format_plan(&self, plan: &ReconcilePlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(&PlanJson::from(plan)),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &ReconcilePlan) -> String {
        if plan.is_empty() {
            return format!(
                "{} No changes required, {} is up to date.\n",
                "✓".green(),
                plan.resource
            );
        }

        let mut output = String::new();
        let _ = writeln!(output, "\nPlan for {}\n", plan.resource.bold());

        let rows: Vec<PlanStepRow> = plan
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| PlanStepRow {
                index: i + 1,
                step: Self::format_step_key(s.key),
                operation: s.request.kind().to_string(),
                target: s.request.target().to_string(),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if plan.steps.iter().any(|s| s.key == StepKey::RecreateDelete) {
            let _ = writeln!(
                output,
                "\n{} Re-parenting replaces the group: it gets a new identity and the original is deleted.",
                "⚠".yellow()
            );
        }

        output
    }

    /// Formats the outcome of an invocation.
    #[must_use]
    pub fn format_outcome(&self, outcome: &ProgressOutcome) -> String {
        match self.format {
            OutputFormat::Json => to_json(outcome),
            OutputFormat::Text => match outcome {
                ProgressOutcome::Success(snapshot) => {
                    let mut output = format!("{} Update succeeded\n", "✓".green());
                    let _ = writeln!(output, "   Group: {}", snapshot.label());
                    let _ = writeln!(output, "   Name: {}", snapshot.display_name().unwrap_or("<none>"));
                    let _ = writeln!(output, "   Parent: {}", snapshot.parent().unwrap_or("<top level>"));
                    output
                }
                ProgressOutcome::InProgress(context) => {
                    let mut output = format!("{} Update in progress\n", "…".yellow());
                    if let Ok(progress) = ReconcileProgress::load(context) {
                        let _ = writeln!(output, "   Completed steps: {}", Self::join_steps(&progress));
                    }
                    output.push_str("   Run apply again to continue.\n");
                    output
                }
                ProgressOutcome::Failed { kind, message } => {
                    format!("{} Update failed ({kind})\n   {message}\n", "✗".red())
                }
            },
        }
    }

    /// Formats a stored context and its lock.
    #[must_use]
    pub fn format_context(&self, record: Option<&ContextRecord>, lock: Option<&LockInfo>) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "context": record,
                "lock": lock,
            })),
            OutputFormat::Text => {
                let mut output = String::new();

                match record {
                    None => output.push_str("No stored context.\n"),
                    Some(record) => {
                        let _ = writeln!(output, "\nContext: {}\n", record.resource.bold());
                        let _ = writeln!(output, "   Updated: {}", record.updated_at.format("%Y-%m-%d %H:%M:%S"));
                        match ReconcileProgress::load(&record.context) {
                            Ok(progress) => {
                                let _ = writeln!(
                                    output,
                                    "   Request: {}",
                                    progress.fingerprint.as_deref().map_or("<none>", |f| &f[..8.min(f.len())])
                                );
                                let _ = writeln!(output, "   Completed steps: {}", Self::join_steps(&progress));
                                if let Some(arn) = &progress.replacement_arn {
                                    let _ = writeln!(output, "   Replacement group: {arn}");
                                }
                            }
                            Err(e) => {
                                let _ = writeln!(output, "   {} {e}", "✗".red());
                            }
                        }
                    }
                }

                if let Some(lock) = lock {
                    let state = if lock.is_expired() {
                        "expired".dimmed().to_string()
                    } else {
                        format!("{}s left", lock.remaining_secs()).yellow().to_string()
                    };
                    let _ = writeln!(output, "   Lock: {} held by {} ({state})", lock.lock_id, lock.holder);
                }

                output
            }
        }
    }

    fn format_step_key(key: StepKey) -> String {
        match key {
            StepKey::Rename => key.as_str().yellow().to_string(),
            StepKey::RecreateCreate | StepKey::Tag => key.as_str().green().to_string(),
            StepKey::RecreateDelete | StepKey::Untag => key.as_str().red().to_string(),
        }
    }

    fn join_steps(progress: &ReconcileProgress) -> String {
        if progress.completed.is_empty() {
            return String::from("none");
        }
        progress.completed.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson {
    resource: String,
    step_count: usize,
    operations: Vec<crate::planner::Operation>,
    steps: Vec<StepJson>,
}

#[derive(Serialize)]
struct StepJson {
    step: &'static str,
    operation: &'static str,
    target: String,
}

impl From<&ReconcilePlan> for PlanJson {
    fn from(plan: &ReconcilePlan) -> Self {
        Self {
            resource: plan.resource.clone(),
            step_count: plan.len(),
            operations: plan.operations.clone(),
            steps: plan
                .steps
                .iter()
                .map(|s| StepJson {
                    step: s.key.as_str(),
                    operation: s.request.kind().api_name(),
                    target: s.request.target().to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::handler::UpdateHandler;
    use crate::model::ResourceSnapshot;
    use crate::remote::DryRunInvoker;

    const INSTANCE: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1";
    const GROUP: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/group-1";
    const PARENT: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/parent-1";

    fn move_plan() -> ReconcilePlan {
        let previous = ResourceSnapshot::new(INSTANCE, "team").with_group_arn(GROUP);
        let desired = previous.clone().with_parent(PARENT);
        UpdateHandler::new(DryRunInvoker::new()).plan(&desired, &previous).unwrap()
    }

    #[test]
    fn test_plan_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_plan(&move_plan());
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["step_count"], 2);
        assert_eq!(json["steps"][0]["step"], "recreate.create");
        assert_eq!(json["steps"][1]["operation"], "DeleteUserHierarchyGroup");
        assert_eq!(json["operations"][0]["type"], "RecreateMove");
    }

    #[test]
    fn test_plan_text_warns_about_replacement() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text).format_plan(&move_plan());
        assert!(output.contains("recreate.delete"));
        assert!(output.contains("new identity"));
    }

    #[test]
    fn test_failed_outcome_text() {
        colored::control::set_override(false);
        let outcome = ProgressOutcome::Failed {
            kind: ErrorKind::NotFound,
            message: String::from("UpdateUserHierarchyGroupName failed"),
        };
        let output = OutputFormatter::new(OutputFormat::Text).format_outcome(&outcome);
        assert!(output.contains("Update failed (NotFound)"));
        assert!(output.contains("UpdateUserHierarchyGroupName"));
    }

    #[test]
    fn test_empty_context_text() {
        let output = OutputFormatter::new(OutputFormat::Text).format_context(None, None);
        assert_eq!(output, "No stored context.\n");
    }
}
