//! Sweep command for outbreak.
//!
//! Runs one reconciliation pass. Meant to be invoked on a fixed cadence
//! (cron, a systemd timer, or the platform bridge).

use serde::Serialize;

use crate::core::Timestamp;
use crate::handlers::{LifecycleRunner, SweepReport};
use crate::platform::{Notifier, TagService};
use crate::storage::RecordStore;

/// Options for the sweep command.
#[derive(Debug, Clone, Default)]
pub struct SweepOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the sweep command.
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutput {
    /// Whether the sweep ran to completion.
    pub success: bool,
    /// Community swept.
    pub community: String,
    /// Instant the sweep evaluated.
    pub at: Timestamp,
    /// What the sweep did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SweepReport>,
    /// Error message if the sweep failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The sweep command implementation.
pub struct SweepCommand<S: RecordStore, T: TagService, N: Notifier> {
    runner: LifecycleRunner<S, T, N>,
}

impl<S: RecordStore, T: TagService, N: Notifier> SweepCommand<S, T, N> {
    /// Create a new sweep command.
    pub fn new(runner: LifecycleRunner<S, T, N>) -> Self {
        Self { runner }
    }

    /// Run the sweep command.
    pub fn run(&self, _options: &SweepOptions) -> SweepOutput {
        let community = self.runner.community().id.clone();
        let at = self.runner.now();

        match self.runner.sweep() {
            Ok(report) => SweepOutput {
                success: true,
                community,
                at,
                report: Some(report),
                error: None,
            },
            Err(e) => SweepOutput {
                success: false,
                community,
                at,
                report: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SweepOutput, options: &SweepOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &SweepOutput) -> String {
        let Some(report) = &output.report else {
            return format!(
                "Sweep failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let mut lines = vec![format!(
            "Sweep of {} at {}",
            output.community,
            output.at.format("%Y-%m-%d %H:%M %:z")
        )];

        if !report.has_changes() {
            lines.push("  No changes.".to_string());
        }
        for (label, count) in [
            ("Infected", report.infected),
            ("Quarantined", report.quarantined),
            ("Offers issued", report.offers_issued),
            ("Offers expired", report.offers_expired),
            ("Cured", report.cured),
            ("Chronic", report.chronic),
            ("Untracked", report.untracked),
        ] {
            if count > 0 {
                lines.push(format!("  {}: {}", label, count));
            }
        }
        lines.push(format!(
            "  Tracked: {} ({} evaluated)",
            report.tracked, report.evaluated
        ));

        if report.failures > 0 {
            lines.push(format!(
                "  Failures: {} (retried next sweep)",
                report.failures
            ));
            if !report.failed_members.is_empty() {
                lines.push(format!("  Failed members: {}", report.failed_members.join(", ")));
            }
        }

        lines.join("\n") + "\n"
    }
}
