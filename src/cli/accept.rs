//! Accept and react commands for outbreak.
//!
//! `accept` starts treatment for a member directly. `react` feeds a quick
//! action clicked on a message, as a platform bridge would, and only counts
//! when it is the accept symbol on the member's own outstanding offer.
//! Ignored events are reported but are not failures.

use serde::Serialize;

use crate::core::{MessageRef, Timestamp};
use crate::handlers::{AcceptOutcome, ActionEvent, LifecycleRunner};
use crate::platform::{Notifier, TagService};
use crate::storage::RecordStore;

/// Options for the accept and react commands.
#[derive(Debug, Clone, Default)]
pub struct AcceptOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the accept and react commands.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutput {
    /// Whether the event was processed (started or ignored).
    pub success: bool,
    /// Member the event came from.
    pub member: String,
    /// Instant of the acceptance.
    pub at: Timestamp,
    /// What happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<AcceptOutcome>,
    /// Error message if processing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AcceptOutput {
    fn from_result(member: &str, at: Timestamp, result: crate::error::Result<AcceptOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                member: member.to_string(),
                at,
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => Self {
                success: false,
                member: member.to_string(),
                at,
                outcome: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// The accept command implementation.
pub struct AcceptCommand<S: RecordStore, T: TagService, N: Notifier> {
    runner: LifecycleRunner<S, T, N>,
}

impl<S: RecordStore, T: TagService, N: Notifier> AcceptCommand<S, T, N> {
    /// Create a new accept command.
    pub fn new(runner: LifecycleRunner<S, T, N>) -> Self {
        Self { runner }
    }

    /// Start treatment for `member` now.
    pub fn run(&self, member: &str, _options: &AcceptOptions) -> AcceptOutput {
        let at = self.runner.now();
        AcceptOutput::from_result(member, at, self.runner.accept(member, at))
    }

    /// Feed a quick action `symbol` clicked by `member` on `message`.
    pub fn run_action(
        &self,
        member: &str,
        message: &str,
        symbol: &str,
        _options: &AcceptOptions,
    ) -> AcceptOutput {
        let event = ActionEvent {
            member: member.to_string(),
            message_ref: MessageRef::new(message),
            symbol: symbol.to_string(),
            at: self.runner.now(),
        };
        AcceptOutput::from_result(member, event.at, self.runner.handle_action(&event))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &AcceptOutput, options: &AcceptOptions) -> String {
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
    fn format_human_readable(&self, output: &AcceptOutput) -> String {
        match &output.outcome {
            Some(AcceptOutcome::Started { cured_at }) => format!(
                "Treatment started for {}. Cured at {}.\n",
                output.member,
                cured_at.format("%Y-%m-%d %H:%M %:z")
            ),
            Some(outcome) => format!("Ignored for {}: {}.\n", output.member, outcome.describe()),
            None => format!(
                "Accept failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::tests::at;
    use crate::handlers::tests::harness;

    #[test]
    fn test_accept_command_starts_treatment() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        h.set(3);

        let cmd = AcceptCommand::new(h.runner);
        let options = AcceptOptions::default();
        let output = cmd.run("1", &options);

        assert!(output.success);
        assert_eq!(output.outcome, Some(AcceptOutcome::Started { cured_at: at(43) }));
        let text = cmd.format_output(&output, &options);
        assert_eq!(text, "Treatment started for 1. Cured at 2026-03-10 00:43 -03:00.\n");
    }

    #[test]
    fn test_accept_command_reports_ignored_event() {
        let h = harness();
        let cmd = AcceptCommand::new(h.runner);
        let options = AcceptOptions::default();
        let output = cmd.run("1", &options);

        assert!(output.success);
        assert_eq!(output.outcome, Some(AcceptOutcome::Untracked));
        assert_eq!(
            cmd.format_output(&output, &options),
            "Ignored for 1: member is not infected.\n"
        );
    }

    #[test]
    fn test_react_command_checks_symbol() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        let offer = h.records().get("1").unwrap().offer_message_ref.clone().unwrap();

        let cmd = AcceptCommand::new(h.runner);
        let options = AcceptOptions {
            json: true,
            ..Default::default()
        };
        let output = cmd.run_action("1", offer.as_str(), "👍", &options);
        assert_eq!(output.outcome, Some(AcceptOutcome::WrongSymbol));

        let output = cmd.run_action("1", offer.as_str(), "💊", &options);
        assert!(output.outcome.as_ref().unwrap().is_started());
        let json = cmd.format_output(&output, &options);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["outcome"]["outcome"], "started");
    }

    #[test]
    fn test_accept_command_reports_storage_failure() {
        let h = harness();
        let output = AcceptOutput::from_result(
            "1",
            at(0),
            Err(crate::error::OutbreakError::config("boom")),
        );
        assert!(!output.success);
        let cmd = AcceptCommand::new(h.runner);
        let text = cmd.format_output(&output, &AcceptOptions::default());
        assert_eq!(text, "Accept failed: config error: boom\n");
    }
}
