//! History command for outbreak.
//!
//! Shows recent lifecycle transitions from the community journal.

use serde::Serialize;

use crate::journal::{Journal, JournalEvent, Transition};

/// Default number of events shown.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Options for the history command.
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of events.
    pub limit: Option<usize>,
    /// Only events for this member.
    pub member: Option<String>,
}

/// Output format for the history command.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryOutput {
    /// Whether the journal could be read.
    pub success: bool,
    /// Events, oldest first.
    pub events: Vec<JournalEvent>,
    /// Error message if reading failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The history command implementation.
pub struct HistoryCommand {
    journal: Journal,
}

impl HistoryCommand {
    /// Create a new history command.
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }

    /// Run the history command.
    pub fn run(&self, options: &HistoryOptions) -> HistoryOutput {
        let limit = options.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        match self.journal.read(limit, options.member.as_deref()) {
            Ok(events) => HistoryOutput {
                success: true,
                events,
                error: None,
            },
            Err(e) => HistoryOutput {
                success: false,
                events: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &HistoryOutput, options: &HistoryOptions) -> String {
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
    fn format_human_readable(&self, output: &HistoryOutput) -> String {
        if !output.success {
            return format!(
                "History failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }
        if output.events.is_empty() {
            return "No transitions recorded.\n".to_string();
        }

        let mut lines = Vec::with_capacity(output.events.len());
        for event in &output.events {
            let detail = match &event.transition {
                Transition::Quarantined { tag } => format!(" ({})", tag),
                Transition::OfferIssued { message } => format!(" ({})", message),
                Transition::OfferExpired {
                    message: Some(message),
                } => format!(" ({})", message),
                Transition::TreatmentStarted { cured_at } => {
                    format!(" (cured at {})", cured_at.format("%H:%M"))
                }
                Transition::Untracked { reason } => format!(" ({})", reason),
                Transition::OutcomeDeferred { outcome, error } => {
                    format!(" ({}: {})", outcome, error)
                }
                _ => String::new(),
            };
            lines.push(format!(
                "{}  {:<8} {}{}",
                event.ts.format("%Y-%m-%d %H:%M"),
                event.member,
                event.transition.event_name(),
                detail
            ));
        }
        lines.join("\n") + "\n"
    }
}
