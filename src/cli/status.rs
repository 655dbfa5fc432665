//! Status command for outbreak.
//!
//! Shows every tracked member with the deadlines that apply to them, and
//! whether a treatment window is open.

use serde::Serialize;

use crate::core::{MemberId, MemberRecord, Outcome, Timestamp};
use crate::handlers::LifecycleRunner;
use crate::platform::{Notifier, TagService};
use crate::storage::RecordStore;

/// Options for the status command.
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Where a tracked member is in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Infected, waiting for the next window.
    Waiting,
    /// Offer posted and not yet accepted.
    OfferOutstanding,
    /// Treatment running.
    InTreatment,
    /// Outcome decided, tag changes still pending.
    Concluding,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::OfferOutstanding => write!(f, "offer outstanding"),
            Self::InTreatment => write!(f, "in treatment"),
            Self::Concluding => write!(f, "concluding"),
        }
    }
}

/// One tracked member.
#[derive(Debug, Clone, Serialize)]
pub struct MemberStatus {
    pub member: MemberId,
    pub stage: Stage,
    pub infected_at: Timestamp,
    /// Minutes since infection.
    pub infected_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_expires_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cured_at: Option<Timestamp>,
    /// When the member turns chronic if treatment never starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chronic_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantined_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_outcome: Option<Outcome>,
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    /// Whether the records could be read.
    pub success: bool,
    pub community: String,
    /// Instant the status describes.
    pub at: Timestamp,
    /// Whether a treatment window is open at `at`.
    pub window_open: bool,
    /// Next window opening after `at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_window: Option<Timestamp>,
    /// Tracked members.
    pub members: Vec<MemberStatus>,
    /// Error message if the records could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The status command implementation.
pub struct StatusCommand<S: RecordStore, T: TagService, N: Notifier> {
    runner: LifecycleRunner<S, T, N>,
}

impl<S: RecordStore, T: TagService, N: Notifier> StatusCommand<S, T, N> {
    /// Create a new status command.
    pub fn new(runner: LifecycleRunner<S, T, N>) -> Self {
        Self { runner }
    }

    /// Run the status command.
    pub fn run(&self, _options: &StatusOptions) -> StatusOutput {
        let now = self.runner.now();
        let oracle = self.runner.engine().oracle();
        let mut output = StatusOutput {
            success: true,
            community: self.runner.community().id.clone(),
            at: now,
            window_open: oracle.is_open(now),
            next_window: oracle.next_opening(now),
            members: Vec::new(),
            error: None,
        };

        match self.runner.load_records() {
            Ok(records) => {
                output.members = records
                    .members
                    .iter()
                    .map(|(member, record)| self.member_status(now, member, record))
                    .collect();
            }
            Err(e) => {
                output.success = false;
                output.error = Some(e.to_string());
            }
        }
        output
    }

    fn member_status(&self, now: Timestamp, member: &str, record: &MemberRecord) -> MemberStatus {
        let policy = self.runner.engine().policy();
        let stage = if record.pending_outcome.is_some() {
            Stage::Concluding
        } else if record.treatment_started() {
            Stage::InTreatment
        } else if record.has_open_offer() {
            Stage::OfferOutstanding
        } else {
            Stage::Waiting
        };

        MemberStatus {
            member: member.to_string(),
            stage,
            infected_at: record.infected_at,
            infected_minutes: record.infection_age(now).num_minutes(),
            offer_expires_at: record.offer_sent_at.map(|sent| sent + policy.offer_lifetime),
            cured_at: record.cured_at(policy.treatment_duration),
            chronic_at: (!record.treatment_started())
                .then(|| record.infected_at + policy.chronic_deadline),
            quarantined_at: record.quarantined_at,
            pending_outcome: record.pending_outcome,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
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
    fn format_human_readable(&self, output: &StatusOutput) -> String {
        if !output.success {
            return format!(
                "Status failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let fmt = |ts: &Timestamp| ts.format("%Y-%m-%d %H:%M").to_string();
        let mut lines = vec![format!(
            "Community {} at {}",
            output.community,
            output.at.format("%Y-%m-%d %H:%M %:z")
        )];

        if output.window_open {
            lines.push("Treatment window: open".to_string());
        } else if let Some(next) = &output.next_window {
            lines.push(format!("Treatment window: closed, opens {}", fmt(next)));
        } else {
            lines.push("Treatment window: none scheduled".to_string());
        }

        if output.members.is_empty() {
            lines.push("No infected members tracked.".to_string());
            return lines.join("\n") + "\n";
        }

        lines.push(String::new());
        lines.push(format!("Tracked members ({}):", output.members.len()));
        for status in &output.members {
            let mut line = format!(
                "  {} - {} (infected {}h{:02}m)",
                status.member,
                status.stage,
                status.infected_minutes / 60,
                status.infected_minutes % 60
            );
            if let Some(expires) = &status.offer_expires_at {
                line.push_str(&format!(", offer expires {}", fmt(expires)));
            }
            if let Some(cured) = &status.cured_at {
                line.push_str(&format!(", cured at {}", fmt(cured)));
            }
            if let Some(chronic) = &status.chronic_at {
                line.push_str(&format!(", chronic at {}", fmt(chronic)));
            }
            if let Some(outcome) = status.pending_outcome {
                line.push_str(&format!(", pending {}", outcome));
            }
            lines.push(line);
        }

        lines.join("\n") + "\n"
    }
}
