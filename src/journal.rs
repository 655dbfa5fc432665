//! Transition journal for outbreak.
//!
//! Every lifecycle transition is appended to an append-only JSONL file,
//! `<data_dir>/<community>.history.jsonl`. The journal is informational:
//! records are the source of truth, and a failed append never blocks a
//! transition.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{MemberId, MessageRef, Outcome, Timestamp};
use crate::error::{FailOpen, OutbreakError, Result};
use crate::util::{community_file, read_to_string_limited};

/// Schema version for journal events.
///
/// Increment when the event schema changes in a breaking way.
pub const JOURNAL_SCHEMA_VERSION: u8 = 1;

/// A journal line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEvent {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// When the transition happened, in the community's offset.
    pub ts: Timestamp,
    /// Member the transition applies to.
    pub member: MemberId,
    /// The transition and its data.
    #[serde(flatten)]
    pub transition: Transition,
}

impl JournalEvent {
    pub fn new(member: impl Into<MemberId>, ts: Timestamp, transition: Transition) -> Self {
        Self {
            v: JOURNAL_SCHEMA_VERSION,
            ts,
            member: member.into(),
            transition,
        }
    }
}

/// A lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Transition {
    /// Infected tag observed on an untracked member.
    Infected { infected_at: Timestamp },

    /// Quarantine tag applied.
    Quarantined { tag: String },

    /// Treatment offer posted.
    OfferIssued { message: MessageRef },

    /// Offer lifetime ran out.
    OfferExpired {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<MessageRef>,
    },

    /// Member accepted treatment.
    TreatmentStarted { cured_at: Timestamp },

    /// Treatment completed, infected tag removed.
    Cured { infected_at: Timestamp },

    /// Deadline passed, infected tag swapped for chronic.
    Chronic { infected_at: Timestamp },

    /// Record dropped without a terminal effect.
    Untracked { reason: String },

    /// Terminal tag changes failed and will be retried.
    OutcomeDeferred { outcome: Outcome, error: String },
}

impl Transition {
    /// Get the event name as a string.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Infected { .. } => "infected",
            Self::Quarantined { .. } => "quarantined",
            Self::OfferIssued { .. } => "offer_issued",
            Self::OfferExpired { .. } => "offer_expired",
            Self::TreatmentStarted { .. } => "treatment_started",
            Self::Cured { .. } => "cured",
            Self::Chronic { .. } => "chronic",
            Self::Untracked { .. } => "untracked",
            Self::OutcomeDeferred { .. } => "outcome_deferred",
        }
    }
}

/// JSONL writer and reader for transitions.
#[derive(Debug, Clone)]
pub struct Journal {
    /// Path to the journal file; `None` disables journaling.
    path: Option<PathBuf>,
}

impl Journal {
    /// Create a journal writing to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Journal of `community` under `data_dir`.
    pub fn for_community(data_dir: &Path, community: &str) -> Self {
        Self::new(community_file(data_dir, community, "history.jsonl"))
    }

    /// A journal that drops everything.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an event to the journal.
    pub fn append(&self, event: &JournalEvent) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| OutbreakError::storage(parent, e))?;
        }

        let json = serde_json::to_string(event)
            .map_err(|e| OutbreakError::serde(format!("Failed to serialize journal event: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| OutbreakError::storage(path, e))?;

        writeln!(file, "{}", json).map_err(|e| OutbreakError::storage(path, e))?;

        Ok(())
    }

    /// Append a transition, logging instead of failing.
    pub fn record(&self, member: &str, ts: Timestamp, transition: Transition) {
        self.append(&JournalEvent::new(member, ts, transition))
            .fail_open_default("appending to journal");
    }

    /// The last `limit` events, oldest first, optionally for one member.
    ///
    /// Lines that do not parse are skipped.
    pub fn read(&self, limit: usize, member: Option<&str>) -> Result<Vec<JournalEvent>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = read_to_string_limited(path)?;
        let mut events: Vec<JournalEvent> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<JournalEvent>(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed journal line");
                    None
                }
            })
            .filter(|event| member.is_none_or(|m| event.member == m))
            .collect();

        if events.len() > limit {
            events.drain(..events.len() - limit);
        }
        Ok(events)
    }
}
