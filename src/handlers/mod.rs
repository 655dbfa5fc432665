//! Lifecycle drivers.
//!
//! [`LifecycleRunner`] wires the engine to its collaborators. Two entry
//! points mutate records:
//!
//! - **sweep**: the periodic reconciliation pass over every member
//! - **ingress**: a member accepting a treatment offer
//!
//! Both hold the community lock across their load/compute/save.

pub mod ingress;
pub mod sweep;

pub use ingress::{AcceptOutcome, ActionEvent};
pub use sweep::SweepReport;

use std::sync::Arc;

use crate::config::{CommunityConfig, Config};
use crate::core::{Clock, Engine, MessageRef, RecordSet, Timestamp};
use crate::error::{FailOpen, OutbreakError, Result};
use crate::journal::Journal;
use crate::platform::{Notifier, TagService};
use crate::storage::{CommunityLocks, RecordStore};

/// Runs the lifecycle of one community against its collaborators.
pub struct LifecycleRunner<S: RecordStore, T: TagService, N: Notifier> {
    /// Community identifiers, tags and channel.
    community: CommunityConfig,
    /// Decision function.
    engine: Engine,
    /// Record persistence.
    store: S,
    /// Membership and tags.
    tags: T,
    /// Notification delivery.
    notifier: N,
    /// Source of "now".
    clock: Arc<dyn Clock>,
    /// Per-community exclusive access, shared with other runners.
    locks: Arc<CommunityLocks>,
    /// Transition history.
    journal: Journal,
}

impl<S: RecordStore, T: TagService, N: Notifier> LifecycleRunner<S, T, N> {
    /// Create a runner with its own lock registry and no journal.
    pub fn new(config: &Config, store: S, tags: T, notifier: N, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            community: config.community.clone(),
            engine: Engine::from_config(config)?,
            store,
            tags,
            notifier,
            clock,
            locks: Arc::new(CommunityLocks::new()),
            journal: Journal::disabled(),
        })
    }

    /// Share a lock registry with other runners in this process.
    pub fn with_locks(mut self, locks: Arc<CommunityLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Record transitions to `journal`.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn community(&self) -> &CommunityConfig {
        &self.community
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Current instant in the community's offset.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Load the community's records.
    ///
    /// A corrupt store is a cold start: it loads as empty. Any other failure
    /// propagates.
    pub fn load_records(&self) -> Result<RecordSet> {
        match self.store.load_all(&self.community.id) {
            Ok(records) => Ok(records),
            Err(OutbreakError::CorruptStore { path, message }) => {
                tracing::error!(
                    community = %self.community.id,
                    path = %path.display(),
                    error = %message,
                    "record store is corrupt, starting empty; lifecycle history is lost"
                );
                Ok(RecordSet::new(&self.community.id))
            }
            Err(e) => Err(e),
        }
    }

    /// Retract a message, logging failures.
    fn retract_best_effort(&self, message: &MessageRef) {
        self.notifier
            .retract(message)
            .fail_open_default("retracting notification");
    }

    /// Post a message to the community channel, logging failures.
    fn notify_best_effort(&self, text: &str) {
        if let Err(e) = self.notifier.send(&self.community.channel, text) {
            tracing::warn!(channel = %self.community.channel, error = %e, "notification not delivered");
        }
    }
}
