//! outbreak - infection lifecycle bot for chat communities
//!
//! Members carrying the infected tag are offered treatment during fixed
//! daily windows. Accepting starts a timed cure; ignoring every offer until
//! the deadline turns the infection chronic. A periodic sweep reconciles the
//! persisted lifecycle records with the tags the platform reports, so the
//! process can restart at any point without losing a timer.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod handlers;
pub mod journal;
pub mod observability;
pub mod platform;
pub mod storage;
pub mod util;

pub use config::Config;
pub use core::{
    Clock, Engine, FixedClock, MemberRecord, MessageRef, Outcome, RecordSet, SystemClock,
    Timestamp, WindowOracle,
};
pub use error::{OutbreakError, Result};
pub use handlers::{AcceptOutcome, ActionEvent, LifecycleRunner, SweepReport};
pub use journal::{Journal, JournalEvent, Transition, JOURNAL_SCHEMA_VERSION};
pub use platform::{FileOutbox, FileRoster, Member, Notifier, TagService};
pub use storage::{CommunityLocks, FileRecordStore, RecordStore};

// CLI commands
pub use cli::{
    AcceptCommand, HistoryCommand, InitCommand, StatusCommand, SweepCommand, WindowCommand,
};
