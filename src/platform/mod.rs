//! Chat platform collaborators.
//!
//! The lifecycle talks to the platform only through [`TagService`] and
//! [`Notifier`]. This module provides file-backed implementations for the
//! CLI, in-memory fakes for tests, and the notification texts.

pub mod memory;
pub mod message;
pub mod outbox;
pub mod roster;
pub mod traits;

pub use memory::{MemoryNotifier, MemoryTagService};
pub use outbox::{FileOutbox, OutboxMessage};
pub use roster::{FileRoster, Roster, RosterMember};
pub use traits::{Member, Notifier, TagService};
