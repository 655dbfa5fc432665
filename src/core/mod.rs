//! Core types and logic for outbreak.
//!
//! This module contains the member record model, the time source, the
//! treatment window oracle and the lifecycle state machine. Nothing here
//! performs I/O.

pub mod clock;
pub mod engine;
pub mod record;
pub mod window;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{Decision, Effect, Engine, LifecyclePolicy, TagFacts, UntrackReason};
pub use record::{
    MemberId, MemberRecord, MessageRef, Outcome, RecordSet, Timestamp, RECORDS_SCHEMA_VERSION,
};
pub use window::{Window, WindowOracle};
