//! Record storage for outbreak.
//!
//! This module provides durable storage of member records, supporting
//! file-based and in-memory backends, plus the per-community locks that
//! serialize sweeps and acceptances.

pub mod file;
pub mod lock;
pub mod memory;
pub mod traits;

pub use file::FileRecordStore;
pub use lock::CommunityLocks;
pub use memory::MemoryRecordStore;
pub use traits::RecordStore;
