//! In-memory record storage for testing.
//!
//! This module provides a thread-safe in-memory implementation of the
//! RecordStore trait, primarily for use in unit tests.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::RecordSet;
use crate::error::{OutbreakError, Result};
use crate::storage::RecordStore;

/// In-memory record store for testing.
///
/// Thread-safe implementation using `RwLock<HashMap>`. Record sets are lost
/// when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    /// Record sets keyed by community.
    sets: RwLock<HashMap<String, RecordSet>>,
    /// Communities whose stored set should load as corrupt.
    corrupt: RwLock<Vec<String>>,
    /// Number of completed saves.
    saves: RwLock<usize>,
}

impl MemoryRecordStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next load of `community` fail as a corrupt store.
    pub fn corrupt_next_load(&self, community: &str) {
        self.corrupt.write().unwrap().push(community.to_string());
    }

    /// Number of `save_all` calls so far.
    pub fn save_count(&self) -> usize {
        *self.saves.read().unwrap()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load_all(&self, community: &str) -> Result<RecordSet> {
        {
            let mut corrupt = self.corrupt.write().unwrap();
            if let Some(pos) = corrupt.iter().position(|c| c == community) {
                corrupt.remove(pos);
                return Err(OutbreakError::corrupt_store(
                    format!("memory://{}", community),
                    "injected corruption",
                ));
            }
        }

        let sets = self.sets.read().unwrap();
        Ok(sets
            .get(community)
            .cloned()
            .unwrap_or_else(|| RecordSet::new(community)))
    }

    fn save_all(&self, records: &RecordSet) -> Result<()> {
        let mut sets = self.sets.write().unwrap();
        sets.insert(records.community.clone(), records.clone());
        *self.saves.write().unwrap() += 1;
        Ok(())
    }
}
