//! Record storage traits for outbreak.
//!
//! This module defines the `RecordStore` trait: whole-set load and save of a
//! community's member records.

use std::sync::Arc;

use crate::core::RecordSet;
use crate::error::Result;

/// Trait for record storage backends.
///
/// Every operation works on the full record set of one community. A save
/// replaces the previous set atomically; a crash mid-save leaves the
/// previous set intact.
pub trait RecordStore: Send + Sync {
    /// Load every record of `community`.
    ///
    /// A community that was never saved yields an empty set. A stored set
    /// that cannot be parsed yields `OutbreakError::CorruptStore`.
    fn load_all(&self, community: &str) -> Result<RecordSet>;

    /// Replace the stored set for `records.community`.
    fn save_all(&self, records: &RecordSet) -> Result<()>;
}

/// Blanket implementation of RecordStore for Arc-wrapped stores.
///
/// This allows sharing one store between a runner and the test inspecting it.
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn load_all(&self, community: &str) -> Result<RecordSet> {
        (**self).load_all(community)
    }

    fn save_all(&self, records: &RecordSet) -> Result<()> {
        (**self).save_all(records)
    }
}
