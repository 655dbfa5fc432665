//! File-based record storage for outbreak.
//!
//! Each community's records live in one JSON file,
//! `<data_dir>/<community>.records.json`. Atomic writes are achieved via
//! temp file + rename pattern.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::core::RecordSet;
use crate::error::{OutbreakError, Result};
use crate::storage::RecordStore;
use crate::util::{community_file, read_to_string_limited, write_json_atomic};

/// File-based record storage.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    /// Directory where record files are stored.
    data_dir: PathBuf,
}

impl FileRecordStore {
    /// Create a store rooted at `data_dir`, creating the directory if needed.
    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).map_err(|e| OutbreakError::storage(&data_dir, e))?;
        }

        Ok(Self { data_dir })
    }

    /// Get the path for a community's record file.
    pub fn records_path(&self, community: &str) -> PathBuf {
        community_file(&self.data_dir, community, "records.json")
    }

    /// Move an unreadable record file aside so the next save does not
    /// destroy it.
    fn set_aside(path: &Path) -> Option<PathBuf> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let target = path.with_file_name(format!("{}.corrupt-{}", file_name, stamp));
        match fs::rename(path, &target) {
            Ok(()) => Some(target),
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "could not set corrupt record file aside"
                );
                None
            }
        }
    }

    fn corrupt(path: &Path, message: String) -> OutbreakError {
        let kept = Self::set_aside(path)
            .map(|p| format!(" (kept as {})", p.display()))
            .unwrap_or_default();
        OutbreakError::corrupt_store(path, format!("{}{}", message, kept))
    }
}

impl RecordStore for FileRecordStore {
    fn load_all(&self, community: &str) -> Result<RecordSet> {
        let path = self.records_path(community);

        if !path.exists() {
            return Ok(RecordSet::new(community));
        }

        let content = match read_to_string_limited(&path) {
            Ok(content) => content,
            Err(OutbreakError::CorruptStore { message, .. }) => {
                return Err(Self::corrupt(&path, message));
            }
            Err(e) => return Err(e),
        };

        let records: RecordSet = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => return Err(Self::corrupt(&path, e.to_string())),
        };

        if records.community != community {
            return Err(OutbreakError::invalid_state(format!(
                "{} holds records for community {}, not {}",
                path.display(),
                records.community,
                community
            )));
        }

        Ok(records)
    }

    fn save_all(&self, records: &RecordSet) -> Result<()> {
        write_json_atomic(&self.records_path(&records.community), records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::tests::at;
    use crate::core::MemberRecord;
    use crate::storage::traits::tests::test_record_store_roundtrip;
    use crate::util::temp_path_for;
    use tempfile::TempDir;

    fn create_test_store() -> (FileRecordStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::with_dir(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_file_record_store_roundtrip() {
        let (store, _dir) = create_test_store();
        test_record_store_roundtrip(&store);
    }

    #[test]
    fn test_with_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let data_path = dir.path().join("data");
        assert!(!data_path.exists());

        let _store = FileRecordStore::with_dir(&data_path).unwrap();
        assert!(data_path.is_dir());
    }

    #[test]
    fn test_records_path() {
        let (store, _dir) = create_test_store();
        assert!(store
            .records_path("guild-1")
            .ends_with("guild-1.records.json"));
    }

    #[test]
    fn test_saved_file_uses_explicit_offsets() {
        let (store, _dir) = create_test_store();
        let mut records = RecordSet::new("guild-1");
        records.insert("100", MemberRecord::new(at(0)));
        store.save_all(&records).unwrap();

        let content = fs::read_to_string(store.records_path("guild-1")).unwrap();
        assert!(content.contains("\"infected_at\": \"2026-03-10T00:00:00-03:00\""));
        assert!(content.contains("\"version\": 1"));
        assert!(!temp_path_for(&store.records_path("guild-1")).exists());
    }

    #[test]
    fn test_corrupt_file_is_reported_and_set_aside() {
        let (store, dir) = create_test_store();
        let path = store.records_path("guild-1");
        fs::write(&path, "{ not json").unwrap();

        let err = store.load_all("guild-1").unwrap_err();
        assert!(matches!(err, OutbreakError::CorruptStore { .. }));
        assert!(!path.exists());

        let kept: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(kept.len(), 1);

        // The next load starts clean
        assert!(store.load_all("guild-1").unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_community_is_refused() {
        let (store, _dir) = create_test_store();
        let mut records = RecordSet::new("other");
        records.insert("100", MemberRecord::new(at(0)));
        let json = serde_json::to_string(&records).unwrap();
        let path = store.records_path("guild-1");
        fs::write(&path, &json).unwrap();

        let err = store.load_all("guild-1").unwrap_err();
        assert!(matches!(err, OutbreakError::InvalidState { .. }));
        assert!(err.to_string().contains("community other"));
        // Left in place for the other community
        assert_eq!(fs::read_to_string(&path).unwrap(), json);
    }

    #[test]
    fn test_similar_ids_use_separate_files() {
        let (store, _dir) = create_test_store();
        let mut dotted = RecordSet::new("a.b");
        dotted.insert("1", MemberRecord::new(at(0)));
        store.save_all(&dotted).unwrap();
        store.save_all(&RecordSet::new("a_b")).unwrap();

        assert!(store.load_all("a_b").unwrap().is_empty());
        assert!(store.load_all("a.b").unwrap().contains("1"));
    }
}
