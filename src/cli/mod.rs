//! CLI commands for outbreak.
//!
//! This module provides CLI commands for outbreak, organized into:
//! - **Lifecycle commands**: sweep, accept, react (drive transitions)
//! - **Inspection commands**: status, window, history (read only)
//! - **Utility commands**: init

// Lifecycle commands
pub mod accept;
pub mod sweep;

// Inspection commands
pub mod history;
pub mod status;
pub mod window;

// Utility commands
pub mod init;

pub use accept::AcceptCommand;
pub use history::HistoryCommand;
pub use init::InitCommand;
pub use status::StatusCommand;
pub use sweep::SweepCommand;
pub use window::WindowCommand;

use std::sync::Arc;

use crate::config::Config;
use crate::core::Clock;
use crate::error::Result;
use crate::handlers::LifecycleRunner;
use crate::journal::Journal;
use crate::platform::{FileOutbox, FileRoster};
use crate::storage::FileRecordStore;

/// Runner over the file-backed store, roster and outbox.
pub type FileRunner = LifecycleRunner<FileRecordStore, FileRoster, FileOutbox>;

/// Build a runner whose collaborators all live under the configured data
/// directory, journaling to `<community>.history.jsonl`.
pub fn file_runner(config: &Config, clock: Arc<dyn Clock>) -> Result<FileRunner> {
    let data_dir = config.data_dir()?;
    let community = &config.community.id;

    let runner = LifecycleRunner::new(
        config,
        FileRecordStore::with_dir(&data_dir)?,
        FileRoster::for_community(&data_dir, community),
        FileOutbox::for_community(&data_dir, community),
        clock,
    )?;
    Ok(runner.with_journal(Journal::for_community(&data_dir, community)))
}

/// Journal of the configured community.
pub fn file_journal(config: &Config) -> Result<Journal> {
    Ok(Journal::for_community(&config.data_dir()?, &config.community.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::core::record::tests::at;
    use crate::core::FixedClock;
    use crate::platform::{Roster, RosterMember};
    use crate::storage::RecordStore;
    use tempfile::TempDir;

    #[test]
    fn test_file_runner_end_to_end() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config();
        config.storage.data_dir = Some(dir.path().to_path_buf());

        let roster = FileRoster::for_community(dir.path(), "guild-1");
        roster
            .save(&Roster {
                members: vec![RosterMember::new("1").with_tag("sav"), RosterMember::new("2")],
            })
            .unwrap();

        let clock = Arc::new(FixedClock::new(at(0)));
        let runner = file_runner(&config, clock.clone() as Arc<dyn Clock>).unwrap();

        let report = runner.sweep().unwrap();
        assert_eq!(report.infected, 1);
        assert_eq!(report.offers_issued, 1);

        let outbox = FileOutbox::for_community(dir.path(), "guild-1");
        let live = outbox.live().unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].actions, vec!["💊".to_string()]);

        runner.accept("1", at(3)).unwrap();
        clock.set(at(43));
        let report = runner.sweep().unwrap();
        assert_eq!(report.cured, 1);

        let store = FileRecordStore::with_dir(dir.path()).unwrap();
        assert!(store.load_all("guild-1").unwrap().is_empty());
        let tags = roster.load().unwrap().members[0].tags.clone();
        assert!(tags.is_empty());

        let history = file_journal(&config).unwrap().read(10, None).unwrap();
        assert_eq!(history.len(), 4);
    }
}
