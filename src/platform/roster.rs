//! File-backed roster of members and their tags.
//!
//! `<data_dir>/<community>.roster.json` mirrors the platform's membership:
//!
//! ```json
//! { "members": [ { "id": "1001", "bot": false, "tags": ["sav"] } ] }
//! ```
//!
//! A platform bridge keeps it in sync and replays tag changes the lifecycle
//! makes here back to the platform.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::MemberId;
use crate::error::{OutbreakError, Result};
use crate::platform::{Member, TagService};
use crate::util::{community_file, read_to_string_limited, write_json_atomic};

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    pub id: MemberId,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl RosterMember {
    pub fn new(id: impl Into<MemberId>) -> Self {
        Self {
            id: id.into(),
            bot: false,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// The roster file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub members: Vec<RosterMember>,
}

impl Roster {
    fn find(&self, member: &str) -> Option<&RosterMember> {
        self.members.iter().find(|m| m.id == member)
    }

    fn find_mut(&mut self, member: &str) -> Option<&mut RosterMember> {
        self.members.iter_mut().find(|m| m.id == member)
    }
}

/// TagService backed by a roster file.
#[derive(Debug, Clone)]
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Roster of `community` under `data_dir`.
    pub fn for_community(data_dir: &Path, community: &str) -> Self {
        Self::new(community_file(data_dir, community, "roster.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the roster. A missing file is an empty community.
    pub fn load(&self) -> Result<Roster> {
        if !self.path.exists() {
            return Ok(Roster::default());
        }
        let content = read_to_string_limited(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| OutbreakError::corrupt_store(&self.path, e.to_string()))
    }

    /// Replace the roster.
    pub fn save(&self, roster: &Roster) -> Result<()> {
        write_json_atomic(&self.path, roster)
    }

    fn mutate(&self, member: &str, operation: &str, f: impl FnOnce(&mut RosterMember) -> bool) -> Result<()> {
        let mut roster = self.load()?;
        let entry = roster.find_mut(member).ok_or_else(|| {
            OutbreakError::external(operation, format!("member {} is not in the community", member))
        })?;
        if f(entry) {
            self.save(&roster)?;
        }
        Ok(())
    }
}

impl TagService for FileRoster {
    fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self
            .load()?
            .members
            .into_iter()
            .map(|m| Member {
                id: m.id,
                bot: m.bot,
            })
            .collect())
    }

    fn has_tag(&self, member: &str, tag: &str) -> Result<bool> {
        Ok(self
            .load()?
            .find(member)
            .map(|m| m.tags.contains(tag))
            .unwrap_or(false))
    }

    fn add_tag(&self, member: &str, tag: &str, reason: &str) -> Result<()> {
        self.mutate(member, "add_tag", |entry| entry.tags.insert(tag.to_string()))?;
        tracing::debug!(member, tag, reason, "tag added");
        Ok(())
    }

    fn remove_tag(&self, member: &str, tag: &str, reason: &str) -> Result<()> {
        self.mutate(member, "remove_tag", |entry| entry.tags.remove(tag))?;
        tracing::debug!(member, tag, reason, "tag removed");
        Ok(())
    }
}
