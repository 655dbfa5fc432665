//! In-memory platform for testing.
//!
//! Both fakes can be told to fail, to exercise the retry paths.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::RwLock;

use crate::core::{MemberId, MessageRef};
use crate::error::{OutbreakError, Result};
use crate::platform::outbox::{message_ref_for, OutboxMessage};
use crate::platform::{Member, Notifier, TagService};

#[derive(Debug, Default)]
struct MemberEntry {
    bot: bool,
    tags: BTreeSet<String>,
}

/// In-memory TagService.
#[derive(Debug, Default)]
pub struct MemoryTagService {
    members: RwLock<BTreeMap<MemberId, MemberEntry>>,
    /// Members whose tag mutations fail.
    failing_writes: RwLock<HashSet<MemberId>>,
    /// Members whose tag reads fail.
    failing_reads: RwLock<HashSet<MemberId>>,
    /// Fail `list_members`.
    failing_listing: RwLock<bool>,
}

impl MemoryTagService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member with the given tags.
    pub fn add_member(&self, id: &str, tags: &[&str]) {
        self.members.write().unwrap().insert(
            id.to_string(),
            MemberEntry {
                bot: false,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        );
    }

    /// Add an automated account with the given tags.
    pub fn add_bot(&self, id: &str, tags: &[&str]) {
        self.add_member(id, tags);
        if let Some(entry) = self.members.write().unwrap().get_mut(id) {
            entry.bot = true;
        }
    }

    /// Remove a member from the community.
    pub fn remove_member(&self, id: &str) {
        self.members.write().unwrap().remove(id);
    }

    /// Current tags of a member.
    pub fn tags_of(&self, id: &str) -> BTreeSet<String> {
        self.members
            .read()
            .unwrap()
            .get(id)
            .map(|e| e.tags.clone())
            .unwrap_or_default()
    }

    /// Make tag mutations for `id` fail (or succeed again).
    pub fn fail_writes_for(&self, id: &str, failing: bool) {
        let mut set = self.failing_writes.write().unwrap();
        if failing {
            set.insert(id.to_string());
        } else {
            set.remove(id);
        }
    }

    /// Make tag reads for `id` fail (or succeed again).
    pub fn fail_reads_for(&self, id: &str, failing: bool) {
        let mut set = self.failing_reads.write().unwrap();
        if failing {
            set.insert(id.to_string());
        } else {
            set.remove(id);
        }
    }

    /// Make `list_members` fail (or succeed again).
    pub fn fail_listing(&self, failing: bool) {
        *self.failing_listing.write().unwrap() = failing;
    }

    fn mutate(&self, member: &str, operation: &str, f: impl FnOnce(&mut MemberEntry)) -> Result<()> {
        if self.failing_writes.read().unwrap().contains(member) {
            return Err(OutbreakError::external(operation, "injected failure"));
        }
        let mut members = self.members.write().unwrap();
        let entry = members.get_mut(member).ok_or_else(|| {
            OutbreakError::external(operation, format!("member {} is not in the community", member))
        })?;
        f(entry);
        Ok(())
    }
}

impl TagService for MemoryTagService {
    fn list_members(&self) -> Result<Vec<Member>> {
        if *self.failing_listing.read().unwrap() {
            return Err(OutbreakError::external("list_members", "injected failure"));
        }
        Ok(self
            .members
            .read()
            .unwrap()
            .iter()
            .map(|(id, entry)| Member {
                id: id.clone(),
                bot: entry.bot,
            })
            .collect())
    }

    fn has_tag(&self, member: &str, tag: &str) -> Result<bool> {
        if self.failing_reads.read().unwrap().contains(member) {
            return Err(OutbreakError::external("has_tag", "injected failure"));
        }
        Ok(self
            .members
            .read()
            .unwrap()
            .get(member)
            .map(|e| e.tags.contains(tag))
            .unwrap_or(false))
    }

    fn add_tag(&self, member: &str, tag: &str, _reason: &str) -> Result<()> {
        self.mutate(member, "add_tag", |entry| {
            entry.tags.insert(tag.to_string());
        })
    }

    fn remove_tag(&self, member: &str, tag: &str, _reason: &str) -> Result<()> {
        self.mutate(member, "remove_tag", |entry| {
            entry.tags.remove(tag);
        })
    }
}

/// In-memory Notifier.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: RwLock<Vec<OutboxMessage>>,
    failing_sends: RwLock<bool>,
    failing_actions: RwLock<bool>,
    failing_retracts: RwLock<bool>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message ever sent.
    pub fn sent(&self) -> Vec<OutboxMessage> {
        self.messages.read().unwrap().clone()
    }

    /// Messages not retracted.
    pub fn live(&self) -> Vec<OutboxMessage> {
        self.sent().into_iter().filter(|m| !m.retracted).collect()
    }

    /// Sent messages whose text contains `needle`.
    pub fn containing(&self, needle: &str) -> Vec<OutboxMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.text.contains(needle))
            .collect()
    }

    pub fn fail_sends(&self, failing: bool) {
        *self.failing_sends.write().unwrap() = failing;
    }

    pub fn fail_actions(&self, failing: bool) {
        *self.failing_actions.write().unwrap() = failing;
    }

    pub fn fail_retracts(&self, failing: bool) {
        *self.failing_retracts.write().unwrap() = failing;
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, channel: &str, text: &str) -> Result<MessageRef> {
        if *self.failing_sends.read().unwrap() {
            return Err(OutbreakError::external("send", "injected failure"));
        }
        let mut messages = self.messages.write().unwrap();
        let reference = message_ref_for(messages.len() + 1);
        messages.push(OutboxMessage::new(reference.clone(), channel, text));
        Ok(reference)
    }

    fn retract(&self, message: &MessageRef) -> Result<()> {
        if *self.failing_retracts.read().unwrap() {
            return Err(OutbreakError::external("retract", "injected failure"));
        }
        if let Some(found) = self
            .messages
            .write()
            .unwrap()
            .iter_mut()
            .find(|m| &m.reference == message)
        {
            found.retracted = true;
        }
        Ok(())
    }

    fn attach_quick_action(&self, message: &MessageRef, symbol: &str) -> Result<()> {
        if *self.failing_actions.read().unwrap() {
            return Err(OutbreakError::external("attach_quick_action", "injected failure"));
        }
        let mut messages = self.messages.write().unwrap();
        let found = messages
            .iter_mut()
            .find(|m| &m.reference == message && !m.retracted)
            .ok_or_else(|| {
                OutbreakError::external(
                    "attach_quick_action",
                    format!("message {} not found", message),
                )
            })?;
        if !found.actions.iter().any(|a| a == symbol) {
            found.actions.push(symbol.to_string());
        }
        Ok(())
    }
}
