//! File-backed notification outbox.
//!
//! Messages are appended to `<data_dir>/<community>.outbox.json`. A platform
//! bridge posts pending messages and deletes retracted ones; the CLI can
//! also be pointed at the file directly for inspection.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::MessageRef;
use crate::error::{OutbreakError, Result};
use crate::platform::Notifier;
use crate::util::{community_file, read_to_string_limited, write_json_atomic};

/// A message handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub reference: MessageRef,
    pub channel: String,
    pub text: String,
    /// Quick-action symbols attached to the message.
    #[serde(default)]
    pub actions: Vec<String>,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub retracted: bool,
}

impl OutboxMessage {
    pub fn new(reference: MessageRef, channel: &str, text: &str) -> Self {
        Self {
            reference,
            channel: channel.to_string(),
            text: text.to_string(),
            actions: Vec::new(),
            sent_at: Utc::now(),
            retracted: false,
        }
    }
}

/// Reference for the `n`-th message (1-based) of an outbox.
pub fn message_ref_for(n: usize) -> MessageRef {
    MessageRef::new(format!("msg_{:06}", n))
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OutboxFile {
    #[serde(default)]
    messages: Vec<OutboxMessage>,
}

/// Notifier that records messages in a JSON file.
#[derive(Debug, Clone)]
pub struct FileOutbox {
    path: PathBuf,
}

impl FileOutbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Outbox of `community` under `data_dir`.
    pub fn for_community(data_dir: &Path, community: &str) -> Self {
        Self::new(community_file(data_dir, community, "outbox.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every message ever sent, in send order.
    pub fn messages(&self) -> Result<Vec<OutboxMessage>> {
        Ok(self.load()?.messages)
    }

    /// Messages not retracted.
    pub fn live(&self) -> Result<Vec<OutboxMessage>> {
        Ok(self
            .messages()?
            .into_iter()
            .filter(|m| !m.retracted)
            .collect())
    }

    fn load(&self) -> Result<OutboxFile> {
        if !self.path.exists() {
            return Ok(OutboxFile::default());
        }
        let content = read_to_string_limited(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| OutbreakError::corrupt_store(&self.path, e.to_string()))
    }

    fn update<R>(&self, f: impl FnOnce(&mut OutboxFile) -> Result<R>) -> Result<R> {
        let mut outbox = self.load()?;
        let result = f(&mut outbox)?;
        write_json_atomic(&self.path, &outbox)?;
        Ok(result)
    }
}

impl Notifier for FileOutbox {
    fn send(&self, channel: &str, text: &str) -> Result<MessageRef> {
        self.update(|outbox| {
            let reference = message_ref_for(outbox.messages.len() + 1);
            outbox
                .messages
                .push(OutboxMessage::new(reference.clone(), channel, text));
            Ok(reference)
        })
    }

    fn retract(&self, message: &MessageRef) -> Result<()> {
        self.update(|outbox| {
            if let Some(found) = outbox
                .messages
                .iter_mut()
                .find(|m| &m.reference == message)
            {
                found.retracted = true;
            }
            Ok(())
        })
    }

    fn attach_quick_action(&self, message: &MessageRef, symbol: &str) -> Result<()> {
        self.update(|outbox| {
            let found = outbox
                .messages
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
        })
    }
}
