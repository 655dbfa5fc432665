//! Chat platform capabilities consumed by the lifecycle.
//!
//! The platform owns membership and tags (roles) and delivers notifications.
//! Every call may fail transiently; callers log and retry on the next sweep.
//! Tag mutations are idempotent: adding a tag the member already has, or
//! removing one they lack, succeeds without change.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{MemberId, MessageRef};
use crate::error::Result;

/// A community member as listed by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    /// Automated accounts never take part in the lifecycle.
    #[serde(default)]
    pub bot: bool,
}

impl Member {
    pub fn new(id: impl Into<MemberId>) -> Self {
        Self {
            id: id.into(),
            bot: false,
        }
    }

    pub fn bot(id: impl Into<MemberId>) -> Self {
        Self {
            id: id.into(),
            bot: true,
        }
    }
}

/// Membership and tag (role) operations.
pub trait TagService: Send + Sync {
    /// Every current member of the community.
    fn list_members(&self) -> Result<Vec<Member>>;

    /// Whether `member` carries `tag`. A member no longer in the community
    /// carries no tags.
    fn has_tag(&self, member: &str, tag: &str) -> Result<bool>;

    /// Give `member` the `tag`, recording `reason` in the platform audit log.
    fn add_tag(&self, member: &str, tag: &str, reason: &str) -> Result<()>;

    /// Take `tag` away from `member`.
    fn remove_tag(&self, member: &str, tag: &str, reason: &str) -> Result<()>;
}

/// Notification delivery.
pub trait Notifier: Send + Sync {
    /// Post `text` to `channel`, returning a handle to the message.
    fn send(&self, channel: &str, text: &str) -> Result<MessageRef>;

    /// Delete a previously sent message. Retracting a message that is
    /// already gone succeeds.
    fn retract(&self, message: &MessageRef) -> Result<()>;

    /// Add a quick-action (reaction) members can click on the message.
    fn attach_quick_action(&self, message: &MessageRef, symbol: &str) -> Result<()>;
}

impl<T: TagService + ?Sized> TagService for Arc<T> {
    fn list_members(&self) -> Result<Vec<Member>> {
        (**self).list_members()
    }

    fn has_tag(&self, member: &str, tag: &str) -> Result<bool> {
        (**self).has_tag(member, tag)
    }

    fn add_tag(&self, member: &str, tag: &str, reason: &str) -> Result<()> {
        (**self).add_tag(member, tag, reason)
    }

    fn remove_tag(&self, member: &str, tag: &str, reason: &str) -> Result<()> {
        (**self).remove_tag(member, tag, reason)
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn send(&self, channel: &str, text: &str) -> Result<MessageRef> {
        (**self).send(channel, text)
    }

    fn retract(&self, message: &MessageRef) -> Result<()> {
        (**self).retract(message)
    }

    fn attach_quick_action(&self, message: &MessageRef, symbol: &str) -> Result<()> {
        (**self).attach_quick_action(message, symbol)
    }
}
