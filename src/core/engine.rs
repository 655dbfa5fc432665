//! Infection lifecycle state machine.
//!
//! The engine is a pure decision function: given now, a member's record (if
//! any) and the tags the platform reports for that member, it says what the
//! next transition is. Applying the transition (tag changes, notifications,
//! persistence) is the sweep's job.
//!
//! Evaluation order, first match wins:
//!
//! 0. member left the community: stop tracking, nothing left to tag
//! 1. a terminal outcome already decided but not fully applied is re-applied
//! 2. chronic tag present: terminal, never evaluated again
//! 3. infected tag gone: stop tracking
//! 4. infected tag without a record: start tracking, then keep evaluating
//! 5. treatment elapsed: cure
//! 6. chronic deadline passed without treatment: chronic
//! 7. window open, no offer outstanding, no treatment: issue offer
//! 8. offer outstanding past its lifetime: expire it

use chrono::Duration;

use crate::config::Config;
use crate::core::record::{MemberRecord, Outcome, Timestamp};
use crate::core::window::WindowOracle;
use crate::error::Result;

/// Tags the platform currently reports for a member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagFacts {
    pub infected: bool,
    pub chronic: bool,
    /// The member is no longer listed in the community.
    pub departed: bool,
}

impl TagFacts {
    pub fn new(infected: bool, chronic: bool) -> Self {
        Self {
            infected,
            chronic,
            departed: false,
        }
    }

    /// Facts for a member the community no longer lists.
    pub fn departed() -> Self {
        Self {
            departed: true,
            ..Self::default()
        }
    }
}

/// Side effect required to realize a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Remove the infected tag and stop tracking.
    Cure,
    /// Swap the infected tag for the chronic tag and stop tracking.
    Chronic,
    /// Post a treatment offer and remember it.
    IssueOffer,
    /// Retract the outstanding offer and forget it.
    ExpireOffer,
}

impl Effect {
    /// The terminal outcome this effect realizes, if any.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            Self::Cure => Some(Outcome::Cured),
            Self::Chronic => Some(Outcome::Chronic),
            Self::IssueOffer | Self::ExpireOffer => None,
        }
    }

    fn for_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Cured => Self::Cure,
            Outcome::Chronic => Self::Chronic,
        }
    }
}

/// Why a record is dropped without a terminal effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntrackReason {
    /// The member already carries the chronic tag.
    AlreadyChronic,
    /// The infected tag was removed by someone else.
    TagRemoved,
    /// The member left the community.
    Departed,
}

impl std::fmt::Display for UntrackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyChronic => write!(f, "already chronic"),
            Self::TagRemoved => write!(f, "infected tag removed externally"),
            Self::Departed => write!(f, "member left the community"),
        }
    }
}

/// What should happen to one member on this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing tracked and nothing to do.
    Ignore,
    /// Drop the record; no tag changes.
    Untrack(UntrackReason),
    /// Keep tracking `record`, applying `effect` and the quarantine tag if asked.
    Advance {
        record: MemberRecord,
        created: bool,
        effect: Option<Effect>,
        quarantine: bool,
    },
}

/// Durations that drive the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub offer_lifetime: Duration,
    pub treatment_duration: Duration,
    pub chronic_deadline: Duration,
    /// Infection age at which to quarantine; `None` disables quarantine.
    pub quarantine_after: Option<Duration>,
}

impl LifecyclePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            offer_lifetime: config.timers.offer_lifetime(),
            treatment_duration: config.timers.treatment_duration(),
            chronic_deadline: config.timers.chronic_deadline(),
            quarantine_after: config
                .community
                .quarantine_tag
                .as_ref()
                .map(|_| config.timers.quarantine_after()),
        }
    }
}

/// The lifecycle state machine.
#[derive(Debug, Clone)]
pub struct Engine {
    policy: LifecyclePolicy,
    oracle: WindowOracle,
}

impl Engine {
    pub fn new(policy: LifecyclePolicy, oracle: WindowOracle) -> Self {
        Self { policy, oracle }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            LifecyclePolicy::from_config(config),
            WindowOracle::from_config(&config.schedule)?,
        ))
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    pub fn oracle(&self) -> &WindowOracle {
        &self.oracle
    }

    /// Decide the next transition for one member.
    pub fn evaluate(
        &self,
        now: Timestamp,
        record: Option<&MemberRecord>,
        facts: TagFacts,
    ) -> Decision {
        if facts.departed {
            return match record {
                Some(_) => Decision::Untrack(UntrackReason::Departed),
                None => Decision::Ignore,
            };
        }

        if let Some(existing) = record {
            if let Some(outcome) = existing.pending_outcome {
                return Decision::Advance {
                    record: existing.clone(),
                    created: false,
                    effect: Some(Effect::for_outcome(outcome)),
                    quarantine: false,
                };
            }
        }

        if facts.chronic {
            return match record {
                Some(_) => Decision::Untrack(UntrackReason::AlreadyChronic),
                None => Decision::Ignore,
            };
        }

        if !facts.infected {
            return match record {
                Some(_) => Decision::Untrack(UntrackReason::TagRemoved),
                None => Decision::Ignore,
            };
        }

        let (record, created) = match record {
            Some(existing) => (existing.clone(), false),
            None => (MemberRecord::new(now), true),
        };

        let effect = self.next_effect(now, &record);
        let quarantine = !matches!(effect, Some(Effect::Cure | Effect::Chronic))
            && self.needs_quarantine(now, &record);

        Decision::Advance {
            record,
            created,
            effect,
            quarantine,
        }
    }

    fn next_effect(&self, now: Timestamp, record: &MemberRecord) -> Option<Effect> {
        if let Some(started) = record.treatment_started_at {
            if now.signed_duration_since(started) >= self.policy.treatment_duration {
                return Some(Effect::Cure);
            }
        } else if record.infection_age(now) >= self.policy.chronic_deadline {
            return Some(Effect::Chronic);
        }

        if self.oracle.is_open(now) && !record.has_open_offer() && !record.treatment_started() {
            return Some(Effect::IssueOffer);
        }

        match record.offer_age(now) {
            Some(age) if age > self.policy.offer_lifetime => Some(Effect::ExpireOffer),
            _ => None,
        }
    }

    fn needs_quarantine(&self, now: Timestamp, record: &MemberRecord) -> bool {
        match self.policy.quarantine_after {
            Some(after) => record.quarantined_at.is_none() && record.infection_age(now) >= after,
            None => false,
        }
    }
}
