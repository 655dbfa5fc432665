//! Member lifecycle records.
//!
//! One [`MemberRecord`] exists per tracked member for the duration of an
//! infection episode. All timestamps carry the configured civil offset so
//! elapsed-time math survives restarts and is independent of the host zone.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{OutbreakError, Result};

/// Member identifier as the platform reports it.
pub type MemberId = String;

/// A timestamp in the configured civil offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Schema version of the persisted record set.
pub const RECORDS_SCHEMA_VERSION: u8 = 1;

/// Opaque handle to a notification, used only to retract it later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(pub String);

impl MessageRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal outcome of an infection episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Treatment ran its full course.
    Cured,
    /// Deadline passed without treatment.
    Chronic,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cured => write!(f, "cured"),
            Self::Chronic => write!(f, "chronic"),
        }
    }
}

/// Lifecycle state of one infected member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// When the infection was first observed. Never changes.
    pub infected_at: Timestamp,
    /// When the outstanding treatment offer was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_sent_at: Option<Timestamp>,
    /// Notification carrying the outstanding offer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_message_ref: Option<MessageRef>,
    /// When the member accepted treatment. Set at most once per episode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_started_at: Option<Timestamp>,
    /// When the quarantine tag was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarantined_at: Option<Timestamp>,
    /// Terminal outcome decided but not yet fully applied to tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_outcome: Option<Outcome>,
}

impl MemberRecord {
    /// Start tracking an infection observed at `infected_at`.
    pub fn new(infected_at: Timestamp) -> Self {
        Self {
            infected_at,
            offer_sent_at: None,
            offer_message_ref: None,
            treatment_started_at: None,
            quarantined_at: None,
            pending_outcome: None,
        }
    }

    /// Whether an offer is currently outstanding.
    pub fn has_open_offer(&self) -> bool {
        self.offer_sent_at.is_some()
    }

    /// Whether the member has accepted treatment.
    pub fn treatment_started(&self) -> bool {
        self.treatment_started_at.is_some()
    }

    /// How long the member has been infected.
    pub fn infection_age(&self, now: Timestamp) -> Duration {
        now.signed_duration_since(self.infected_at)
    }

    /// Age of the outstanding offer, if any.
    pub fn offer_age(&self, now: Timestamp) -> Option<Duration> {
        self.offer_sent_at.map(|sent| now.signed_duration_since(sent))
    }

    /// When treatment completes, given its duration.
    pub fn cured_at(&self, treatment_duration: Duration) -> Option<Timestamp> {
        self.treatment_started_at
            .map(|started| started + treatment_duration)
    }

    /// Record an issued offer.
    pub fn issue_offer(&mut self, at: Timestamp, message: MessageRef) -> Result<()> {
        if self.has_open_offer() {
            return Err(OutbreakError::invalid_state(
                "an offer is already outstanding",
            ));
        }
        self.offer_sent_at = Some(at);
        self.offer_message_ref = Some(message);
        Ok(())
    }

    /// Clear the outstanding offer, returning its message for retraction.
    pub fn clear_offer(&mut self) -> Option<MessageRef> {
        self.offer_sent_at = None;
        self.offer_message_ref.take()
    }

    /// Start treatment at `at`.
    pub fn start_treatment(&mut self, at: Timestamp) -> Result<()> {
        if self.treatment_started() {
            return Err(OutbreakError::invalid_state(
                "treatment already started for this episode",
            ));
        }
        self.treatment_started_at = Some(at);
        Ok(())
    }
}

/// All records for one community, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Schema version for forward compatibility.
    pub version: u8,
    /// Community the records belong to.
    pub community: String,
    /// Records keyed by member id.
    #[serde(default)]
    pub members: BTreeMap<MemberId, MemberRecord>,
}

impl RecordSet {
    /// An empty record set for `community`.
    pub fn new(community: impl Into<String>) -> Self {
        Self {
            version: RECORDS_SCHEMA_VERSION,
            community: community.into(),
            members: BTreeMap::new(),
        }
    }

    pub fn get(&self, member: &str) -> Option<&MemberRecord> {
        self.members.get(member)
    }

    pub fn get_mut(&mut self, member: &str) -> Option<&mut MemberRecord> {
        self.members.get_mut(member)
    }

    pub fn insert(&mut self, member: impl Into<MemberId>, record: MemberRecord) {
        self.members.insert(member.into(), record);
    }

    pub fn remove(&mut self, member: &str) -> Option<MemberRecord> {
        self.members.remove(member)
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.contains_key(member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Tracked member ids in stable order.
    pub fn member_ids(&self) -> impl Iterator<Item = &MemberId> {
        self.members.keys()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// 2026-03-10 00:00 at -03:00, plus `minutes`.
    pub(crate) fn at(minutes: i64) -> Timestamp {
        FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 10, 0, 0, 0)
            .unwrap()
            + Duration::minutes(minutes)
    }

    #[test]
    fn test_new_record_is_bare() {
        let record = MemberRecord::new(at(0));
        assert!(!record.has_open_offer());
        assert!(!record.treatment_started());
        assert!(record.pending_outcome.is_none());
        assert_eq!(record.infection_age(at(90)), Duration::minutes(90));
    }

    #[test]
    fn test_issue_and_clear_offer_together() {
        let mut record = MemberRecord::new(at(0));
        record.issue_offer(at(5), MessageRef::new("msg_1")).unwrap();
        assert!(record.has_open_offer());
        assert_eq!(record.offer_age(at(12)), Some(Duration::minutes(7)));

        let err = record.issue_offer(at(6), MessageRef::new("msg_2"));
        assert!(err.is_err());

        let cleared = record.clear_offer();
        assert_eq!(cleared, Some(MessageRef::new("msg_1")));
        assert!(record.offer_sent_at.is_none());
        assert!(record.offer_message_ref.is_none());
    }

    #[test]
    fn test_start_treatment_once() {
        let mut record = MemberRecord::new(at(0));
        record.start_treatment(at(7)).unwrap();
        assert!(record.start_treatment(at(9)).is_err());
        assert_eq!(record.treatment_started_at, Some(at(7)));
        assert_eq!(record.cured_at(Duration::minutes(40)), Some(at(47)));
    }

    #[test]
    fn test_serialization_keeps_offset() {
        let mut record = MemberRecord::new(at(0));
        record.issue_offer(at(5), MessageRef::new("msg_7")).unwrap();

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("2026-03-10T00:00:00-03:00"));
        assert!(json.contains("\"offer_message_ref\":\"msg_7\""));
        assert!(!json.contains("treatment_started_at"));

        let parsed: MemberRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.infected_at.offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_record_set_basics() {
        let mut set = RecordSet::new("guild-1");
        assert!(set.is_empty());
        set.insert("b", MemberRecord::new(at(0)));
        set.insert("a", MemberRecord::new(at(1)));
        assert_eq!(set.len(), 2);
        assert!(set.contains("a"));
        let ids: Vec<_> = set.member_ids().cloned().collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert!(set.remove("a").is_some());
        assert!(set.get("a").is_none());
    }

    #[test]
    fn test_outcome_serde() {
        assert_eq!(serde_json::to_string(&Outcome::Chronic).unwrap(), "\"chronic\"");
        assert_eq!(Outcome::Cured.to_string(), "cured");
    }
}
