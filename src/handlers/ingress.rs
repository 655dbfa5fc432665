//! Member event ingress.
//!
//! A member accepts a treatment offer by clicking its quick action. The
//! acceptance is validated against a fresh load of the store under the
//! community lock; stale or spoofed events are outcomes, not errors.

use serde::{Deserialize, Serialize};

use crate::core::{MemberId, MessageRef, Timestamp};
use crate::error::Result;
use crate::handlers::LifecycleRunner;
use crate::journal::Transition;
use crate::observability::ingress_span;
use crate::platform::{message, Notifier, TagService};
use crate::storage::RecordStore;

/// A quick action clicked by a member on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Who clicked.
    pub member: MemberId,
    /// Message the action was clicked on.
    pub message_ref: MessageRef,
    /// Which quick action.
    pub symbol: String,
    /// When the click happened.
    pub at: Timestamp,
}

/// Result of an acceptance attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcceptOutcome {
    /// Treatment started.
    Started { cured_at: Timestamp },
    /// The member has no record; stale or spoofed event.
    Untracked,
    /// Treatment was already running; the countdown is not restarted.
    AlreadyStarted,
    /// The episode already reached its outcome.
    Concluded,
    /// Not the accept symbol.
    WrongSymbol,
    /// Not the member's own outstanding offer.
    NotCurrentOffer,
    /// The offer outlived its lifetime before the click.
    OfferExpired,
}

impl AcceptOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }

    /// Short description for logs and CLI output.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Started { .. } => "treatment started",
            Self::Untracked => "member is not infected",
            Self::AlreadyStarted => "treatment already started",
            Self::Concluded => "episode already concluded",
            Self::WrongSymbol => "not the accept symbol",
            Self::NotCurrentOffer => "not the member's outstanding offer",
            Self::OfferExpired => "offer expired",
        }
    }
}

impl<S: RecordStore, T: TagService, N: Notifier> LifecycleRunner<S, T, N> {
    /// Start treatment for `member` at `at`.
    ///
    /// A no-op unless the member is tracked and has not started treatment.
    pub fn accept(&self, member: &str, at: Timestamp) -> Result<AcceptOutcome> {
        let span = ingress_span("accept", &self.community.id, member);
        let _guard = span.enter();
        self.locks
            .with_lock(&self.community.id, || self.accept_locked(member, at, None))
    }

    /// Handle a quick action clicked on a message.
    ///
    /// Only the accept symbol on the member's own, still valid offer counts.
    pub fn handle_action(&self, event: &ActionEvent) -> Result<AcceptOutcome> {
        let span = ingress_span("action", &self.community.id, &event.member);
        let _guard = span.enter();

        if event.symbol != self.community.action_symbol {
            tracing::debug!(symbol = %event.symbol, "ignoring quick action");
            return Ok(AcceptOutcome::WrongSymbol);
        }

        self.locks.with_lock(&self.community.id, || {
            self.accept_locked(&event.member, event.at, Some(&event.message_ref))
        })
    }

    fn accept_locked(
        &self,
        member: &str,
        at: Timestamp,
        offer: Option<&MessageRef>,
    ) -> Result<AcceptOutcome> {
        let at = at.with_timezone(&self.engine.oracle().offset());
        let mut records = self.load_records()?;
        let offer_lifetime = self.engine.policy().offer_lifetime;
        let treatment_duration = self.engine.policy().treatment_duration;

        let Some(record) = records.get_mut(member) else {
            tracing::debug!("acceptance from untracked member ignored");
            return Ok(AcceptOutcome::Untracked);
        };

        let rejected = if record.pending_outcome.is_some() {
            Some(AcceptOutcome::Concluded)
        } else if record.treatment_started() {
            Some(AcceptOutcome::AlreadyStarted)
        } else if offer.is_some_and(|r| record.offer_message_ref.as_ref() != Some(r)) {
            Some(AcceptOutcome::NotCurrentOffer)
        } else if offer.is_some() && record.offer_age(at).is_some_and(|age| age > offer_lifetime) {
            Some(AcceptOutcome::OfferExpired)
        } else {
            None
        };
        if let Some(outcome) = rejected {
            tracing::debug!(outcome = outcome.describe(), "acceptance ignored");
            return Ok(outcome);
        }

        record.start_treatment(at)?;
        let consumed = record.clear_offer();
        let cured_at = at + treatment_duration;

        self.store.save_all(&records)?;

        if let Some(message) = &consumed {
            self.retract_best_effort(message);
        }
        tracing::info!(cured_at = %cured_at, "treatment started");
        self.journal
            .record(member, at, Transition::TreatmentStarted { cured_at });
        self.notify_best_effort(&message::treatment_started(member, cured_at));

        Ok(AcceptOutcome::Started { cured_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::tests::at;
    use crate::handlers::tests::harness;

    fn event(member: &str, message: &MessageRef, symbol: &str, minutes: i64) -> ActionEvent {
        ActionEvent {
            member: member.to_string(),
            message_ref: message.clone(),
            symbol: symbol.to_string(),
            at: at(minutes),
        }
    }

    #[test]
    fn test_accept_starts_treatment_and_consumes_offer() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();

        let outcome = h.runner.accept("1", at(7)).unwrap();
        assert_eq!(outcome, AcceptOutcome::Started { cured_at: at(47) });

        let record = h.records().get("1").cloned().unwrap();
        assert_eq!(record.treatment_started_at, Some(at(7)));
        assert!(!record.has_open_offer());
        assert!(h
            .notifier
            .containing("Tratamento disponível")
            .iter()
            .all(|m| m.retracted));
        let started = h.notifier.containing("Tratamento iniciado");
        assert_eq!(started.len(), 1);
        assert!(started[0].text.contains("00:47"));
    }

    #[test]
    fn test_accept_without_record_is_ignored() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);

        let outcome = h.runner.accept("1", at(7)).unwrap();
        assert_eq!(outcome, AcceptOutcome::Untracked);
        assert!(h.records().is_empty());
        assert!(h.notifier.sent().is_empty());
        assert_eq!(h.store.save_count(), 0);
    }

    #[test]
    fn test_second_accept_is_a_no_op() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        h.runner.accept("1", at(3)).unwrap();

        let outcome = h.runner.accept("1", at(9)).unwrap();
        assert_eq!(outcome, AcceptOutcome::AlreadyStarted);
        assert_eq!(
            h.records().get("1").unwrap().treatment_started_at,
            Some(at(3))
        );
        assert_eq!(h.notifier.containing("Tratamento iniciado").len(), 1);
    }

    #[test]
    fn test_accept_after_concluded_outcome_is_ignored() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.set(30);
        h.runner.sweep().unwrap();

        let mut records = h.records();
        records.get_mut("1").unwrap().pending_outcome = Some(crate::core::Outcome::Chronic);
        h.store.save_all(&records).unwrap();

        assert_eq!(
            h.runner.accept("1", at(31)).unwrap(),
            AcceptOutcome::Concluded
        );
    }

    #[test]
    fn test_action_on_own_offer_starts_treatment() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        let offer = h.records().get("1").unwrap().offer_message_ref.clone().unwrap();

        let outcome = h.runner.handle_action(&event("1", &offer, "💊", 4)).unwrap();
        assert!(outcome.is_started());
    }

    #[test]
    fn test_action_in_utc_is_stored_in_community_offset() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        let offer = h.records().get("1").unwrap().offer_message_ref.clone().unwrap();

        let mut action = event("1", &offer, "💊", 2);
        action.at = at(2).with_timezone(&chrono::Utc).fixed_offset();
        let outcome = h.runner.handle_action(&action).unwrap();
        assert_eq!(outcome, AcceptOutcome::Started { cured_at: at(42) });

        let started = h.records().get("1").unwrap().treatment_started_at.unwrap();
        assert_eq!(started, at(2));
        assert_eq!(started.offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_action_with_wrong_symbol_is_ignored() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        let offer = h.records().get("1").unwrap().offer_message_ref.clone().unwrap();

        let outcome = h.runner.handle_action(&event("1", &offer, "👍", 4)).unwrap();
        assert_eq!(outcome, AcceptOutcome::WrongSymbol);
        assert!(!h.records().get("1").unwrap().treatment_started());
    }

    #[test]
    fn test_action_on_another_members_offer_is_ignored() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.tags.add_member("2", &["sav"]);
        h.runner.sweep().unwrap();
        let offer_for_two = h.records().get("2").unwrap().offer_message_ref.clone().unwrap();

        let outcome = h
            .runner
            .handle_action(&event("1", &offer_for_two, "💊", 4))
            .unwrap();
        assert_eq!(outcome, AcceptOutcome::NotCurrentOffer);
        assert!(!h.records().get("1").unwrap().treatment_started());
        assert!(!h.records().get("2").unwrap().treatment_started());
    }

    #[test]
    fn test_action_on_expired_offer_is_ignored() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        let offer = h.records().get("1").unwrap().offer_message_ref.clone().unwrap();

        // No sweep has retracted it yet.
        let outcome = h.runner.handle_action(&event("1", &offer, "💊", 11)).unwrap();
        assert_eq!(outcome, AcceptOutcome::OfferExpired);
    }

    #[test]
    fn test_action_on_retracted_offer_is_ignored() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        let offer = h.records().get("1").unwrap().offer_message_ref.clone().unwrap();
        h.set(15);
        h.runner.sweep().unwrap();

        let outcome = h.runner.handle_action(&event("1", &offer, "💊", 16)).unwrap();
        assert_eq!(outcome, AcceptOutcome::NotCurrentOffer);
    }

    #[test]
    fn test_accept_and_sweep_interleave_safely() {
        let h = harness();
        for id in ["1", "2", "3", "4"] {
            h.tags.add_member(id, &["sav"]);
        }
        h.runner.sweep().unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| h.runner.sweep().unwrap());
            for id in ["1", "2", "3", "4"] {
                let runner = &h.runner;
                scope.spawn(move || runner.accept(id, at(3)).unwrap());
            }
        });

        let records = h.records();
        for id in ["1", "2", "3", "4"] {
            assert!(records.get(id).unwrap().treatment_started(), "member {}", id);
        }
    }

    #[test]
    fn test_accept_outcome_serialization() {
        let json = serde_json::to_string(&AcceptOutcome::Started { cured_at: at(47) }).unwrap();
        assert!(json.contains("\"outcome\":\"started\""));
        assert!(json.contains("2026-03-10T00:47:00-03:00"));
        assert_eq!(
            serde_json::to_string(&AcceptOutcome::AlreadyStarted).unwrap(),
            "{\"outcome\":\"already_started\"}"
        );
    }
}
