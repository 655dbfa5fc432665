//! Reconciliation sweep.
//!
//! One pass loads the community's records once, evaluates every tracked
//! member plus every listed non-bot member, applies the resulting effects
//! and saves once. A member whose tags cannot be read, or whose side effects
//! fail, keeps its record and is retried on the next pass; nothing one member
//! does aborts the pass for the others.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::{Decision, Effect, MemberId, MemberRecord, Outcome, RecordSet, TagFacts, Timestamp};
use crate::error::Result;
use crate::handlers::LifecycleRunner;
use crate::journal::Transition;
use crate::observability::sweep_span;
use crate::platform::{message, Notifier, TagService};
use crate::storage::RecordStore;

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Members evaluated.
    pub evaluated: usize,
    /// Newly tracked infections.
    pub infected: usize,
    /// Quarantine tags applied.
    pub quarantined: usize,
    /// Offers posted.
    pub offers_issued: usize,
    /// Offers retracted after their lifetime.
    pub offers_expired: usize,
    /// Members cured.
    pub cured: usize,
    /// Members turned chronic.
    pub chronic: usize,
    /// Records dropped without a terminal effect.
    pub untracked: usize,
    /// Records still tracked after the sweep.
    pub tracked: usize,
    /// Failed operations, retried next sweep.
    pub failures: usize,
    /// Members with at least one failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_members: Vec<MemberId>,
}

impl SweepReport {
    /// Whether any transition happened.
    pub fn has_changes(&self) -> bool {
        self.infected
            + self.quarantined
            + self.offers_issued
            + self.offers_expired
            + self.cured
            + self.chronic
            + self.untracked
            > 0
    }

    fn record_failure(&mut self, member: &str) {
        self.failures += 1;
        if !self.failed_members.iter().any(|m| m == member) {
            self.failed_members.push(member.to_string());
        }
    }
}

impl<S: RecordStore, T: TagService, N: Notifier> LifecycleRunner<S, T, N> {
    /// Run one reconciliation pass at the clock's current instant.
    pub fn sweep(&self) -> Result<SweepReport> {
        let span = sweep_span(&self.community.id);
        let _guard = span.enter();
        self.locks
            .with_lock(&self.community.id, || self.sweep_locked(self.clock.now()))
    }

    fn sweep_locked(&self, now: Timestamp) -> Result<SweepReport> {
        let mut records = self.load_records()?;
        let mut report = SweepReport::default();

        let mut candidates: BTreeSet<MemberId> = records.member_ids().cloned().collect();
        let mut bots: HashSet<MemberId> = HashSet::new();
        // None when the listing failed; presence is then unknown.
        let mut listed: Option<HashSet<MemberId>> = None;
        match self.tags.list_members() {
            Ok(members) => {
                let mut present = HashSet::new();
                for member in members {
                    if member.bot {
                        bots.insert(member.id);
                    } else {
                        present.insert(member.id.clone());
                        candidates.insert(member.id);
                    }
                }
                listed = Some(present);
            }
            Err(e) => {
                tracing::warn!(error = %e, "member listing failed; evaluating tracked members only");
                report.failures += 1;
            }
        }

        for member in candidates.iter().filter(|m| !bots.contains(*m)) {
            report.evaluated += 1;
            let present = listed.as_ref().map_or(true, |l| l.contains(member));
            if let Err(e) = self.reconcile_member(now, member, present, &mut records, &mut report)
            {
                tracing::warn!(member = %member, error = %e, "member not reconciled; retrying next sweep");
                report.record_failure(member);
            }
        }

        self.store.save_all(&records)?;
        report.tracked = records.len();

        tracing::info!(
            evaluated = report.evaluated,
            infected = report.infected,
            offers_issued = report.offers_issued,
            offers_expired = report.offers_expired,
            cured = report.cured,
            chronic = report.chronic,
            untracked = report.untracked,
            tracked = report.tracked,
            failures = report.failures,
            "sweep complete"
        );
        Ok(report)
    }

    fn tag_facts(&self, member: &str, present: bool) -> Result<TagFacts> {
        if !present {
            return Ok(TagFacts::departed());
        }
        let infected = self.tags.has_tag(member, &self.community.infected_tag)?;
        let chronic = self.tags.has_tag(member, &self.community.chronic_tag)?;
        Ok(TagFacts::new(infected, chronic))
    }

    fn reconcile_member(
        &self,
        now: Timestamp,
        member: &str,
        present: bool,
        records: &mut RecordSet,
        report: &mut SweepReport,
    ) -> Result<()> {
        let facts = self.tag_facts(member, present)?;

        match self.engine.evaluate(now, records.get(member), facts) {
            Decision::Ignore => Ok(()),
            Decision::Untrack(reason) => {
                if let Some(mut record) = records.remove(member) {
                    if let Some(message) = record.clear_offer() {
                        self.retract_best_effort(&message);
                    }
                }
                tracing::info!(member, %reason, "stopped tracking member");
                self.journal.record(
                    member,
                    now,
                    Transition::Untracked {
                        reason: reason.to_string(),
                    },
                );
                report.untracked += 1;
                Ok(())
            }
            Decision::Advance {
                mut record,
                created,
                effect,
                quarantine,
            } => {
                if created {
                    tracing::info!(member, "infection observed");
                    self.journal.record(
                        member,
                        now,
                        Transition::Infected {
                            infected_at: record.infected_at,
                        },
                    );
                    report.infected += 1;
                }

                match self.apply_effects(now, member, &mut record, effect, quarantine, report) {
                    Ok(true) => {
                        records.remove(member);
                        Ok(())
                    }
                    Ok(false) => {
                        records.insert(member, record);
                        Ok(())
                    }
                    Err(e) => {
                        records.insert(member, record);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Apply the effects of one decision. Returns whether the episode ended.
    ///
    /// `record` reflects every step that succeeded, even on error.
    fn apply_effects(
        &self,
        now: Timestamp,
        member: &str,
        record: &mut MemberRecord,
        effect: Option<Effect>,
        quarantine: bool,
        report: &mut SweepReport,
    ) -> Result<bool> {
        let quarantined = if quarantine {
            self.quarantine(now, member, record)
        } else {
            Ok(false)
        };
        if matches!(quarantined, Ok(true)) {
            report.quarantined += 1;
        }

        let concluded = match effect {
            None => false,
            Some(Effect::Cure) => {
                self.conclude(now, member, record, Outcome::Cured)?;
                report.cured += 1;
                true
            }
            Some(Effect::Chronic) => {
                self.conclude(now, member, record, Outcome::Chronic)?;
                report.chronic += 1;
                true
            }
            Some(Effect::IssueOffer) => {
                self.issue_offer(now, member, record)?;
                report.offers_issued += 1;
                false
            }
            Some(Effect::ExpireOffer) => {
                self.expire_offer(now, member, record);
                report.offers_expired += 1;
                false
            }
        };

        quarantined?;
        Ok(concluded)
    }

    fn quarantine(&self, now: Timestamp, member: &str, record: &mut MemberRecord) -> Result<bool> {
        let Some(tag) = &self.community.quarantine_tag else {
            return Ok(false);
        };
        self.tags.add_tag(member, tag, "outbreak: quarantine")?;
        record.quarantined_at = Some(now);
        tracing::info!(member, tag = %tag, "member quarantined");
        self.journal
            .record(member, now, Transition::Quarantined { tag: tag.clone() });
        Ok(true)
    }

    /// Realize a terminal outcome on the member's tags.
    ///
    /// The outcome is stored on the record first, so a failure part way
    /// through is completed by a later sweep whatever the tags look like then.
    fn conclude(
        &self,
        now: Timestamp,
        member: &str,
        record: &mut MemberRecord,
        outcome: Outcome,
    ) -> Result<()> {
        record.pending_outcome = Some(outcome);

        if let Some(message) = record.clear_offer() {
            self.retract_best_effort(&message);
        }

        if let Err(e) = self.apply_outcome_tags(member, outcome) {
            self.journal.record(
                member,
                now,
                Transition::OutcomeDeferred {
                    outcome,
                    error: e.to_string(),
                },
            );
            return Err(e);
        }

        let infected_at = record.infected_at;
        match outcome {
            Outcome::Cured => {
                tracing::info!(member, "member cured");
                self.journal
                    .record(member, now, Transition::Cured { infected_at });
                self.notify_best_effort(&message::cured(member));
            }
            Outcome::Chronic => {
                tracing::info!(member, "member turned chronic");
                self.journal
                    .record(member, now, Transition::Chronic { infected_at });
                self.notify_best_effort(&message::chronic(member));
            }
        }
        Ok(())
    }

    /// Infected tag off first, then quarantine off, then chronic on.
    fn apply_outcome_tags(&self, member: &str, outcome: Outcome) -> Result<()> {
        let reason = format!("outbreak: {}", outcome);
        self.tags
            .remove_tag(member, &self.community.infected_tag, &reason)?;
        if let Some(tag) = &self.community.quarantine_tag {
            self.tags.remove_tag(member, tag, &reason)?;
        }
        if outcome == Outcome::Chronic {
            self.tags
                .add_tag(member, &self.community.chronic_tag, &reason)?;
        }
        Ok(())
    }

    fn issue_offer(&self, now: Timestamp, member: &str, record: &mut MemberRecord) -> Result<()> {
        let symbol = &self.community.action_symbol;
        let text = message::treatment_offer(member, self.engine.policy().offer_lifetime, symbol);
        let message = self.notifier.send(&self.community.channel, &text)?;

        // An offer nobody can click is worse than none.
        if let Err(e) = self.notifier.attach_quick_action(&message, symbol) {
            self.retract_best_effort(&message);
            return Err(e);
        }

        record.issue_offer(now, message.clone())?;
        tracing::info!(member, message = %message, "treatment offer issued");
        self.journal
            .record(member, now, Transition::OfferIssued { message });
        Ok(())
    }

    fn expire_offer(&self, now: Timestamp, member: &str, record: &mut MemberRecord) {
        let message = record.clear_offer();
        if let Some(message) = &message {
            self.retract_best_effort(message);
        }
        tracing::info!(member, "treatment offer expired");
        self.journal
            .record(member, now, Transition::OfferExpired { message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::core::record::tests::at;
    use crate::handlers::tests::{harness, harness_with};
    use crate::journal::Journal;
    use tempfile::TempDir;

    #[test]
    fn test_new_infection_is_tracked_and_offered_in_window() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);

        let report = h.runner.sweep().unwrap();
        assert_eq!(report.infected, 1);
        assert_eq!(report.offers_issued, 1);
        assert_eq!(report.tracked, 1);

        let record = h.records().get("1").cloned().unwrap();
        assert_eq!(record.infected_at, at(0));
        assert_eq!(record.offer_sent_at, Some(at(0)));

        let offers = h.notifier.containing("Tratamento disponível");
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].channel, "quarentena");
        assert_eq!(offers[0].actions, vec!["💊".to_string()]);
        assert_eq!(Some(&offers[0].reference), record.offer_message_ref.as_ref());
    }

    #[test]
    fn test_no_offer_outside_window() {
        let h = harness();
        h.set(30);
        h.tags.add_member("1", &["sav"]);

        let report = h.runner.sweep().unwrap();
        assert_eq!(report.infected, 1);
        assert_eq!(report.offers_issued, 0);
        assert!(h.notifier.sent().is_empty());
    }

    #[test]
    fn test_repeated_sweeps_in_one_window_send_one_offer() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        for minute in [0, 3, 5, 10] {
            h.set(minute);
            h.runner.sweep().unwrap();
        }
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[test]
    fn test_offer_expires_and_next_window_offers_again() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();

        h.set(15);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.offers_expired, 1);
        assert!(h.notifier.live().is_empty());
        assert!(!h.records().get("1").unwrap().has_open_offer());

        h.set(120);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.offers_issued, 1);
        assert_eq!(h.notifier.live().len(), 1);
    }

    #[test]
    fn test_chronic_at_deadline_with_offer_outstanding() {
        // Infected at 00:05, swept every 5 minutes for 48 hours.
        let h = harness();
        h.tags.add_member("1", &["sav"]);

        for step in 0..576 {
            h.set(5 + step * 5);
            h.runner.sweep().unwrap();
        }
        // Last sweep at 00:00 two days later opened a fresh offer.
        let record = h.records().get("1").cloned().unwrap();
        assert_eq!(record.infected_at, at(5));
        assert!(record.has_open_offer());
        assert!(h.tags.tags_of("1").contains("sav"));

        h.set(5 + 576 * 5);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.chronic, 1);
        assert_eq!(report.offers_issued, 0);
        assert!(!h.records().contains("1"));

        let tags = h.tags.tags_of("1");
        assert!(tags.contains("cronica"));
        assert!(!tags.contains("sav"));
        assert!(h.notifier.containing("Tratamento disponível").iter().all(|m| m.retracted));
        assert_eq!(h.notifier.containing("Crônica").len(), 1);
    }

    #[test]
    fn test_accepted_treatment_cures_without_chronic() {
        // Infected at 23:55, offer at 00:00, accepted at 00:02.
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.set(-5);
        h.runner.sweep().unwrap();

        h.set(0);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.offers_issued, 1);

        h.runner.accept("1", at(2)).unwrap();

        h.set(40);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.cured, 0);
        assert!(h.records().contains("1"));

        h.set(42);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.cured, 1);
        assert!(!h.records().contains("1"));
        assert!(h.tags.tags_of("1").is_empty());
        assert_eq!(h.notifier.containing("Curado").len(), 1);

        // Nothing left to do afterwards, ever.
        h.set(60 * 48);
        let report = h.runner.sweep().unwrap();
        assert!(!report.has_changes());
        assert!(!h.tags.tags_of("1").contains("cronica"));
    }

    #[test]
    fn test_treatment_in_progress_beats_deadline() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();

        let mut records = h.records();
        let record = records.get_mut("1").unwrap();
        record.clear_offer();
        record.start_treatment(at(60 * 48 - 20)).unwrap();
        h.store.save_all(&records).unwrap();

        h.set(60 * 48);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.chronic, 0);
        assert!(h.records().contains("1"));

        h.set(60 * 48 + 20);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.cured, 1);
        assert!(!h.tags.tags_of("1").contains("cronica"));
    }

    #[test]
    fn test_failed_cure_is_retried_next_sweep() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        h.runner.accept("1", at(2)).unwrap();

        h.tags.fail_writes_for("1", true);
        h.set(42);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.cured, 0);
        assert_eq!(report.failures, 1);
        assert_eq!(report.failed_members, vec!["1".to_string()]);
        let record = h.records().get("1").cloned().unwrap();
        assert_eq!(record.pending_outcome, Some(Outcome::Cured));

        h.tags.fail_writes_for("1", false);
        h.set(47);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.cured, 1);
        assert!(!h.records().contains("1"));
        assert!(h.tags.tags_of("1").is_empty());
    }

    #[test]
    fn test_pending_cure_for_departed_member_is_dropped() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        h.runner.accept("1", at(2)).unwrap();

        h.tags.fail_writes_for("1", true);
        h.set(42);
        assert_eq!(h.runner.sweep().unwrap().failures, 1);
        assert_eq!(
            h.records().get("1").unwrap().pending_outcome,
            Some(Outcome::Cured)
        );

        h.tags.fail_writes_for("1", false);
        h.tags.remove_member("1");
        h.set(47);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.untracked, 1);
        assert_eq!(report.failures, 0);
        assert!(!h.records().contains("1"));

        for minutes in 48..52 {
            h.set(minutes);
            let report = h.runner.sweep().unwrap();
            assert_eq!(report.failures, 0);
            assert_eq!(report.tracked, 0);
        }
    }

    #[test]
    fn test_tracked_member_kept_when_listing_fails() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();

        h.tags.fail_listing(true);
        h.set(5);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.untracked, 0);
        assert!(h.records().contains("1"));
    }

    #[test]
    fn test_pending_chronic_completes_even_after_infected_tag_is_gone() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.set(30);
        h.runner.sweep().unwrap();

        let mut records = h.records();
        records.get_mut("1").unwrap().pending_outcome = Some(Outcome::Chronic);
        h.store.save_all(&records).unwrap();
        h.tags.remove_tag("1", "sav", "test").unwrap();

        h.set(35);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.chronic, 1);
        assert_eq!(report.untracked, 0);
        assert!(h.tags.tags_of("1").contains("cronica"));
    }

    #[test]
    fn test_removed_infected_tag_untracks_and_retracts_offer() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        assert_eq!(h.notifier.live().len(), 1);

        h.tags.remove_tag("1", "sav", "test").unwrap();
        h.set(5);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.untracked, 1);
        assert!(!h.records().contains("1"));
        assert!(h.notifier.live().is_empty());
    }

    #[test]
    fn test_chronic_member_is_never_tracked() {
        let h = harness();
        h.tags.add_member("1", &["sav", "cronica"]);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.infected, 0);
        assert!(h.records().is_empty());
        assert!(h.notifier.sent().is_empty());
    }

    #[test]
    fn test_departed_member_is_untracked() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.set(30);
        h.runner.sweep().unwrap();

        h.tags.remove_member("1");
        h.set(35);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.untracked, 1);
        assert!(h.records().is_empty());
    }

    #[test]
    fn test_bots_are_skipped() {
        let h = harness();
        h.tags.add_bot("bot", &["sav"]);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.evaluated, 0);
        assert!(h.records().is_empty());
    }

    #[test]
    fn test_one_failing_member_does_not_block_others() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.tags.add_member("2", &["sav"]);
        h.tags.fail_reads_for("1", true);

        let report = h.runner.sweep().unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(report.failed_members, vec!["1".to_string()]);
        assert_eq!(report.infected, 1);
        assert!(h.records().contains("2"));
        assert!(!h.records().contains("1"));
    }

    #[test]
    fn test_failed_tag_read_keeps_record_unchanged() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.set(30);
        h.runner.sweep().unwrap();
        let before = h.records().get("1").cloned().unwrap();

        h.tags.fail_reads_for("1", true);
        h.tags.remove_tag("1", "sav", "test").unwrap();
        h.set(35);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(h.records().get("1"), Some(&before));
    }

    #[test]
    fn test_listing_failure_still_evaluates_tracked_members() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.set(30);
        h.runner.sweep().unwrap();

        h.tags.fail_listing(true);
        h.set(120);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(report.evaluated, 1);
        assert_eq!(report.offers_issued, 1);
    }

    #[test]
    fn test_corrupt_store_starts_empty() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.store.corrupt_next_load("guild-1");

        let report = h.runner.sweep().unwrap();
        assert_eq!(report.infected, 1);
        assert!(h.records().contains("1"));
    }

    #[test]
    fn test_sweep_saves_exactly_once() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.tags.add_member("2", &["sav"]);
        h.tags.add_member("3", &[]);
        h.runner.sweep().unwrap();
        assert_eq!(h.store.save_count(), 1);
    }

    #[test]
    fn test_unclickable_offer_is_retracted_and_retried() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.notifier.fail_actions(true);

        let report = h.runner.sweep().unwrap();
        assert_eq!(report.offers_issued, 0);
        assert_eq!(report.failures, 1);
        assert!(h.notifier.live().is_empty());
        let record = h.records().get("1").cloned().unwrap();
        assert!(!record.has_open_offer());

        h.notifier.fail_actions(false);
        h.set(5);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.offers_issued, 1);
    }

    #[test]
    fn test_quarantine_applied_once_and_lifted_on_cure() {
        let mut config = test_config();
        config.community.quarantine_tag = Some("isolamento".to_string());
        let h = harness_with(config);
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        h.runner.accept("1", at(2)).unwrap();

        h.set(39);
        assert_eq!(h.runner.sweep().unwrap().quarantined, 0);

        h.set(40);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.quarantined, 1);
        assert!(h.tags.tags_of("1").contains("isolamento"));
        assert_eq!(h.records().get("1").unwrap().quarantined_at, Some(at(40)));

        h.set(41);
        assert_eq!(h.runner.sweep().unwrap().quarantined, 0);

        h.set(42);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.cured, 1);
        assert!(h.tags.tags_of("1").is_empty());
    }

    #[test]
    fn test_quarantine_counted_when_offer_fails() {
        let mut config = test_config();
        config.community.quarantine_tag = Some("isolamento".to_string());
        let h = harness_with(config);
        h.tags.add_member("1", &["sav"]);
        h.set(80);
        h.runner.sweep().unwrap();

        h.notifier.fail_sends(true);
        h.set(120);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.quarantined, 1);
        assert_eq!(report.offers_issued, 0);
        assert_eq!(report.failures, 1);
        assert!(h.tags.tags_of("1").contains("isolamento"));
        assert_eq!(h.records().get("1").unwrap().quarantined_at, Some(at(120)));

        h.notifier.fail_sends(false);
        h.set(121);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.quarantined, 0);
        assert_eq!(report.offers_issued, 1);
    }

    #[test]
    fn test_notification_failure_does_not_block_cure() {
        let h = harness();
        h.tags.add_member("1", &["sav"]);
        h.runner.sweep().unwrap();
        h.runner.accept("1", at(2)).unwrap();

        h.notifier.fail_sends(true);
        h.set(42);
        let report = h.runner.sweep().unwrap();
        assert_eq!(report.cured, 1);
        assert_eq!(report.failures, 0);
        assert!(!h.records().contains("1"));
    }

    #[test]
    fn test_transitions_are_journaled() {
        let dir = TempDir::new().unwrap();
        let h = harness();
        let runner = h
            .runner
            .with_journal(Journal::for_community(dir.path(), "guild-1"));
        h.tags.add_member("1", &["sav"]);
        runner.sweep().unwrap();
        runner.accept("1", at(2)).unwrap();
        h.clock.set(at(42));
        runner.sweep().unwrap();

        let events: Vec<_> = runner
            .journal()
            .read(100, Some("1"))
            .unwrap()
            .into_iter()
            .map(|e| e.transition.event_name())
            .collect();
        assert_eq!(
            events,
            vec!["infected", "offer_issued", "treatment_started", "cured"]
        );
    }
}
