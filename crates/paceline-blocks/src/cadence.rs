// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cadence and exhaustion rules.
//!
//! [`evaluate`] is the pure decision procedure for one lead: may it
//! receive another touch, when, and if not, why it leaves the cycle.
//! [`CadenceEvaluator`] runs it across a block's lead index for the two
//! batch queries callers poll. An empty batch means "nothing currently
//! due", never "the block is finished"; block status answers the latter.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use paceline_core::{PacelineError, ReplyIntent};

use crate::keys::validate_identifier;
use crate::ledger::{LeadTouchStatus, TouchLedger};
use crate::store::{blocks, index, Store};
use crate::types::{BlockState, PivotReason};

/// Outcome of evaluating one lead against the cadence rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CadenceDecision {
    pub has_replied: bool,
    pub should_pivot: bool,
    pub next_touch_eligible: bool,
    /// The touch that would go out next. Meaningful only when eligible.
    pub next_touch_number: u32,
    /// Earliest send time for the next touch. `None` means due
    /// immediately.
    pub next_touch_at: Option<DateTime<Utc>>,
    /// Why the lead leaves the cycle. Meaningful only when `should_pivot`.
    pub pivot_reason: Option<PivotReason>,
}

/// A lead due for its next touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextTouch {
    pub lead_id: String,
    pub touch_number: u32,
}

/// A lead that must leave the touch cycle, with routing context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotCandidate {
    pub lead_id: String,
    pub reason: PivotReason,
    pub touch_count: u32,
    /// The intent that drove the classification, when a reply did.
    pub reply_intent: Option<ReplyIntent>,
}

/// Apply the cadence rules to one lead's aggregate history.
///
/// A reply of any intent ends the lead's cycle permanently, as does
/// spending the touch budget. The delay gate compares against the last
/// actual send; a lead with no sends on record is due immediately.
pub fn evaluate(status: &LeadTouchStatus, max_touches: u32, delay: Duration) -> CadenceDecision {
    let has_replied = status.replied;
    let should_pivot = has_replied || status.touch_count >= max_touches;
    let next_touch_eligible = !should_pivot && status.touch_count < max_touches;
    let next_touch_at = if next_touch_eligible {
        status.last_sent_at.map(|sent_at| {
            sent_at
                .checked_add_signed(delay)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    } else {
        None
    };
    let pivot_reason = if should_pivot {
        Some(classify_pivot_reason(&status.reply_intents))
    } else {
        None
    };
    CadenceDecision {
        has_replied,
        should_pivot,
        next_touch_eligible,
        next_touch_number: status.touch_count.saturating_add(1),
        next_touch_at,
        pivot_reason,
    }
}

/// Classify why a pivoting lead leaves the touch cycle.
///
/// Opt-out beats every other signal; a question counts as positive; only
/// negative replies classify negative; no reply at all means the budget
/// ran out.
pub fn classify_pivot_reason(intents: &[ReplyIntent]) -> PivotReason {
    if intents.contains(&ReplyIntent::OptOut) {
        PivotReason::OptOut
    } else if intents.iter().any(|intent| intent.counts_as_positive()) {
        PivotReason::RepliedPositive
    } else if intents.contains(&ReplyIntent::Negative) {
        PivotReason::RepliedNegative
    } else {
        PivotReason::Exhausted
    }
}

fn representative_intent(reason: PivotReason, intents: &[ReplyIntent]) -> Option<ReplyIntent> {
    match reason {
        PivotReason::OptOut => Some(ReplyIntent::OptOut),
        PivotReason::RepliedPositive => intents
            .iter()
            .copied()
            .find(|intent| *intent == ReplyIntent::Positive)
            .or(Some(ReplyIntent::Question)),
        PivotReason::RepliedNegative => Some(ReplyIntent::Negative),
        PivotReason::Exhausted => None,
    }
}

/// Batch queries over a block's lead index.
#[derive(Clone)]
pub struct CadenceEvaluator {
    store: Store,
    ledger: TouchLedger,
    batch_limit: usize,
}

impl CadenceEvaluator {
    pub fn new(store: Store, ledger: TouchLedger, batch_limit: usize) -> Self {
        Self {
            store,
            ledger,
            batch_limit,
        }
    }

    /// Leads currently due for another touch, up to `limit`.
    ///
    /// Only an active block hands out work; preparing, paused, and
    /// terminal blocks yield an empty batch. Order is best-effort.
    pub async fn leads_for_next_touch(
        &self,
        block_id: &str,
        limit: usize,
    ) -> Result<Vec<NextTouch>, PacelineError> {
        validate_identifier("block_id", block_id)?;
        let Some(block) = blocks::load_block(&self.store, block_id).await else {
            debug!(block_id = %block_id, "block unreadable, no touches due");
            return Ok(Vec::new());
        };
        if !matches!(block.state, BlockState::Active { .. }) {
            debug!(
                block_id = %block_id,
                status = %block.status(),
                "block not active, no touches due"
            );
            return Ok(Vec::new());
        }

        let limit = limit.min(self.batch_limit);
        let delay = block.delay_between_touches();
        let now = Utc::now();
        let mut due = Vec::new();
        for lead_id in index::leads(&self.store, block_id).await {
            if due.len() >= limit {
                break;
            }
            let status = self.ledger.touch_status(block_id, &lead_id).await?;
            let decision = evaluate(&status, block.max_touches_per_lead, delay);
            let due_now = decision.next_touch_eligible
                && decision.next_touch_at.is_none_or(|at| at <= now);
            if due_now {
                due.push(NextTouch {
                    lead_id,
                    touch_number: decision.next_touch_number,
                });
            }
        }
        Ok(due)
    }

    /// Leads that must leave the touch cycle, with routing context.
    ///
    /// Not gated on block status: pivot routing continues while a block
    /// is paused or already terminal.
    pub async fn leads_to_pivot(
        &self,
        block_id: &str,
        limit: usize,
    ) -> Result<Vec<PivotCandidate>, PacelineError> {
        validate_identifier("block_id", block_id)?;
        let Some(block) = blocks::load_block(&self.store, block_id).await else {
            debug!(block_id = %block_id, "block unreadable, no pivot candidates");
            return Ok(Vec::new());
        };

        let limit = limit.min(self.batch_limit);
        let delay = block.delay_between_touches();
        let mut candidates = Vec::new();
        for lead_id in index::leads(&self.store, block_id).await {
            if candidates.len() >= limit {
                break;
            }
            let status = self.ledger.touch_status(block_id, &lead_id).await?;
            let decision = evaluate(&status, block.max_touches_per_lead, delay);
            if decision.should_pivot {
                let reason = decision.pivot_reason.unwrap_or(PivotReason::Exhausted);
                candidates.push(PivotCandidate {
                    lead_id,
                    reason,
                    touch_count: status.touch_count,
                    reply_intent: representative_intent(reason, &status.reply_intents),
                });
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::BlockManager;
    use crate::metrics::MetricsAggregator;
    use crate::store::testing::memory_store;
    use crate::types::CreateBlockRequest;
    use paceline_config::model::BlockDefaults;
    use proptest::prelude::*;

    fn status(
        touch_count: u32,
        last_sent_at: Option<DateTime<Utc>>,
        intents: &[ReplyIntent],
    ) -> LeadTouchStatus {
        LeadTouchStatus {
            block_id: "b1".to_string(),
            lead_id: "a".to_string(),
            touch_count,
            last_sent_at,
            replied: !intents.is_empty(),
            reply_intents: intents.to_vec(),
            touches: Vec::new(),
        }
    }

    #[test]
    fn fresh_lead_is_due_immediately() {
        let decision = evaluate(&status(0, None, &[]), 3, Duration::hours(48));
        assert!(decision.next_touch_eligible);
        assert_eq!(decision.next_touch_number, 1);
        assert_eq!(decision.next_touch_at, None);
        assert!(!decision.should_pivot);
        assert_eq!(decision.pivot_reason, None);
    }

    #[test]
    fn delay_pushes_next_touch_past_last_send() {
        let sent = Utc::now();
        let decision = evaluate(&status(1, Some(sent), &[]), 3, Duration::hours(48));
        assert!(decision.next_touch_eligible);
        assert_eq!(decision.next_touch_number, 2);
        assert_eq!(decision.next_touch_at, Some(sent + Duration::hours(48)));
    }

    #[test]
    fn reply_ends_the_cycle_for_good() {
        let sent = Utc::now() - Duration::days(365);
        let decision = evaluate(
            &status(1, Some(sent), &[ReplyIntent::Question]),
            5,
            Duration::hours(48),
        );
        assert!(decision.has_replied);
        assert!(decision.should_pivot);
        assert!(!decision.next_touch_eligible);
        assert_eq!(decision.next_touch_at, None);
        assert_eq!(decision.pivot_reason, Some(PivotReason::RepliedPositive));
    }

    #[test]
    fn spent_budget_classifies_exhausted() {
        let decision = evaluate(&status(2, Some(Utc::now()), &[]), 2, Duration::zero());
        assert!(decision.should_pivot);
        assert_eq!(decision.pivot_reason, Some(PivotReason::Exhausted));
    }

    #[test]
    fn classification_priority_table() {
        use ReplyIntent::*;
        assert_eq!(classify_pivot_reason(&[OptOut]), PivotReason::OptOut);
        assert_eq!(
            classify_pivot_reason(&[Positive, OptOut]),
            PivotReason::OptOut
        );
        assert_eq!(
            classify_pivot_reason(&[Positive]),
            PivotReason::RepliedPositive
        );
        assert_eq!(
            classify_pivot_reason(&[Question]),
            PivotReason::RepliedPositive
        );
        assert_eq!(
            classify_pivot_reason(&[Negative, Question]),
            PivotReason::RepliedPositive
        );
        assert_eq!(
            classify_pivot_reason(&[Negative]),
            PivotReason::RepliedNegative
        );
        assert_eq!(classify_pivot_reason(&[]), PivotReason::Exhausted);
    }

    #[test]
    fn representative_intent_tracks_reason() {
        use ReplyIntent::*;
        assert_eq!(
            representative_intent(PivotReason::OptOut, &[Positive, OptOut]),
            Some(OptOut)
        );
        assert_eq!(
            representative_intent(PivotReason::RepliedPositive, &[Question]),
            Some(Question)
        );
        assert_eq!(
            representative_intent(PivotReason::RepliedPositive, &[Question, Positive]),
            Some(Positive)
        );
        assert_eq!(representative_intent(PivotReason::Exhausted, &[]), None);
    }

    fn intent_strategy() -> impl Strategy<Value = ReplyIntent> {
        prop_oneof![
            Just(ReplyIntent::Positive),
            Just(ReplyIntent::Negative),
            Just(ReplyIntent::Question),
            Just(ReplyIntent::OptOut),
        ]
    }

    proptest! {
        #[test]
        fn classification_respects_priority(
            intents in proptest::collection::vec(intent_strategy(), 0..6)
        ) {
            let reason = classify_pivot_reason(&intents);
            if intents.contains(&ReplyIntent::OptOut) {
                prop_assert_eq!(reason, PivotReason::OptOut);
            } else if intents.iter().any(|intent| intent.counts_as_positive()) {
                prop_assert_eq!(reason, PivotReason::RepliedPositive);
            } else if !intents.is_empty() {
                prop_assert_eq!(reason, PivotReason::RepliedNegative);
            } else {
                prop_assert_eq!(reason, PivotReason::Exhausted);
            }
        }

        #[test]
        fn eligibility_and_pivot_are_mutually_exclusive(
            touch_count in 0u32..10,
            max_touches in 1u32..10,
            replied in any::<bool>(),
        ) {
            let intents = if replied { vec![ReplyIntent::Negative] } else { Vec::new() };
            let decision = evaluate(
                &status(touch_count, None, &intents),
                max_touches,
                Duration::zero(),
            );
            prop_assert!(decision.next_touch_eligible != decision.should_pivot);
            if decision.next_touch_eligible {
                prop_assert!(decision.next_touch_number <= max_touches);
            }
        }
    }

    struct Fixture {
        manager: BlockManager,
        ledger: TouchLedger,
        evaluator: CadenceEvaluator,
    }

    fn fixture(store: &Store, batch_limit: usize) -> Fixture {
        let aggregator = MetricsAggregator::new(store.clone(), BlockDefaults::default());
        let manager = BlockManager::new(store.clone(), aggregator, BlockDefaults::default());
        let ledger = TouchLedger::new(store.clone(), manager.clone(), BlockDefaults::default());
        let evaluator = CadenceEvaluator::new(store.clone(), ledger.clone(), batch_limit);
        Fixture {
            manager,
            ledger,
            evaluator,
        }
    }

    async fn running_block(
        fx: &Fixture,
        leads: &[&str],
        max_touches: u32,
        delay_secs: u64,
    ) -> String {
        let block = fx
            .manager
            .create_block(CreateBlockRequest {
                max_leads: Some(10),
                max_touches_per_lead: Some(max_touches),
                delay_between_touches_secs: Some(delay_secs),
                ..CreateBlockRequest::new("t1", "c1")
            })
            .await
            .unwrap();
        let ids: Vec<String> = leads.iter().map(|s| s.to_string()).collect();
        fx.manager.admit_leads(&block.id, &ids).await.unwrap();
        fx.manager.start(&block.id).await.unwrap();
        block.id
    }

    #[tokio::test]
    async fn fresh_block_offers_touch_one_for_every_lead() {
        let store = memory_store();
        let fx = fixture(&store, 50);
        let block_id = running_block(&fx, &["a", "b"], 3, 0).await;

        let mut due = fx.evaluator.leads_for_next_touch(&block_id, 10).await.unwrap();
        due.sort_by(|x, y| x.lead_id.cmp(&y.lead_id));
        assert_eq!(
            due,
            vec![
                NextTouch {
                    lead_id: "a".to_string(),
                    touch_number: 1
                },
                NextTouch {
                    lead_id: "b".to_string(),
                    touch_number: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn delay_gates_the_next_touch() {
        let store = memory_store();
        let fx = fixture(&store, 50);
        let block_id = running_block(&fx, &["a"], 3, 3600).await;

        fx.ledger
            .record_sent(&block_id, "a", 1, None, None)
            .await
            .unwrap();
        let due = fx.evaluator.leads_for_next_touch(&block_id, 10).await.unwrap();
        assert!(due.is_empty(), "an hour must pass before touch 2");
    }

    #[tokio::test]
    async fn zero_delay_offers_the_next_touch_immediately() {
        let store = memory_store();
        let fx = fixture(&store, 50);
        let block_id = running_block(&fx, &["a"], 3, 0).await;

        fx.ledger
            .record_sent(&block_id, "a", 1, None, None)
            .await
            .unwrap();
        let due = fx.evaluator.leads_for_next_touch(&block_id, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].touch_number, 2);
    }

    #[tokio::test]
    async fn replied_leads_drop_out_of_the_touch_batch() {
        let store = memory_store();
        let fx = fixture(&store, 50);
        let block_id = running_block(&fx, &["a", "b"], 3, 0).await;

        fx.ledger
            .record_sent(&block_id, "a", 1, None, None)
            .await
            .unwrap();
        fx.ledger
            .record_reply(&block_id, "a", 1, ReplyIntent::Negative)
            .await
            .unwrap();

        let due = fx.evaluator.leads_for_next_touch(&block_id, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].lead_id, "b");
    }

    #[tokio::test]
    async fn paused_blocks_hand_out_no_work() {
        let store = memory_store();
        let fx = fixture(&store, 50);
        let block_id = running_block(&fx, &["a"], 3, 0).await;
        fx.manager.pause(&block_id).await.unwrap();

        let due = fx.evaluator.leads_for_next_touch(&block_id, 10).await.unwrap();
        assert!(due.is_empty());

        // Pivot listing still works while paused.
        fx.manager.resume(&block_id).await.unwrap();
        fx.ledger
            .record_reply(&block_id, "a", 1, ReplyIntent::OptOut)
            .await
            .unwrap();
        fx.manager.pause(&block_id).await.unwrap();
        let pivots = fx.evaluator.leads_to_pivot(&block_id, 10).await.unwrap();
        assert_eq!(pivots.len(), 1);
    }

    #[tokio::test]
    async fn batch_limit_caps_caller_limits() {
        let store = memory_store();
        let fx = fixture(&store, 2);
        let block_id = running_block(&fx, &["a", "b", "c", "d"], 3, 0).await;

        let due = fx.evaluator.leads_for_next_touch(&block_id, 10).await.unwrap();
        assert_eq!(due.len(), 2);

        let due = fx.evaluator.leads_for_next_touch(&block_id, 1).await.unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn pivot_candidates_carry_reason_and_intent() {
        let store = memory_store();
        let fx = fixture(&store, 50);
        let block_id = running_block(&fx, &["a", "b", "c"], 2, 0).await;

        // a: opted out after one touch.
        fx.ledger
            .record_sent(&block_id, "a", 1, None, None)
            .await
            .unwrap();
        fx.ledger
            .record_reply(&block_id, "a", 1, ReplyIntent::OptOut)
            .await
            .unwrap();
        // b: spent both touches, never replied.
        fx.ledger
            .record_sent(&block_id, "b", 1, None, None)
            .await
            .unwrap();
        fx.ledger
            .record_sent(&block_id, "b", 2, None, None)
            .await
            .unwrap();
        // c: one touch, still in play.

        let mut pivots = fx.evaluator.leads_to_pivot(&block_id, 10).await.unwrap();
        pivots.sort_by(|x, y| x.lead_id.cmp(&y.lead_id));
        assert_eq!(
            pivots,
            vec![
                PivotCandidate {
                    lead_id: "a".to_string(),
                    reason: PivotReason::OptOut,
                    touch_count: 1,
                    reply_intent: Some(ReplyIntent::OptOut),
                },
                PivotCandidate {
                    lead_id: "b".to_string(),
                    reason: PivotReason::Exhausted,
                    touch_count: 2,
                    reply_intent: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn unknown_blocks_yield_empty_batches() {
        let store = memory_store();
        let fx = fixture(&store, 50);

        let due = fx.evaluator.leads_for_next_touch("ghost", 10).await.unwrap();
        assert!(due.is_empty());
        let pivots = fx.evaluator.leads_to_pivot("ghost", 10).await.unwrap();
        assert!(pivots.is_empty());
    }
}
