// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-touch event ledger.
//!
//! Every send, delivery, failure, and reply lands here as an independent
//! write keyed by `(block_id, lead_id, touch_number)`. Writes to the same
//! key are last-writer-wins; the ledger never serializes concurrent
//! callers. Missing history is an explicit outcome, not an error; only
//! malformed identifiers are rejected.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use paceline_config::model::BlockDefaults;
use paceline_core::{ContactChannel, PacelineError, ReplyIntent};

use crate::keys::validate_identifier;
use crate::lifecycle::BlockManager;
use crate::store::{blocks, touches, Store};
use crate::telemetry;
use crate::types::{LeadTouch, TouchReply, TouchState};

/// Result of applying a delivery, failure, or reply event.
#[derive(Debug, Clone, PartialEq)]
pub enum TouchOutcome {
    /// The touch record after the event was applied.
    Updated(LeadTouch),
    /// No usable record exists for the key; the event was reported and
    /// dropped.
    NotFound,
}

impl TouchOutcome {
    pub fn touch(self) -> Option<LeadTouch> {
        match self {
            TouchOutcome::Updated(touch) => Some(touch),
            TouchOutcome::NotFound => None,
        }
    }
}

/// Aggregate view of one lead's touch history within a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadTouchStatus {
    pub block_id: String,
    pub lead_id: String,
    /// Touches that have left `pending`, failed attempts included.
    pub touch_count: u32,
    /// Most recent send time across all touches.
    pub last_sent_at: Option<DateTime<Utc>>,
    pub replied: bool,
    /// Reply intents in touch-number order.
    pub reply_intents: Vec<ReplyIntent>,
    pub touches: Vec<LeadTouch>,
}

impl LeadTouchStatus {
    fn from_touches(block_id: &str, lead_id: &str, touches: Vec<LeadTouch>) -> Self {
        let touch_count = touches
            .iter()
            .filter(|touch| touch.state.left_pending())
            .count() as u32;
        let last_sent_at = touches
            .iter()
            .filter_map(|touch| touch.state.sent_at())
            .max();
        let replied = touches.iter().any(LeadTouch::replied);
        let reply_intents = touches
            .iter()
            .filter_map(LeadTouch::reply_intent)
            .collect();
        Self {
            block_id: block_id.to_string(),
            lead_id: lead_id.to_string(),
            touch_count,
            last_sent_at,
            replied,
            reply_intents,
            touches,
        }
    }
}

/// Records touch events and keeps the lifecycle manager's counters fed.
#[derive(Clone)]
pub struct TouchLedger {
    store: Store,
    manager: BlockManager,
    defaults: BlockDefaults,
}

impl TouchLedger {
    pub fn new(store: Store, manager: BlockManager, defaults: BlockDefaults) -> Self {
        Self {
            store,
            manager,
            defaults,
        }
    }

    /// Record a send. Creates the record if absent; touch 1 usually exists
    /// already from lead admission.
    ///
    /// Only the first transition into `sent` notifies the lifecycle
    /// manager, so duplicate provider webhooks cannot inflate the block
    /// counters. A retry after a sendless failure still counts as a first
    /// send.
    pub async fn record_sent(
        &self,
        block_id: &str,
        lead_id: &str,
        touch_number: u32,
        template_id: Option<&str>,
        message_id: Option<&str>,
    ) -> Result<LeadTouch, PacelineError> {
        validate_touch_key(block_id, lead_id, touch_number)?;

        let block = blocks::load_block(&self.store, block_id).await;
        if let Some(block) = &block {
            if touch_number > block.max_touches_per_lead {
                return Err(PacelineError::Validation(format!(
                    "touch {touch_number} exceeds the per-lead ceiling of {}",
                    block.max_touches_per_lead
                )));
            }
        }
        let channel = block
            .as_ref()
            .map(|block| block.channel)
            .unwrap_or_else(|| self.default_channel());

        let now = Utc::now();
        let existing = touches::load_touch(&self.store, block_id, lead_id, touch_number).await;
        let (mut touch, first_send) = match existing {
            None => {
                let touch = LeadTouch {
                    block_id: block_id.to_string(),
                    lead_id: lead_id.to_string(),
                    touch_number,
                    channel,
                    template_id: None,
                    message_id: None,
                    state: TouchState::Sent { sent_at: now },
                    reply: None,
                    should_pivot: false,
                    created_at: now,
                    updated_at: now,
                };
                (touch, true)
            }
            Some(mut touch) => {
                let first_send = match touch.state {
                    TouchState::Pending => {
                        touch.state = TouchState::Sent { sent_at: now };
                        true
                    }
                    // Duplicate webhook for the same send; the original
                    // timestamp stands.
                    TouchState::Sent { .. } => false,
                    // Delivery already confirmed; never regress.
                    TouchState::Delivered { .. } => false,
                    TouchState::Failed { sent_at, .. } => {
                        let counted = sent_at.is_some();
                        touch.state = TouchState::Sent { sent_at: now };
                        !counted
                    }
                };
                (touch, first_send)
            }
        };

        if let Some(template_id) = template_id {
            touch.template_id = Some(template_id.to_string());
        }
        if let Some(message_id) = message_id {
            touch.message_id = Some(message_id.to_string());
        }
        touch.updated_at = now;
        touches::save_touch(&self.store, &touch).await;

        if first_send {
            self.manager.note_touch_sent(block_id, touch_number).await;
            telemetry::record_touch("sent", &channel.to_string());
        }
        debug!(
            block_id = %block_id,
            lead_id = %lead_id,
            touch = touch_number,
            first_send,
            "touch sent"
        );
        Ok(touch)
    }

    /// Record a delivery confirmation.
    ///
    /// Confirmations need a send on record: a record still `pending` (or a
    /// sendless failure) reports `NotFound` just like a missing record. A
    /// failure that followed a real send is overridden, latest event wins.
    pub async fn record_delivered(
        &self,
        block_id: &str,
        lead_id: &str,
        touch_number: u32,
        message_id: &str,
    ) -> Result<TouchOutcome, PacelineError> {
        validate_touch_key(block_id, lead_id, touch_number)?;

        let Some(mut touch) =
            touches::load_touch(&self.store, block_id, lead_id, touch_number).await
        else {
            debug!(
                block_id = %block_id,
                lead_id = %lead_id,
                touch = touch_number,
                "delivery confirmation without a touch record"
            );
            return Ok(TouchOutcome::NotFound);
        };

        let now = Utc::now();
        match touch.state {
            TouchState::Sent { sent_at }
            | TouchState::Failed {
                sent_at: Some(sent_at),
                ..
            } => {
                touch.state = TouchState::Delivered {
                    sent_at,
                    delivered_at: now,
                };
            }
            TouchState::Delivered { .. } => {}
            TouchState::Pending | TouchState::Failed { sent_at: None, .. } => {
                debug!(
                    block_id = %block_id,
                    lead_id = %lead_id,
                    touch = touch_number,
                    "delivery confirmation without a send on record"
                );
                return Ok(TouchOutcome::NotFound);
            }
        }
        touch.message_id = Some(message_id.to_string());
        touch.updated_at = now;
        touches::save_touch(&self.store, &touch).await;
        telemetry::record_touch("delivered", &touch.channel.to_string());
        Ok(TouchOutcome::Updated(touch))
    }

    /// Record a send failure.
    ///
    /// A failure after delivery confirmation is ignored; the stronger
    /// signal stands. Never feeds the block counters.
    pub async fn record_failed(
        &self,
        block_id: &str,
        lead_id: &str,
        touch_number: u32,
        reason: Option<&str>,
    ) -> Result<TouchOutcome, PacelineError> {
        validate_touch_key(block_id, lead_id, touch_number)?;

        let Some(mut touch) =
            touches::load_touch(&self.store, block_id, lead_id, touch_number).await
        else {
            return Ok(TouchOutcome::NotFound);
        };

        match touch.state {
            TouchState::Pending => {
                touch.state = TouchState::Failed {
                    sent_at: None,
                    reason: reason.map(str::to_string),
                };
            }
            TouchState::Sent { sent_at } => {
                touch.state = TouchState::Failed {
                    sent_at: Some(sent_at),
                    reason: reason.map(str::to_string),
                };
            }
            TouchState::Delivered { .. } => {
                return Ok(TouchOutcome::Updated(touch));
            }
            TouchState::Failed { sent_at, .. } => {
                touch.state = TouchState::Failed {
                    sent_at,
                    reason: reason.map(str::to_string),
                };
            }
        }
        touch.updated_at = Utc::now();
        touches::save_touch(&self.store, &touch).await;
        telemetry::record_touch("failed", &touch.channel.to_string());
        debug!(
            block_id = %block_id,
            lead_id = %lead_id,
            touch = touch_number,
            reason = reason.unwrap_or("unspecified"),
            "touch failed"
        );
        Ok(TouchOutcome::Updated(touch))
    }

    /// Record an inbound reply against a touch.
    ///
    /// Any intent stops further touches to the lead: `should_pivot` is set
    /// unconditionally. Why the lead pivots is classified downstream by the
    /// cadence evaluator, not here.
    pub async fn record_reply(
        &self,
        block_id: &str,
        lead_id: &str,
        touch_number: u32,
        intent: ReplyIntent,
    ) -> Result<TouchOutcome, PacelineError> {
        validate_touch_key(block_id, lead_id, touch_number)?;

        let Some(mut touch) =
            touches::load_touch(&self.store, block_id, lead_id, touch_number).await
        else {
            debug!(
                block_id = %block_id,
                lead_id = %lead_id,
                touch = touch_number,
                "reply without a touch record"
            );
            return Ok(TouchOutcome::NotFound);
        };

        touch.reply = Some(TouchReply {
            replied_at: Utc::now(),
            intent,
        });
        touch.should_pivot = true;
        touch.updated_at = Utc::now();
        touches::save_touch(&self.store, &touch).await;
        telemetry::record_reply(&intent.to_string());
        debug!(
            block_id = %block_id,
            lead_id = %lead_id,
            touch = touch_number,
            intent = %intent,
            "reply recorded"
        );
        Ok(TouchOutcome::Updated(touch))
    }

    /// Assemble the aggregate touch view consumed by the cadence evaluator.
    ///
    /// When the block record is unreadable the configured default ceiling
    /// bounds the scan instead.
    pub async fn touch_status(
        &self,
        block_id: &str,
        lead_id: &str,
    ) -> Result<LeadTouchStatus, PacelineError> {
        validate_identifier("block_id", block_id)?;
        validate_identifier("lead_id", lead_id)?;

        let ceiling = match blocks::load_block(&self.store, block_id).await {
            Some(block) => block.max_touches_per_lead,
            None => self.defaults.max_touches_per_lead,
        };
        let records = touches::touches_for_lead(&self.store, block_id, lead_id, ceiling).await;
        Ok(LeadTouchStatus::from_touches(block_id, lead_id, records))
    }

    fn default_channel(&self) -> ContactChannel {
        self.defaults.channel.parse().unwrap_or_default()
    }
}

fn validate_touch_key(
    block_id: &str,
    lead_id: &str,
    touch_number: u32,
) -> Result<(), PacelineError> {
    validate_identifier("block_id", block_id)?;
    validate_identifier("lead_id", lead_id)?;
    if touch_number == 0 {
        return Err(PacelineError::Validation(
            "touch_number must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsAggregator;
    use crate::store::counters;
    use crate::store::testing::{dead_store, memory_store};
    use crate::types::{CreateBlockRequest, TouchStatus};
    use tracing_test::traced_test;

    fn fixtures(store: &Store) -> (BlockManager, TouchLedger) {
        let aggregator = MetricsAggregator::new(store.clone(), BlockDefaults::default());
        let manager = BlockManager::new(store.clone(), aggregator, BlockDefaults::default());
        let ledger = TouchLedger::new(store.clone(), manager.clone(), BlockDefaults::default());
        (manager, ledger)
    }

    async fn active_block(manager: &BlockManager, leads: &[&str]) -> String {
        let block = manager
            .create_block(CreateBlockRequest {
                max_leads: Some(5),
                max_touches_per_lead: Some(3),
                delay_between_touches_secs: Some(0),
                ..CreateBlockRequest::new("t1", "c1")
            })
            .await
            .unwrap();
        let ids: Vec<String> = leads.iter().map(|s| s.to_string()).collect();
        manager.admit_leads(&block.id, &ids).await.unwrap();
        manager.start(&block.id).await.unwrap();
        block.id
    }

    #[tokio::test]
    async fn sent_promotes_pending_and_feeds_counter() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a"]).await;

        let touch = ledger
            .record_sent(&block_id, "a", 1, Some("tpl-1"), Some("msg-1"))
            .await
            .unwrap();
        assert_eq!(touch.state.status(), TouchStatus::Sent);
        assert_eq!(touch.template_id.as_deref(), Some("tpl-1"));
        assert_eq!(counters::total_touches(&store, &block_id).await, Some(1));

        let reloaded = blocks::load_block(&store, &block_id).await.unwrap();
        assert_eq!(reloaded.total_touches, 1);
        assert_eq!(reloaded.current_touch, 1);
    }

    #[tokio::test]
    async fn sent_creates_missing_records() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a"]).await;

        // Touch 2 has no pre-created record.
        let touch = ledger
            .record_sent(&block_id, "a", 2, None, None)
            .await
            .unwrap();
        assert_eq!(touch.touch_number, 2);
        assert_eq!(touch.state.status(), TouchStatus::Sent);
        assert_eq!(counters::total_touches(&store, &block_id).await, Some(1));
    }

    #[tokio::test]
    async fn duplicate_sent_does_not_inflate_counter() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a"]).await;

        ledger
            .record_sent(&block_id, "a", 1, None, Some("msg-1"))
            .await
            .unwrap();
        let second = ledger
            .record_sent(&block_id, "a", 1, None, Some("msg-2"))
            .await
            .unwrap();

        assert_eq!(counters::total_touches(&store, &block_id).await, Some(1));
        // The duplicate still refreshes provider identifiers.
        assert_eq!(second.message_id.as_deref(), Some("msg-2"));
    }

    #[tokio::test]
    async fn sent_rejects_touch_numbers_beyond_ceiling() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a"]).await;

        let err = ledger
            .record_sent(&block_id, "a", 4, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PacelineError::Validation(_)));

        let err = ledger
            .record_sent(&block_id, "a", 0, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PacelineError::Validation(_)));
    }

    #[tokio::test]
    async fn sent_rejects_malformed_identifiers() {
        let store = memory_store();
        let (_, ledger) = fixtures(&store);

        let err = ledger.record_sent("b:1", "a", 1, None, None).await.unwrap_err();
        assert!(matches!(err, PacelineError::Validation(_)));
        let err = ledger.record_sent("b1", " ", 1, None, None).await.unwrap_err();
        assert!(matches!(err, PacelineError::Validation(_)));
    }

    #[tokio::test]
    async fn delivered_requires_a_send_on_record() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a"]).await;

        // Pre-created pending record: confirmation has nothing to confirm.
        let outcome = ledger
            .record_delivered(&block_id, "a", 1, "msg-1")
            .await
            .unwrap();
        assert_eq!(outcome, TouchOutcome::NotFound);

        // Absent record behaves the same.
        let outcome = ledger
            .record_delivered(&block_id, "a", 2, "msg-2")
            .await
            .unwrap();
        assert_eq!(outcome, TouchOutcome::NotFound);

        ledger.record_sent(&block_id, "a", 1, None, None).await.unwrap();
        let touch = ledger
            .record_delivered(&block_id, "a", 1, "msg-1")
            .await
            .unwrap()
            .touch()
            .unwrap();
        assert_eq!(touch.state.status(), TouchStatus::Delivered);
        assert_eq!(touch.message_id.as_deref(), Some("msg-1"));

        // Idempotent on repeat.
        let touch = ledger
            .record_delivered(&block_id, "a", 1, "msg-1")
            .await
            .unwrap()
            .touch()
            .unwrap();
        assert_eq!(touch.state.status(), TouchStatus::Delivered);
    }

    #[tokio::test]
    async fn late_delivery_overrides_failure_after_send() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a"]).await;

        ledger.record_sent(&block_id, "a", 1, None, None).await.unwrap();
        ledger
            .record_failed(&block_id, "a", 1, Some("carrier timeout"))
            .await
            .unwrap();

        let touch = ledger
            .record_delivered(&block_id, "a", 1, "msg-1")
            .await
            .unwrap()
            .touch()
            .unwrap();
        assert_eq!(touch.state.status(), TouchStatus::Delivered);
    }

    #[tokio::test]
    async fn failed_transitions_and_counter_interplay() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a", "b"]).await;

        // Pending -> failed without a send: nothing counted yet.
        let touch = ledger
            .record_failed(&block_id, "a", 1, Some("invalid number"))
            .await
            .unwrap()
            .touch()
            .unwrap();
        assert_eq!(touch.state.status(), TouchStatus::Failed);
        assert_eq!(touch.state.sent_at(), None);
        assert_eq!(counters::total_touches(&store, &block_id).await, None);

        // Retry after a sendless failure is a first send.
        ledger.record_sent(&block_id, "a", 1, None, None).await.unwrap();
        assert_eq!(counters::total_touches(&store, &block_id).await, Some(1));

        // Sent -> failed keeps the send counted; a later retry does not
        // count again.
        ledger
            .record_failed(&block_id, "a", 1, Some("carrier timeout"))
            .await
            .unwrap();
        ledger.record_sent(&block_id, "a", 1, None, None).await.unwrap();
        assert_eq!(counters::total_touches(&store, &block_id).await, Some(1));
    }

    #[tokio::test]
    async fn failed_never_demotes_delivered() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a"]).await;

        ledger.record_sent(&block_id, "a", 1, None, None).await.unwrap();
        ledger
            .record_delivered(&block_id, "a", 1, "msg-1")
            .await
            .unwrap();
        let touch = ledger
            .record_failed(&block_id, "a", 1, Some("late bounce"))
            .await
            .unwrap()
            .touch()
            .unwrap();
        assert_eq!(touch.state.status(), TouchStatus::Delivered);
    }

    #[tokio::test]
    async fn reply_sets_pivot_flag_in_any_state() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a", "b"]).await;

        // Reply against a still-pending touch is accepted.
        let touch = ledger
            .record_reply(&block_id, "a", 1, ReplyIntent::Question)
            .await
            .unwrap()
            .touch()
            .unwrap();
        assert!(touch.should_pivot);
        assert_eq!(touch.reply_intent(), Some(ReplyIntent::Question));
        assert_eq!(touch.state.status(), TouchStatus::Pending);

        // Reply against a sent touch.
        ledger.record_sent(&block_id, "b", 1, None, None).await.unwrap();
        let touch = ledger
            .record_reply(&block_id, "b", 1, ReplyIntent::OptOut)
            .await
            .unwrap()
            .touch()
            .unwrap();
        assert!(touch.should_pivot);
        assert!(touch.replied());

        // Reply against nothing is reported, not fatal.
        let outcome = ledger
            .record_reply(&block_id, "b", 3, ReplyIntent::Positive)
            .await
            .unwrap();
        assert_eq!(outcome, TouchOutcome::NotFound);
    }

    #[tokio::test]
    async fn touch_status_aggregates_history() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a"]).await;

        ledger.record_sent(&block_id, "a", 1, None, None).await.unwrap();
        ledger
            .record_delivered(&block_id, "a", 1, "msg-1")
            .await
            .unwrap();
        ledger.record_sent(&block_id, "a", 2, None, None).await.unwrap();
        ledger
            .record_reply(&block_id, "a", 2, ReplyIntent::Negative)
            .await
            .unwrap();

        let status = ledger.touch_status(&block_id, "a").await.unwrap();
        assert_eq!(status.touch_count, 2);
        assert!(status.replied);
        assert_eq!(status.reply_intents, vec![ReplyIntent::Negative]);
        assert_eq!(status.touches.len(), 2);
        let latest_send = status.touches[1].state.sent_at();
        assert_eq!(status.last_sent_at, latest_send);
    }

    #[tokio::test]
    async fn touch_status_counts_failed_attempts() {
        let store = memory_store();
        let (manager, ledger) = fixtures(&store);
        let block_id = active_block(&manager, &["a"]).await;

        ledger
            .record_failed(&block_id, "a", 1, Some("invalid number"))
            .await
            .unwrap();
        let status = ledger.touch_status(&block_id, "a").await.unwrap();
        assert_eq!(status.touch_count, 1, "failed attempts consume budget");
        assert_eq!(status.last_sent_at, None);
        assert!(!status.replied);
    }

    #[tokio::test]
    async fn touch_status_without_block_uses_default_ceiling() {
        let store = memory_store();
        let (_, ledger) = fixtures(&store);

        // Events for a block whose record was never written (or expired).
        ledger.record_sent("ghost", "a", 1, None, None).await.unwrap();
        let status = ledger.touch_status("ghost", "a").await.unwrap();
        assert_eq!(status.touch_count, 1);
        assert_eq!(status.touches.len(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn events_degrade_to_logged_noops_when_cache_is_down() {
        let store = dead_store();
        let (_, ledger) = fixtures(&store);

        let touch = ledger
            .record_sent("b1", "a", 1, None, Some("msg-1"))
            .await
            .unwrap();
        assert_eq!(touch.state.status(), TouchStatus::Sent);
        assert!(logs_contain("write dropped"));

        let outcome = ledger.record_delivered("b1", "a", 1, "msg-1").await.unwrap();
        assert_eq!(outcome, TouchOutcome::NotFound);

        let status = ledger.touch_status("b1", "a").await.unwrap();
        assert_eq!(status.touch_count, 0);
    }
}
