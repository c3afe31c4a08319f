// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Derived block metrics.
//!
//! [`MetricsAggregator::compute`] is a pure read-side fold over a block's
//! touch records. It is re-derivable at any time and never the system of
//! record; the snapshot embedded in a terminal [`BlockState`] is just the
//! fold result at transition time.
//!
//! [`BlockState`]: crate::types::BlockState

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use paceline_config::model::BlockDefaults;
use paceline_core::ReplyIntent;

use crate::store::{blocks, index, touches, Store};
use crate::types::{LeadTouch, TouchState};

/// Per-touch-number breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchBucket {
    pub sent: u32,
    pub delivered: u32,
    pub replies: u32,
    /// Replies with positive or question intent.
    pub conversions: u32,
}

/// External cost figures supplied by the caller; never computed from the
/// ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostInputs {
    pub total_cost_cents: u64,
}

/// Point-in-time aggregate over a block's touch records.
///
/// All rates are zero when their denominator is zero, never `NaN`.
/// Question-intent replies are merged into the positive counts here (the
/// pivot-reason classification keeps them distinct).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMetrics {
    /// Touches that left pending: sent, delivered, or failed.
    pub total_sent: u32,
    pub total_delivered: u32,
    pub total_replies: u32,
    /// Positive and question intents combined.
    pub positive_replies: u32,
    pub negative_replies: u32,
    pub opt_outs: u32,

    /// Keyed by touch number, 1..=max_touches_per_lead, zero buckets
    /// included.
    pub by_touch: BTreeMap<u32, TouchBucket>,

    pub delivery_rate: f64,
    pub reply_rate: f64,
    pub positive_rate: f64,
    pub opt_out_rate: f64,

    pub total_cost_cents: u64,
    pub cost_per_reply_cents: u64,
    pub cost_per_conversion_cents: u64,
}

fn rate(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

fn per_unit_cents(total: u64, count: u32) -> u64 {
    if count == 0 {
        0
    } else {
        total / u64::from(count)
    }
}

/// Read-only fold over the touch ledger.
#[derive(Clone)]
pub struct MetricsAggregator {
    store: Store,
    defaults: BlockDefaults,
}

impl MetricsAggregator {
    pub fn new(store: Store, defaults: BlockDefaults) -> Self {
        Self { store, defaults }
    }

    /// Compute the metrics snapshot for a block.
    ///
    /// Enumerates leads through the lead index; when the index is missing
    /// but touch keys survive (dropped write, expired set), falls back to a
    /// prefix scan of the touch keyspace. Degraded reads shrink the fold
    /// toward zeros rather than erroring.
    pub async fn compute(&self, block_id: &str, cost: Option<CostInputs>) -> BlockMetrics {
        let max_touches = match blocks::load_block(&self.store, block_id).await {
            Some(block) => block.max_touches_per_lead,
            None => self.defaults.max_touches_per_lead,
        };

        let records = self.collect_records(block_id, max_touches).await;
        let mut metrics = fold_records(&records, max_touches);

        let cost = cost.unwrap_or_default();
        metrics.total_cost_cents = cost.total_cost_cents;
        metrics.cost_per_reply_cents = per_unit_cents(cost.total_cost_cents, metrics.total_replies);
        metrics.cost_per_conversion_cents =
            per_unit_cents(cost.total_cost_cents, metrics.positive_replies);

        debug!(
            block_id = %block_id,
            total_sent = metrics.total_sent,
            total_replies = metrics.total_replies,
            "block metrics computed"
        );
        metrics
    }

    async fn collect_records(&self, block_id: &str, max_touches: u32) -> Vec<LeadTouch> {
        let leads = index::leads(&self.store, block_id).await;
        if !leads.is_empty() {
            let mut records = Vec::new();
            for lead_id in &leads {
                records
                    .extend(touches::touches_for_lead(&self.store, block_id, lead_id, max_touches).await);
            }
            return records;
        }

        // Recovery path: enumerate whatever touch keys survive.
        let keys = self.store.scan(&self.store.keys().touch_prefix(block_id)).await;
        if !keys.is_empty() {
            warn!(
                block_id = %block_id,
                keys = keys.len(),
                "lead index missing, aggregating from touch key scan"
            );
        }
        let mut records = Vec::new();
        for key in &keys {
            if self.store.keys().parse_touch_key(block_id, key).is_none() {
                continue;
            }
            if let Some(touch) = self.store.get_json::<LeadTouch>(key).await {
                records.push(touch);
            }
        }
        records
    }
}

fn fold_records(records: &[LeadTouch], max_touches: u32) -> BlockMetrics {
    let mut metrics = BlockMetrics::default();
    for touch_number in 1..=max_touches {
        metrics.by_touch.insert(touch_number, TouchBucket::default());
    }

    for touch in records {
        let bucket = metrics.by_touch.entry(touch.touch_number).or_default();

        if touch.state.left_pending() {
            metrics.total_sent += 1;
            bucket.sent += 1;
        }
        if matches!(touch.state, TouchState::Delivered { .. }) {
            metrics.total_delivered += 1;
            bucket.delivered += 1;
        }
        if let Some(reply) = &touch.reply {
            metrics.total_replies += 1;
            bucket.replies += 1;
            match reply.intent {
                ReplyIntent::Positive | ReplyIntent::Question => {
                    metrics.positive_replies += 1;
                    bucket.conversions += 1;
                }
                ReplyIntent::Negative => metrics.negative_replies += 1,
                ReplyIntent::OptOut => metrics.opt_outs += 1,
            }
        }
    }

    metrics.delivery_rate = rate(metrics.total_delivered, metrics.total_sent);
    metrics.reply_rate = rate(metrics.total_replies, metrics.total_sent);
    metrics.positive_rate = rate(metrics.positive_replies, metrics.total_replies);
    metrics.opt_out_rate = rate(metrics.opt_outs, metrics.total_sent);
    metrics
}
