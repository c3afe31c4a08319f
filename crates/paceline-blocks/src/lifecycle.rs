// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Block lifecycle management.
//!
//! [`BlockManager`] owns every `CampaignBlock` mutation: creation, lead
//! admission, the `preparing → active ⇄ paused` transitions, and the two
//! terminal transitions (`completed`, `pivoted`). State-machine violations
//! surface as [`PacelineError::InvalidState`] and are never retried here.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info, warn};

use paceline_config::model::BlockDefaults;
use paceline_core::{ContactChannel, PacelineError};

use crate::keys::validate_identifier;
use crate::metrics::{BlockMetrics, MetricsAggregator};
use crate::store::{blocks, counters, index, touches, Store};
use crate::telemetry;
use crate::types::{
    BlockState, CampaignBlock, CreateBlockRequest, LeadTouch, PivotTarget, TouchState,
};

/// Result of a lead-admission call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmitOutcome {
    /// Leads admitted by this call, in input order.
    pub added: Vec<String>,
    /// Leads rejected: already admitted, or beyond remaining capacity.
    pub skipped: Vec<String>,
    /// True when the block reached its admission ceiling.
    pub full: bool,
}

/// Owns the per-block state machine.
#[derive(Clone)]
pub struct BlockManager {
    store: Store,
    aggregator: MetricsAggregator,
    defaults: BlockDefaults,
}

impl BlockManager {
    pub fn new(store: Store, aggregator: MetricsAggregator, defaults: BlockDefaults) -> Self {
        Self {
            store,
            aggregator,
            defaults,
        }
    }

    /// Create a block in `preparing` with the next sequential number for
    /// its (team, campaign) pair.
    ///
    /// Capacity fields fall back to the configured defaults;
    /// `target_sends` falls back to `max_leads * max_touches_per_lead`.
    pub async fn create_block(
        &self,
        req: CreateBlockRequest,
    ) -> Result<CampaignBlock, PacelineError> {
        validate_identifier("team_id", &req.team_id)?;
        validate_identifier("campaign_id", &req.campaign_id)?;

        let max_leads = req.max_leads.unwrap_or(self.defaults.max_leads);
        let max_touches = req
            .max_touches_per_lead
            .unwrap_or(self.defaults.max_touches_per_lead);
        if max_leads == 0 {
            return Err(PacelineError::Validation(
                "max_leads must be at least 1".to_string(),
            ));
        }
        if max_touches == 0 {
            return Err(PacelineError::Validation(
                "max_touches_per_lead must be at least 1".to_string(),
            ));
        }
        let target_sends = req
            .target_sends
            .unwrap_or_else(|| max_leads.saturating_mul(max_touches));
        if target_sends == 0 {
            return Err(PacelineError::Validation(
                "target_sends must be at least 1".to_string(),
            ));
        }
        let delay_between_touches_secs = req
            .delay_between_touches_secs
            .unwrap_or(self.defaults.delay_between_touches_secs);
        let channel = req.channel.unwrap_or_else(|| self.default_channel());

        let existing =
            index::campaign_blocks(&self.store, &req.team_id, &req.campaign_id).await;
        let block_number = existing.len() as u32 + 1;

        let now = Utc::now();
        let block = CampaignBlock {
            id: uuid::Uuid::new_v4().to_string(),
            team_id: req.team_id.clone(),
            campaign_id: req.campaign_id.clone(),
            block_number,
            max_leads,
            max_touches_per_lead: max_touches,
            target_sends,
            delay_between_touches_secs,
            channel,
            leads_loaded: 0,
            total_touches: 0,
            current_touch: 0,
            state: BlockState::Preparing,
            created_at: now,
            updated_at: now,
        };

        blocks::save_block(&self.store, &block).await;
        index::add_block_to_campaign(&self.store, &req.team_id, &req.campaign_id, &block.id)
            .await;
        telemetry::record_block_transition("preparing");
        info!(
            block_id = %block.id,
            team_id = %block.team_id,
            campaign_id = %block.campaign_id,
            block_number = block.block_number,
            "block created"
        );
        Ok(block)
    }

    /// Admit leads into a preparing block, up to remaining capacity.
    ///
    /// Leads beyond capacity are skipped, not queued; so are duplicates of
    /// already-admitted leads. Each admitted lead gets its touch-1 record
    /// pre-created in `pending`.
    pub async fn admit_leads(
        &self,
        block_id: &str,
        lead_ids: &[String],
    ) -> Result<AdmitOutcome, PacelineError> {
        validate_identifier("block_id", block_id)?;
        for lead_id in lead_ids {
            validate_identifier("lead_id", lead_id)?;
        }

        let mut block = self.load_or_not_found(block_id).await?;
        if !matches!(block.state, BlockState::Preparing) {
            return Err(PacelineError::invalid_state(format!(
                "cannot admit leads to block {block_id} in state {}",
                block.status()
            )));
        }

        let mut seen: HashSet<String> =
            index::leads(&self.store, block_id).await.into_iter().collect();
        let mut added = Vec::new();
        let mut skipped = Vec::new();
        let mut remaining = block.remaining_capacity();

        for lead_id in lead_ids {
            if remaining == 0 || seen.contains(lead_id) {
                skipped.push(lead_id.clone());
                continue;
            }
            seen.insert(lead_id.clone());
            index::add_lead(&self.store, block_id, lead_id).await;
            if touches::load_touch(&self.store, block_id, lead_id, 1).await.is_none() {
                touches::save_touch(&self.store, &pending_touch(&block, lead_id)).await;
            }
            added.push(lead_id.clone());
            remaining -= 1;
        }

        block.leads_loaded += added.len() as u32;
        block.updated_at = Utc::now();
        blocks::save_block(&self.store, &block).await;

        let full = block.remaining_capacity() == 0;
        info!(
            block_id = %block_id,
            added = added.len(),
            skipped = skipped.len(),
            full,
            "leads admitted"
        );
        Ok(AdmitOutcome {
            added,
            skipped,
            full,
        })
    }

    /// Activate a preparing block that has at least one lead.
    pub async fn start(&self, block_id: &str) -> Result<CampaignBlock, PacelineError> {
        validate_identifier("block_id", block_id)?;
        let mut block = self.load_or_not_found(block_id).await?;
        if !matches!(block.state, BlockState::Preparing) {
            return Err(PacelineError::invalid_state(format!(
                "cannot start block {block_id} in state {}",
                block.status()
            )));
        }
        if block.leads_loaded == 0 {
            return Err(PacelineError::invalid_state(format!(
                "cannot start block {block_id} with no admitted leads"
            )));
        }

        block.state = BlockState::Active {
            started_at: Utc::now(),
        };
        block.updated_at = Utc::now();
        blocks::save_block(&self.store, &block).await;
        index::add_active(&self.store, block_id).await;
        telemetry::record_block_transition("active");
        info!(block_id = %block_id, leads = block.leads_loaded, "block started");
        Ok(block)
    }

    pub async fn pause(&self, block_id: &str) -> Result<CampaignBlock, PacelineError> {
        validate_identifier("block_id", block_id)?;
        let mut block = self.load_or_not_found(block_id).await?;
        let BlockState::Active { started_at } = block.state else {
            return Err(PacelineError::invalid_state(format!(
                "cannot pause block {block_id} in state {}",
                block.status()
            )));
        };

        block.state = BlockState::Paused {
            started_at,
            paused_at: Utc::now(),
        };
        block.updated_at = Utc::now();
        blocks::save_block(&self.store, &block).await;
        index::remove_active(&self.store, block_id).await;
        telemetry::record_block_transition("paused");
        info!(block_id = %block_id, "block paused");
        Ok(block)
    }

    pub async fn resume(&self, block_id: &str) -> Result<CampaignBlock, PacelineError> {
        validate_identifier("block_id", block_id)?;
        let mut block = self.load_or_not_found(block_id).await?;
        let BlockState::Paused { started_at, .. } = block.state else {
            return Err(PacelineError::invalid_state(format!(
                "cannot resume block {block_id} in state {}",
                block.status()
            )));
        };

        block.state = BlockState::Active { started_at };
        block.updated_at = Utc::now();
        blocks::save_block(&self.store, &block).await;
        index::add_active(&self.store, block_id).await;
        telemetry::record_block_transition("active");
        info!(block_id = %block_id, "block resumed");
        Ok(block)
    }

    /// Terminate an active block, attaching final metrics.
    ///
    /// Calling on an already-terminal block is an error, not a silent
    /// success.
    pub async fn complete(
        &self,
        block_id: &str,
        metrics_override: Option<BlockMetrics>,
    ) -> Result<CampaignBlock, PacelineError> {
        validate_identifier("block_id", block_id)?;
        let mut block = self.load_or_not_found(block_id).await?;
        let BlockState::Active { started_at } = block.state else {
            return Err(PacelineError::invalid_state(format!(
                "cannot complete block {block_id} in state {}",
                block.status()
            )));
        };

        let metrics = match metrics_override {
            Some(metrics) => metrics,
            None => self.aggregator.compute(block_id, None).await,
        };
        block.state = BlockState::Completed {
            started_at,
            completed_at: Utc::now(),
            metrics,
        };
        block.updated_at = Utc::now();
        blocks::save_block(&self.store, &block).await;
        index::remove_active(&self.store, block_id).await;
        telemetry::record_block_transition("completed");
        info!(
            block_id = %block_id,
            total_touches = block.total_touches,
            "block completed"
        );
        Ok(block)
    }

    /// Route a non-terminal block out of the touch cycle.
    pub async fn pivot(
        &self,
        block_id: &str,
        target: PivotTarget,
        reason: Option<String>,
    ) -> Result<CampaignBlock, PacelineError> {
        validate_identifier("block_id", block_id)?;
        let mut block = self.load_or_not_found(block_id).await?;
        if block.is_terminal() {
            return Err(PacelineError::invalid_state(format!(
                "cannot pivot block {block_id} in terminal state {}",
                block.status()
            )));
        }

        let started_at = block.state.started_at();
        let metrics = self.aggregator.compute(block_id, None).await;
        block.state = BlockState::Pivoted {
            started_at,
            pivoted_at: Utc::now(),
            target,
            reason,
            metrics,
        };
        block.updated_at = Utc::now();
        blocks::save_block(&self.store, &block).await;
        index::remove_active(&self.store, block_id).await;
        telemetry::record_block_transition("pivoted");
        info!(block_id = %block_id, target = %target, "block pivoted");
        Ok(block)
    }

    /// Apply a new sent event to the block's counters.
    ///
    /// Called by the touch ledger on each first transition into `sent`.
    /// Bumps the atomic total counter, refreshes the block-record
    /// projection, and completes the block when the total first reaches
    /// `target_sends` while active. Infrastructure failures degrade to
    /// logged no-ops; a send must never fail because bookkeeping did.
    pub(crate) async fn note_touch_sent(&self, block_id: &str, touch_number: u32) {
        let Some(total) = counters::bump_total_touches(&self.store, block_id).await else {
            // The projection catches up on the next successful increment.
            return;
        };

        let Some(mut block) = blocks::load_block(&self.store, block_id).await else {
            debug!(block_id = %block_id, "block record unreadable, projection skipped");
            return;
        };
        if block.is_terminal() {
            // Late webhook after completion or pivot; terminal records stay
            // immutable.
            debug!(block_id = %block_id, status = %block.status(), "sent event after terminal state");
            return;
        }

        let total_u32 = u32::try_from(total.max(0)).unwrap_or(u32::MAX);
        block.total_touches = total_u32.min(block.target_sends);
        block.current_touch = block
            .current_touch
            .max(touch_number)
            .min(block.max_touches_per_lead);
        block.updated_at = Utc::now();
        blocks::save_block(&self.store, &block).await;

        let threshold_reached = matches!(block.state, BlockState::Active { .. })
            && total >= i64::from(block.target_sends);
        if threshold_reached {
            match self.complete(block_id, None).await {
                Ok(_) => {
                    info!(
                        block_id = %block_id,
                        total,
                        target_sends = block.target_sends,
                        "block auto-completed at send threshold"
                    );
                }
                Err(PacelineError::InvalidState { .. }) => {
                    // A concurrent sender crossed the threshold first.
                    debug!(block_id = %block_id, "auto-complete lost the race");
                }
                Err(err) => {
                    warn!(block_id = %block_id, error = %err, "auto-complete failed");
                }
            }
        }
    }

    fn default_channel(&self) -> ContactChannel {
        self.defaults.channel.parse().unwrap_or_default()
    }

    async fn load_or_not_found(&self, block_id: &str) -> Result<CampaignBlock, PacelineError> {
        blocks::load_block(&self.store, block_id)
            .await
            .ok_or_else(|| PacelineError::NotFound {
                entity: "block",
                id: block_id.to_string(),
            })
    }
}

fn pending_touch(block: &CampaignBlock, lead_id: &str) -> LeadTouch {
    let now = Utc::now();
    LeadTouch {
        block_id: block.id.clone(),
        lead_id: lead_id.to_string(),
        touch_number: 1,
        channel: block.channel,
        template_id: None,
        message_id: None,
        state: TouchState::Pending,
        reply: None,
        should_pivot: false,
        created_at: now,
        updated_at: now,
    }
}
