// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The block engine facade.
//!
//! [`BlockEngine`] wires the lifecycle manager, touch ledger, cadence
//! evaluator, and metrics aggregator over one shared cache and exposes the
//! whole operation surface behind a single handle. Everything is `Clone`
//! and cheap to share across tasks; all coordination happens in the cache.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use paceline_config::PacelineConfig;
use paceline_core::{CacheAdapter, HealthStatus, PacelineError, ReplyIntent};

use crate::cadence::{CadenceEvaluator, NextTouch, PivotCandidate};
use crate::keys::{validate_identifier, KeySpace};
use crate::ledger::{LeadTouchStatus, TouchLedger, TouchOutcome};
use crate::lifecycle::{AdmitOutcome, BlockManager};
use crate::metrics::{BlockMetrics, CostInputs, MetricsAggregator};
use crate::store::{blocks, counters, index, Store};
use crate::telemetry;
use crate::types::{
    BlockStatus, CampaignBlock, CreateBlockRequest, LeadTouch, PivotReason, PivotTarget,
};

/// Point-in-time progress summary for one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockProgress {
    pub block_id: String,
    pub status: BlockStatus,
    /// Sends as a share of `target_sends`, 0.0 to 100.0.
    pub percent_complete: f64,
    pub touches_sent: u32,
    pub target_sends: u32,
    pub leads_loaded: u32,
    pub leads_in_progress: u32,
    pub leads_replied_positive: u32,
    pub leads_replied_negative: u32,
    pub leads_opted_out: u32,
    pub leads_exhausted: u32,
}

/// One engine per cache namespace. Construct once, clone freely.
#[derive(Clone)]
pub struct BlockEngine {
    store: Store,
    manager: BlockManager,
    ledger: TouchLedger,
    evaluator: CadenceEvaluator,
    aggregator: MetricsAggregator,
}

impl BlockEngine {
    pub fn new(cache: Arc<dyn CacheAdapter>, config: PacelineConfig) -> Self {
        let store = Store::new(
            cache,
            KeySpace::new(&config.engine.namespace),
            config.cache.block_ttl(),
        );
        let aggregator = MetricsAggregator::new(store.clone(), config.blocks.clone());
        let manager = BlockManager::new(store.clone(), aggregator.clone(), config.blocks.clone());
        let ledger = TouchLedger::new(store.clone(), manager.clone(), config.blocks.clone());
        let evaluator = CadenceEvaluator::new(
            store.clone(),
            ledger.clone(),
            config.engine.query_batch_limit,
        );
        Self {
            store,
            manager,
            ledger,
            evaluator,
            aggregator,
        }
    }

    // Lifecycle.

    pub async fn create_block(
        &self,
        req: CreateBlockRequest,
    ) -> Result<CampaignBlock, PacelineError> {
        self.manager.create_block(req).await
    }

    pub async fn admit_leads(
        &self,
        block_id: &str,
        lead_ids: &[String],
    ) -> Result<AdmitOutcome, PacelineError> {
        self.manager.admit_leads(block_id, lead_ids).await
    }

    pub async fn start(&self, block_id: &str) -> Result<CampaignBlock, PacelineError> {
        self.manager.start(block_id).await
    }

    pub async fn pause(&self, block_id: &str) -> Result<CampaignBlock, PacelineError> {
        self.manager.pause(block_id).await
    }

    pub async fn resume(&self, block_id: &str) -> Result<CampaignBlock, PacelineError> {
        self.manager.resume(block_id).await
    }

    pub async fn complete(
        &self,
        block_id: &str,
        metrics_override: Option<BlockMetrics>,
    ) -> Result<CampaignBlock, PacelineError> {
        self.manager.complete(block_id, metrics_override).await
    }

    pub async fn pivot(
        &self,
        block_id: &str,
        target: PivotTarget,
        reason: Option<String>,
    ) -> Result<CampaignBlock, PacelineError> {
        self.manager.pivot(block_id, target, reason).await
    }

    // Touch control.

    pub async fn record_sent(
        &self,
        block_id: &str,
        lead_id: &str,
        touch_number: u32,
        template_id: Option<&str>,
        message_id: Option<&str>,
    ) -> Result<LeadTouch, PacelineError> {
        self.ledger
            .record_sent(block_id, lead_id, touch_number, template_id, message_id)
            .await
    }

    pub async fn record_delivered(
        &self,
        block_id: &str,
        lead_id: &str,
        touch_number: u32,
        message_id: &str,
    ) -> Result<TouchOutcome, PacelineError> {
        self.ledger
            .record_delivered(block_id, lead_id, touch_number, message_id)
            .await
    }

    pub async fn record_failed(
        &self,
        block_id: &str,
        lead_id: &str,
        touch_number: u32,
        reason: Option<&str>,
    ) -> Result<TouchOutcome, PacelineError> {
        self.ledger
            .record_failed(block_id, lead_id, touch_number, reason)
            .await
    }

    pub async fn record_reply(
        &self,
        block_id: &str,
        lead_id: &str,
        touch_number: u32,
        intent: ReplyIntent,
    ) -> Result<TouchOutcome, PacelineError> {
        self.ledger
            .record_reply(block_id, lead_id, touch_number, intent)
            .await
    }

    // Queries.

    pub async fn block(&self, block_id: &str) -> Result<Option<CampaignBlock>, PacelineError> {
        validate_identifier("block_id", block_id)?;
        Ok(blocks::load_block(&self.store, block_id).await)
    }

    /// All blocks of one campaign, ordered by block number.
    pub async fn blocks_for_campaign(
        &self,
        team_id: &str,
        campaign_id: &str,
    ) -> Result<Vec<CampaignBlock>, PacelineError> {
        validate_identifier("team_id", team_id)?;
        validate_identifier("campaign_id", campaign_id)?;
        let ids = index::campaign_blocks(&self.store, team_id, campaign_id).await;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(block) = blocks::load_block(&self.store, &id).await {
                found.push(block);
            }
        }
        found.sort_by_key(|block| block.block_number);
        Ok(found)
    }

    /// Currently active blocks, ordered by start time.
    ///
    /// Entries whose record no longer reads back as active are dropped
    /// from the listing; the set entry itself ages out via TTL.
    pub async fn active_blocks(&self) -> Vec<CampaignBlock> {
        let ids = index::active_blocks(&self.store).await;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match blocks::load_block(&self.store, &id).await {
                Some(block) if block.status() == BlockStatus::Active => found.push(block),
                Some(block) => {
                    debug!(
                        block_id = %id,
                        status = %block.status(),
                        "stale active-set entry skipped"
                    );
                }
                None => {
                    debug!(block_id = %id, "active-set entry without a block record");
                }
            }
        }
        found.sort_by_key(|block| block.state.started_at());
        telemetry::set_active_blocks(found.len() as f64);
        found
    }

    pub async fn touch_status(
        &self,
        block_id: &str,
        lead_id: &str,
    ) -> Result<LeadTouchStatus, PacelineError> {
        self.ledger.touch_status(block_id, lead_id).await
    }

    pub async fn leads_for_next_touch(
        &self,
        block_id: &str,
        limit: usize,
    ) -> Result<Vec<NextTouch>, PacelineError> {
        self.evaluator.leads_for_next_touch(block_id, limit).await
    }

    pub async fn leads_to_pivot(
        &self,
        block_id: &str,
        limit: usize,
    ) -> Result<Vec<PivotCandidate>, PacelineError> {
        self.evaluator.leads_to_pivot(block_id, limit).await
    }

    /// Progress summary with per-category lead counts.
    ///
    /// The send count prefers the atomic counter and falls back to the
    /// block-record projection when the counter is unreadable.
    pub async fn block_progress(&self, block_id: &str) -> Result<BlockProgress, PacelineError> {
        validate_identifier("block_id", block_id)?;
        let Some(block) = blocks::load_block(&self.store, block_id).await else {
            return Err(PacelineError::NotFound {
                entity: "block",
                id: block_id.to_string(),
            });
        };

        let touches_sent = counters::total_touches(&self.store, block_id)
            .await
            .and_then(|total| u32::try_from(total).ok())
            .unwrap_or(block.total_touches);
        let percent_complete = if block.target_sends == 0 {
            0.0
        } else {
            (f64::from(touches_sent) / f64::from(block.target_sends) * 100.0).min(100.0)
        };

        let mut progress = BlockProgress {
            block_id: block.id.clone(),
            status: block.status(),
            percent_complete,
            touches_sent,
            target_sends: block.target_sends,
            leads_loaded: block.leads_loaded,
            leads_in_progress: 0,
            leads_replied_positive: 0,
            leads_replied_negative: 0,
            leads_opted_out: 0,
            leads_exhausted: 0,
        };
        let delay = block.delay_between_touches();
        for lead_id in index::leads(&self.store, block_id).await {
            let status = self.ledger.touch_status(block_id, &lead_id).await?;
            let decision = crate::cadence::evaluate(&status, block.max_touches_per_lead, delay);
            match decision.pivot_reason {
                None => progress.leads_in_progress += 1,
                Some(PivotReason::OptOut) => progress.leads_opted_out += 1,
                Some(PivotReason::RepliedPositive) => progress.leads_replied_positive += 1,
                Some(PivotReason::RepliedNegative) => progress.leads_replied_negative += 1,
                Some(PivotReason::Exhausted) => progress.leads_exhausted += 1,
            }
        }
        Ok(progress)
    }

    /// Metrics snapshot for a block, folding in caller-supplied cost
    /// inputs when given.
    pub async fn block_metrics(
        &self,
        block_id: &str,
        cost: Option<CostInputs>,
    ) -> Result<BlockMetrics, PacelineError> {
        validate_identifier("block_id", block_id)?;
        Ok(self.aggregator.compute(block_id, cost).await)
    }

    pub async fn health_check(&self) -> HealthStatus {
        self.store.health().await
    }
}
