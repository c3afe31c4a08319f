// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end block engine testing.
//!
//! `TestHarness` assembles a [`BlockEngine`] over a configurable cache
//! adapter (in-memory by default) with compact block defaults, so tests
//! can drive full admit/start/touch/pivot cycles in a few lines.

use std::sync::Arc;

use paceline_blocks::{BlockEngine, CampaignBlock, CreateBlockRequest};
use paceline_cache::MemoryCache;
use paceline_config::PacelineConfig;
use paceline_core::{CacheAdapter, PacelineError};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    cache: Option<Arc<dyn CacheAdapter>>,
    max_leads: u32,
    max_touches_per_lead: u32,
    delay_between_touches_secs: u64,
    namespace: String,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            cache: None,
            max_leads: 10,
            max_touches_per_lead: 3,
            delay_between_touches_secs: 0,
            namespace: "test".to_string(),
        }
    }

    /// Swap the in-memory cache for another adapter, e.g. a failing one.
    pub fn with_cache(mut self, cache: Arc<dyn CacheAdapter>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Override the default block capacity.
    pub fn with_capacity(mut self, max_leads: u32, max_touches_per_lead: u32) -> Self {
        self.max_leads = max_leads;
        self.max_touches_per_lead = max_touches_per_lead;
        self
    }

    /// Override the default delay between touches (in seconds).
    pub fn with_delay_secs(mut self, secs: u64) -> Self {
        self.delay_between_touches_secs = secs;
        self
    }

    /// Override the cache key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Build the harness and its engine.
    pub fn build(self) -> TestHarness {
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()));

        let mut config = PacelineConfig::default();
        config.engine.namespace = self.namespace;
        config.blocks.max_leads = self.max_leads;
        config.blocks.max_touches_per_lead = self.max_touches_per_lead;
        config.blocks.delay_between_touches_secs = self.delay_between_touches_secs;

        TestHarness {
            engine: BlockEngine::new(cache.clone(), config.clone()),
            cache,
            config,
        }
    }
}

/// A complete test environment: engine, its cache handle, and the config
/// it was built from. All fields are public for assertions.
pub struct TestHarness {
    pub engine: BlockEngine,
    pub cache: Arc<dyn CacheAdapter>,
    pub config: PacelineConfig,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Build a harness with all defaults.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create, fill, and start a block using the harness defaults.
    pub async fn active_block(&self, lead_ids: &[&str]) -> Result<CampaignBlock, PacelineError> {
        let block = self
            .engine
            .create_block(CreateBlockRequest::new("team-1", "campaign-1"))
            .await?;
        let ids: Vec<String> = lead_ids.iter().map(|s| s.to_string()).collect();
        self.engine.admit_leads(&block.id, &ids).await?;
        self.engine.start(&block.id).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paceline_blocks::{BlockStatus, ReplyIntent};

    #[tokio::test]
    async fn harness_drives_a_full_cycle() {
        let harness = TestHarness::builder().with_capacity(2, 2).build();
        let block = harness.active_block(&["a", "b"]).await.unwrap();
        assert_eq!(block.status(), BlockStatus::Active);
        assert_eq!(block.max_leads, 2);
        assert_eq!(block.max_touches_per_lead, 2);

        harness
            .engine
            .record_sent(&block.id, "a", 1, None, None)
            .await
            .unwrap();
        harness
            .engine
            .record_reply(&block.id, "a", 1, ReplyIntent::Positive)
            .await
            .unwrap();

        let pivots = harness.engine.leads_to_pivot(&block.id, 10).await.unwrap();
        assert_eq!(pivots.len(), 1);
        assert_eq!(pivots[0].lead_id, "a");
    }

    #[tokio::test]
    async fn namespaces_isolate_engines_on_a_shared_cache() {
        let cache: Arc<dyn CacheAdapter> = Arc::new(MemoryCache::new());
        let one = TestHarness::builder()
            .with_cache(cache.clone())
            .with_namespace("one")
            .build();
        let two = TestHarness::builder()
            .with_cache(cache)
            .with_namespace("two")
            .build();

        let block = one.active_block(&["a"]).await.unwrap();
        assert!(one.engine.block(&block.id).await.unwrap().is_some());
        assert!(two.engine.block(&block.id).await.unwrap().is_none());
        assert!(two.engine.active_blocks().await.is_empty());
        assert_eq!(one.engine.active_blocks().await.len(), 1);
    }
}
