// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Paceline outreach engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at load time, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Paceline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PacelineConfig {
    /// Engine-wide settings (key namespace, query limits).
    #[serde(default)]
    pub engine: EngineConfig,

    /// Defaults applied to newly created blocks.
    #[serde(default)]
    pub blocks: BlockDefaults,

    /// Cache key lifetime settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Namespace prefix for every cache key written by the engine.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Upper bound on batch query results (`leads_for_next_touch`,
    /// `leads_to_pivot`); caller-supplied limits are capped to this.
    #[serde(default = "default_query_batch_limit")]
    pub query_batch_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            query_batch_limit: default_query_batch_limit(),
        }
    }
}

fn default_namespace() -> String {
    "paceline".to_string()
}

fn default_query_batch_limit() -> usize {
    50
}

/// Defaults applied to newly created blocks when the creation request leaves
/// a field unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlockDefaults {
    /// Admission ceiling: maximum leads loaded into one block.
    #[serde(default = "default_max_leads")]
    pub max_leads: u32,

    /// Touch budget: maximum contact attempts per lead before exhaustion.
    #[serde(default = "default_max_touches_per_lead")]
    pub max_touches_per_lead: u32,

    /// Minimum wait in seconds before the next touch to the same lead.
    #[serde(default = "default_delay_between_touches_secs")]
    pub delay_between_touches_secs: u64,

    /// Outreach channel for new blocks ("sms" or "email").
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl BlockDefaults {
    /// The cadence delay as a `Duration`.
    pub fn delay_between_touches(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.delay_between_touches_secs)
    }
}

impl Default for BlockDefaults {
    fn default() -> Self {
        Self {
            max_leads: default_max_leads(),
            max_touches_per_lead: default_max_touches_per_lead(),
            delay_between_touches_secs: default_delay_between_touches_secs(),
            channel: default_channel(),
        }
    }
}

fn default_max_leads() -> u32 {
    100
}

fn default_max_touches_per_lead() -> u32 {
    5
}

fn default_delay_between_touches_secs() -> u64 {
    172_800 // 48 hours
}

fn default_channel() -> String {
    "sms".to_string()
}

/// Cache key lifetime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Lifetime in seconds for every block-scoped key (block record, touch
    /// records, counters, lead index). Re-armed on each write so a block's
    /// state expires together once writes stop.
    #[serde(default = "default_block_ttl_secs")]
    pub block_ttl_secs: u64,
}

impl CacheConfig {
    /// The block key lifetime as a `Duration`.
    pub fn block_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.block_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            block_ttl_secs: default_block_ttl_secs(),
        }
    }
}

fn default_block_ttl_secs() -> u64 {
    2_592_000 // 30 days
}
