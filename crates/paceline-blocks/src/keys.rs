// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache key layout for blocks, touches, counters, and index sets.
//!
//! Every key is prefixed by a configurable namespace so multiple engines can
//! share one cache. Identifiers embedded in keys must not contain `:` (the
//! segment delimiter); config validation and request validation enforce this.

use paceline_core::PacelineError;

/// Check that a caller-supplied identifier can be embedded in a cache key.
pub(crate) fn validate_identifier(field: &str, value: &str) -> Result<(), PacelineError> {
    if value.trim().is_empty() {
        return Err(PacelineError::Validation(format!(
            "{field} must not be empty"
        )));
    }
    if value.contains(':') {
        return Err(PacelineError::Validation(format!(
            "{field} `{value}` must not contain `:`"
        )));
    }
    Ok(())
}

/// Builds namespaced cache keys.
#[derive(Debug, Clone)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// `{ns}:block:{block_id}`, the serialized [`CampaignBlock`] record.
    ///
    /// [`CampaignBlock`]: crate::types::CampaignBlock
    pub fn block(&self, block_id: &str) -> String {
        format!("{}:block:{block_id}", self.namespace)
    }

    /// `{ns}:touch:{block_id}:{lead_id}:{touch_number}`, one touch record.
    pub fn touch(&self, block_id: &str, lead_id: &str, touch_number: u32) -> String {
        format!("{}:touch:{block_id}:{lead_id}:{touch_number}", self.namespace)
    }

    /// Prefix covering every touch record of a block. Used only by the
    /// metrics aggregator's recovery scan when the lead index is gone.
    pub fn touch_prefix(&self, block_id: &str) -> String {
        format!("{}:touch:{block_id}:", self.namespace)
    }

    /// `{ns}:ctr:{block_id}:total`, the atomic send counter backing
    /// `total_touches`.
    pub fn total_counter(&self, block_id: &str) -> String {
        format!("{}:ctr:{block_id}:total", self.namespace)
    }

    /// `{ns}:leads:{block_id}`, the set of lead ids admitted to a block.
    pub fn lead_index(&self, block_id: &str) -> String {
        format!("{}:leads:{block_id}", self.namespace)
    }

    /// `{ns}:campaign:{team_id}:{campaign_id}`, the set of block ids
    /// belonging to one campaign, in no particular order.
    pub fn campaign_index(&self, team_id: &str, campaign_id: &str) -> String {
        format!("{}:campaign:{team_id}:{campaign_id}", self.namespace)
    }

    /// `{ns}:active`, the set of block ids currently in the active state.
    pub fn active_set(&self) -> String {
        format!("{}:active", self.namespace)
    }

    /// Recover `(lead_id, touch_number)` from a full touch key, given the
    /// block it was scanned under. Returns `None` for keys that do not
    /// match the touch layout.
    pub fn parse_touch_key(&self, block_id: &str, key: &str) -> Option<(String, u32)> {
        let rest = key.strip_prefix(&self.touch_prefix(block_id))?;
        let (lead_id, number) = rest.rsplit_once(':')?;
        if lead_id.is_empty() {
            return None;
        }
        let touch_number: u32 = number.parse().ok()?;
        Some((lead_id.to_string(), touch_number))
    }
}
