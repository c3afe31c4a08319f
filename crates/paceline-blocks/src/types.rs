// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model for campaign blocks and lead touches.
//!
//! Lifecycle state is carried by tagged enums ([`BlockState`], [`TouchState`])
//! so that state-dependent fields (timestamps, pivot target, final metrics)
//! only exist in the states where they are meaningful. The flat
//! [`BlockStatus`] / [`TouchStatus`] discriminants exist for logging and
//! query results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use paceline_core::{ContactChannel, ReplyIntent};

use crate::metrics::BlockMetrics;

/// Flat lifecycle discriminant of a block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Preparing,
    Active,
    Paused,
    Completed,
    Pivoted,
}

/// Where pivoted leads (or a whole block) are routed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PivotTarget {
    CallQueue,
    EmailSequence,
    Archive,
}

/// Why a lead (or block) left the touch cycle.
///
/// Classification priority is `opt_out` > `replied_positive` (which includes
/// question replies) > `replied_negative` > `exhausted`; see
/// [`classify_pivot_reason`](crate::cadence::classify_pivot_reason).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PivotReason {
    OptOut,
    RepliedPositive,
    RepliedNegative,
    Exhausted,
}

/// Lifecycle state of a block, with state-scoped payloads.
///
/// `preparing → active ⇄ paused`; `active → completed` (automatic at the
/// send threshold); any non-terminal state `→ pivoted` (manual). The two
/// terminal variants carry the final metrics snapshot taken at transition
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlockState {
    Preparing,
    Active {
        started_at: DateTime<Utc>,
    },
    Paused {
        started_at: DateTime<Utc>,
        paused_at: DateTime<Utc>,
    },
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        metrics: BlockMetrics,
    },
    Pivoted {
        /// Absent when the block was pivoted straight out of `preparing`.
        started_at: Option<DateTime<Utc>>,
        pivoted_at: DateTime<Utc>,
        target: PivotTarget,
        reason: Option<String>,
        metrics: BlockMetrics,
    },
}

impl BlockState {
    pub fn status(&self) -> BlockStatus {
        match self {
            BlockState::Preparing => BlockStatus::Preparing,
            BlockState::Active { .. } => BlockStatus::Active,
            BlockState::Paused { .. } => BlockStatus::Paused,
            BlockState::Completed { .. } => BlockStatus::Completed,
            BlockState::Pivoted { .. } => BlockStatus::Pivoted,
        }
    }

    /// Completed and pivoted blocks admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BlockState::Completed { .. } | BlockState::Pivoted { .. }
        )
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            BlockState::Preparing => None,
            BlockState::Active { started_at }
            | BlockState::Paused { started_at, .. }
            | BlockState::Completed { started_at, .. } => Some(*started_at),
            BlockState::Pivoted { started_at, .. } => *started_at,
        }
    }
}

/// A bounded unit of outreach work: a capped set of leads, each touched up
/// to `max_touches_per_lead` times.
///
/// The counter fields are an eventually-synced projection of the atomic
/// counter keys; `total_touches` in particular lags the counter key under
/// concurrent sends and must not be used as the completion authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignBlock {
    pub id: String,
    pub team_id: String,
    pub campaign_id: String,
    /// Sequential within (team, campaign): 1, 2, 3, ...
    pub block_number: u32,

    /// Admission ceiling.
    pub max_leads: u32,
    pub max_touches_per_lead: u32,
    /// Authoritative completion threshold. Usually
    /// `max_leads * max_touches_per_lead`, but stored independently.
    pub target_sends: u32,
    /// Minimum wait before the next touch to the same lead.
    pub delay_between_touches_secs: u64,
    pub channel: ContactChannel,

    pub leads_loaded: u32,
    /// Touches that reached sent or later (projection, see above).
    pub total_touches: u32,
    /// High-water mark of touch number reached across all leads.
    pub current_touch: u32,

    pub state: BlockState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignBlock {
    pub fn status(&self) -> BlockStatus {
        self.state.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.max_leads.saturating_sub(self.leads_loaded)
    }

    pub fn delay_between_touches(&self) -> chrono::Duration {
        i64::try_from(self.delay_between_touches_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Parameters for [`create_block`](crate::lifecycle::BlockManager::create_block).
///
/// Capacity fields fall back to the configured block defaults when absent;
/// `target_sends` falls back to `max_leads * max_touches_per_lead`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBlockRequest {
    pub team_id: String,
    pub campaign_id: String,
    pub max_leads: Option<u32>,
    pub max_touches_per_lead: Option<u32>,
    pub target_sends: Option<u32>,
    pub delay_between_touches_secs: Option<u64>,
    pub channel: Option<ContactChannel>,
}

impl CreateBlockRequest {
    pub fn new(team_id: impl Into<String>, campaign_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            campaign_id: campaign_id.into(),
            ..Self::default()
        }
    }
}

/// Flat delivery discriminant of a touch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TouchStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

/// Delivery state of a touch: `pending → sent → delivered`, or `→ failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TouchState {
    Pending,
    Sent {
        sent_at: DateTime<Utc>,
    },
    Delivered {
        sent_at: DateTime<Utc>,
        delivered_at: DateTime<Utc>,
    },
    Failed {
        /// Absent when the send failed before anything left the door.
        sent_at: Option<DateTime<Utc>>,
        reason: Option<String>,
    },
}

impl TouchState {
    pub fn status(&self) -> TouchStatus {
        match self {
            TouchState::Pending => TouchStatus::Pending,
            TouchState::Sent { .. } => TouchStatus::Sent,
            TouchState::Delivered { .. } => TouchStatus::Delivered,
            TouchState::Failed { .. } => TouchStatus::Failed,
        }
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TouchState::Pending => None,
            TouchState::Sent { sent_at } | TouchState::Delivered { sent_at, .. } => {
                Some(*sent_at)
            }
            TouchState::Failed { sent_at, .. } => *sent_at,
        }
    }

    /// Any state other than pending counts as an attempted send.
    pub fn left_pending(&self) -> bool {
        !matches!(self, TouchState::Pending)
    }
}

/// An inbound reply attributed to one touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchReply {
    pub replied_at: DateTime<Utc>,
    pub intent: ReplyIntent,
}

/// One attempted contact to one lead within one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTouch {
    pub block_id: String,
    pub lead_id: String,
    /// 1-based, strictly increasing per lead by convention.
    pub touch_number: u32,
    pub channel: ContactChannel,
    pub template_id: Option<String>,
    pub message_id: Option<String>,
    pub state: TouchState,
    pub reply: Option<TouchReply>,
    /// Set unconditionally when any reply lands, whatever its intent.
    pub should_pivot: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadTouch {
    pub fn replied(&self) -> bool {
        self.reply.is_some()
    }

    pub fn reply_intent(&self) -> Option<ReplyIntent> {
        self.reply.map(|r| r.intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_block(state: BlockState) -> CampaignBlock {
        let now = Utc::now();
        CampaignBlock {
            id: "b1".to_string(),
            team_id: "t1".to_string(),
            campaign_id: "c1".to_string(),
            block_number: 1,
            max_leads: 100,
            max_touches_per_lead: 5,
            target_sends: 500,
            delay_between_touches_secs: 172_800,
            channel: ContactChannel::Sms,
            leads_loaded: 40,
            total_touches: 0,
            current_touch: 0,
            state,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn block_state_status_mapping() {
        let now = Utc::now();
        assert_eq!(BlockState::Preparing.status(), BlockStatus::Preparing);
        assert_eq!(
            BlockState::Active { started_at: now }.status(),
            BlockStatus::Active
        );
        assert_eq!(
            BlockState::Paused {
                started_at: now,
                paused_at: now
            }
            .status(),
            BlockStatus::Paused
        );
        assert!(
            BlockState::Completed {
                started_at: now,
                completed_at: now,
                metrics: BlockMetrics::default()
            }
            .is_terminal()
        );
        assert!(
            BlockState::Pivoted {
                started_at: None,
                pivoted_at: now,
                target: PivotTarget::Archive,
                reason: None,
                metrics: BlockMetrics::default()
            }
            .is_terminal()
        );
        assert!(!BlockState::Preparing.is_terminal());
    }

    #[test]
    fn block_state_serializes_with_status_tag() {
        let json = serde_json::to_value(BlockState::Preparing).unwrap();
        assert_eq!(json["status"], "preparing");

        let state = BlockState::Pivoted {
            started_at: None,
            pivoted_at: Utc::now(),
            target: PivotTarget::CallQueue,
            reason: Some("too many opt-outs".to_string()),
            metrics: BlockMetrics::default(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "pivoted");
        assert_eq!(json["target"], "call_queue");
        assert_eq!(json["started_at"], serde_json::Value::Null);

        let back: BlockState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn touch_state_serializes_with_status_tag() {
        let now = Utc::now();
        let state = TouchState::Delivered {
            sent_at: now,
            delivered_at: now,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "delivered");
        let back: TouchState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);

        assert_eq!(
            serde_json::to_value(TouchState::Pending).unwrap()["status"],
            "pending"
        );
    }

    #[test]
    fn touch_state_sent_at_by_variant() {
        let now = Utc::now();
        assert_eq!(TouchState::Pending.sent_at(), None);
        assert_eq!(TouchState::Sent { sent_at: now }.sent_at(), Some(now));
        assert_eq!(
            TouchState::Failed {
                sent_at: None,
                reason: Some("carrier rejected".to_string())
            }
            .sent_at(),
            None
        );
        assert!(!TouchState::Pending.left_pending());
        assert!(
            TouchState::Failed {
                sent_at: None,
                reason: None
            }
            .left_pending()
        );
    }

    #[test]
    fn pivot_enums_use_snake_case() {
        assert_eq!(PivotReason::RepliedPositive.to_string(), "replied_positive");
        assert_eq!(PivotReason::from_str("opt_out").unwrap(), PivotReason::OptOut);
        assert_eq!(PivotTarget::EmailSequence.to_string(), "email_sequence");
        assert_eq!(
            PivotTarget::from_str("call_queue").unwrap(),
            PivotTarget::CallQueue
        );
    }

    #[test]
    fn remaining_capacity_saturates() {
        let mut block = sample_block(BlockState::Preparing);
        assert_eq!(block.remaining_capacity(), 60);
        block.leads_loaded = 100;
        assert_eq!(block.remaining_capacity(), 0);
        block.leads_loaded = 120;
        assert_eq!(block.remaining_capacity(), 0);
    }

    #[test]
    fn campaign_block_json_round_trip() {
        let block = sample_block(BlockState::Active {
            started_at: Utc::now(),
        });
        let json = serde_json::to_string(&block).unwrap();
        let back: CampaignBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.status(), BlockStatus::Active);
    }

    #[test]
    fn create_request_defaults_to_no_overrides() {
        let req = CreateBlockRequest::new("t1", "c1");
        assert_eq!(req.team_id, "t1");
        assert!(req.max_leads.is_none());
        assert!(req.channel.is_none());
    }
}
