// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared vocabulary used across the Paceline workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by cache adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// The outreach channel a touch is sent on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContactChannel {
    #[default]
    Sms,
    Email,
}

/// The classified meaning of an inbound reply.
///
/// A reply of any intent (even a mere question) stops further touches to
/// that lead; the intent only matters for metrics bucketing and
/// pivot-reason classification downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReplyIntent {
    Positive,
    Negative,
    Question,
    OptOut,
}

impl ReplyIntent {
    /// Whether this intent counts toward the positive bucket for rate
    /// purposes (questions merge into positive there, while staying
    /// distinct for pivot-reason classification).
    pub fn counts_as_positive(self) -> bool {
        matches!(self, Self::Positive | Self::Question)
    }
}
