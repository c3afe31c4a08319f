// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded multi-touch outreach blocks.
//!
//! A *block* is a bounded slice of an outreach campaign: up to
//! `max_leads` leads, each touched at most `max_touches_per_lead` times
//! with a minimum delay between touches, until the lead replies or spends
//! its budget and is pivoted to a downstream channel. Every piece of
//! state lives in a shared key-value cache behind
//! [`CacheAdapter`]; the engine keeps nothing in process
//! memory, so any number of workers can drive the same block.
//!
//! [`BlockEngine`] is the entry point: it wires the lifecycle manager,
//! touch ledger, cadence evaluator, and metrics aggregator over one cache
//! handle. The typical loop: [`BlockEngine::leads_for_next_touch`] to
//! fetch due work, send through an external channel, report back via the
//! `record_*` operations, and periodically drain
//! [`BlockEngine::leads_to_pivot`] to route finished leads.

pub mod cadence;
pub mod engine;
mod keys;
pub mod ledger;
pub mod lifecycle;
pub mod metrics;
mod store;
pub mod telemetry;
pub mod types;

pub use cadence::{CadenceDecision, CadenceEvaluator, NextTouch, PivotCandidate};
pub use engine::{BlockEngine, BlockProgress};
pub use ledger::{LeadTouchStatus, TouchLedger, TouchOutcome};
pub use lifecycle::{AdmitOutcome, BlockManager};
pub use metrics::{BlockMetrics, CostInputs, MetricsAggregator, TouchBucket};
pub use types::{
    BlockState, BlockStatus, CampaignBlock, CreateBlockRequest, LeadTouch, PivotReason,
    PivotTarget, TouchReply, TouchState, TouchStatus,
};

pub use paceline_core::{CacheAdapter, ContactChannel, HealthStatus, PacelineError, ReplyIntent};
