// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. The engine never installs a recorder itself;
//! that belongs to the embedding application.

use metrics::{describe_counter, describe_gauge};

/// Register all Paceline metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "paceline_touches_total",
        "Touch events recorded, by outcome and channel"
    );
    describe_counter!("paceline_replies_total", "Replies recorded, by intent");
    describe_counter!(
        "paceline_block_transitions_total",
        "Block lifecycle transitions, by resulting status"
    );
    describe_gauge!("paceline_active_blocks", "Blocks currently active");
}

/// Record a touch event (sent, delivered, failed).
pub fn record_touch(outcome: &str, channel: &str) {
    metrics::counter!(
        "paceline_touches_total",
        "outcome" => outcome.to_string(),
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// Record an inbound reply.
pub fn record_reply(intent: &str) {
    metrics::counter!("paceline_replies_total", "intent" => intent.to_string()).increment(1);
}

/// Record a block lifecycle transition.
pub fn record_block_transition(status: &str) {
    metrics::counter!("paceline_block_transitions_total", "status" => status.to_string())
        .increment(1);
}

/// Set the number of currently active blocks.
pub fn set_active_blocks(count: f64) {
    metrics::gauge!("paceline_active_blocks").set(count);
}
