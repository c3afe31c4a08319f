// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Paceline integration tests.
//!
//! Provides failure-injecting cache adapters and a test harness for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`FailingCache`] - cache adapter whose every operation fails
//! - [`FlakyCache`] - cache adapter that dies after a budgeted number of operations
//! - [`TestHarness`] - assembled [`BlockEngine`](paceline_blocks::BlockEngine) over a configurable cache

pub mod failing_cache;
pub mod harness;

pub use failing_cache::{FailingCache, FlakyCache};
pub use harness::TestHarness;
