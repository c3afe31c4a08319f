// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache adapter trait for the shared key-value store backing the engine.
//!
//! The engine treats the cache as at-most-eventually-consistent and externally
//! owned. Adapters should surface backend failures as
//! [`PacelineError::Cache`]; the engine's store layer degrades those into
//! "not found" reads and logged no-op writes rather than failing callers.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::PacelineError;
use crate::types::HealthStatus;

/// Adapter for the shared key-value cache used as the durable-enough state
/// store for blocks and touches.
///
/// Semantics expected of implementations:
/// - Plain values are opaque strings (the engine stores JSON).
/// - A `ttl` of `None` means the key never expires; `Some` (re)arms expiry on
///   every write, so a block's keys expire together as long as writes keep
///   landing.
/// - `increment` is atomic with respect to concurrent increments of the same
///   key and treats a missing key as `0`.
/// - `keys_by_prefix` is best-effort and may be expensive; it exists for
///   recovery scans, not hot paths.
#[async_trait]
pub trait CacheAdapter: Send + Sync + 'static {
    /// Human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Performs a health check and returns the backend's current status.
    async fn health_check(&self) -> Result<HealthStatus, PacelineError>;

    /// Fetch a plain value. `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, PacelineError>;

    /// Store a plain value, replacing any previous value and expiry.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), PacelineError>;

    /// Atomically add `by` to an integer counter key, returning the new
    /// value. Missing keys start at `0`.
    async fn increment(
        &self,
        key: &str,
        by: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, PacelineError>;

    /// Enumerate keys starting with `prefix`. Best-effort.
    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, PacelineError>;

    /// Add a member to a set key, creating the set if absent. `ttl` re-arms
    /// the whole set's expiry.
    async fn add_to_set(
        &self,
        key: &str,
        member: &str,
        ttl: Option<Duration>,
    ) -> Result<(), PacelineError>;

    /// Remove a member from a set key. Removing from an absent set is not an
    /// error.
    async fn remove_from_set(&self, key: &str, member: &str) -> Result<(), PacelineError>;

    /// List the members of a set key. `Ok(empty)` when the set is absent.
    async fn members_of_set(&self, key: &str) -> Result<Vec<String>, PacelineError>;
}
