// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache adapters that fail on purpose.
//!
//! [`FailingCache`] refuses every operation; [`FlakyCache`] works for a
//! budgeted number of operations and then dies. Both exist to exercise the
//! engine's degraded paths: reads falling back to not-found, writes
//! becoming logged no-ops, touch recording never hard-failing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use paceline_cache::MemoryCache;
use paceline_core::{CacheAdapter, HealthStatus, PacelineError};

fn refused() -> PacelineError {
    PacelineError::cache("connection refused")
}

/// A cache whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingCache;

impl FailingCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheAdapter for FailingCache {
    fn name(&self) -> &str {
        "failing"
    }

    async fn health_check(&self) -> Result<HealthStatus, PacelineError> {
        Ok(HealthStatus::Unhealthy("connection refused".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, PacelineError> {
        Err(refused())
    }

    async fn set(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Option<Duration>,
    ) -> Result<(), PacelineError> {
        Err(refused())
    }

    async fn increment(
        &self,
        _key: &str,
        _by: i64,
        _ttl: Option<Duration>,
    ) -> Result<i64, PacelineError> {
        Err(refused())
    }

    async fn keys_by_prefix(&self, _prefix: &str) -> Result<Vec<String>, PacelineError> {
        Err(refused())
    }

    async fn add_to_set(
        &self,
        _key: &str,
        _member: &str,
        _ttl: Option<Duration>,
    ) -> Result<(), PacelineError> {
        Err(refused())
    }

    async fn remove_from_set(&self, _key: &str, _member: &str) -> Result<(), PacelineError> {
        Err(refused())
    }

    async fn members_of_set(&self, _key: &str) -> Result<Vec<String>, PacelineError> {
        Err(refused())
    }
}

/// A cache that works for a fixed number of operations, then fails
/// everything after.
///
/// Useful for testing mid-flight degradation: set the budget high enough
/// to build a block, then watch subsequent operations degrade.
#[derive(Debug)]
pub struct FlakyCache {
    inner: MemoryCache,
    remaining: AtomicUsize,
}

impl FlakyCache {
    /// Succeed for `ops` operations, fail afterwards.
    pub fn failing_after(ops: usize) -> Self {
        Self {
            inner: MemoryCache::new(),
            remaining: AtomicUsize::new(ops),
        }
    }

    /// Exhaust the budget immediately.
    pub fn kill(&self) {
        self.remaining.store(0, Ordering::SeqCst);
    }

    fn spend(&self) -> Result<(), PacelineError> {
        let spent = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .map_err(|_| refused())?;
        if spent == 1 {
            tracing::debug!("flaky cache budget exhausted, failing from here on");
        }
        Ok(())
    }
}

#[async_trait]
impl CacheAdapter for FlakyCache {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn health_check(&self) -> Result<HealthStatus, PacelineError> {
        if self.remaining.load(Ordering::SeqCst) == 0 {
            Ok(HealthStatus::Unhealthy("budget exhausted".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PacelineError> {
        self.spend()?;
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), PacelineError> {
        self.spend()?;
        self.inner.set(key, value, ttl).await
    }

    async fn increment(
        &self,
        key: &str,
        by: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, PacelineError> {
        self.spend()?;
        self.inner.increment(key, by, ttl).await
    }

    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, PacelineError> {
        self.spend()?;
        self.inner.keys_by_prefix(prefix).await
    }

    async fn add_to_set(
        &self,
        key: &str,
        member: &str,
        ttl: Option<Duration>,
    ) -> Result<(), PacelineError> {
        self.spend()?;
        self.inner.add_to_set(key, member, ttl).await
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> Result<(), PacelineError> {
        self.spend()?;
        self.inner.remove_from_set(key, member).await
    }

    async fn members_of_set(&self, key: &str) -> Result<Vec<String>, PacelineError> {
        self.spend()?;
        self.inner.members_of_set(key).await
    }
}
