// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache access layer shared by the engine components.
//!
//! All cache traffic funnels through [`Store`], which owns the degradation
//! policy: a failed or malformed read degrades to absent, a failed write
//! degrades to a logged no-op. Callers above this layer never see a
//! [`PacelineError::Cache`]; scheduling keeps moving through infrastructure
//! blips at the cost of under-counting while the cache is away.

pub mod blocks;
pub mod counters;
pub mod index;
pub mod touches;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use paceline_core::{CacheAdapter, HealthStatus, PacelineError};

use crate::keys::KeySpace;

/// Shared handle over the cache adapter, key layout, and record TTL.
///
/// Cheap to clone; every engine component holds its own copy.
#[derive(Clone)]
pub struct Store {
    cache: Arc<dyn CacheAdapter>,
    keys: KeySpace,
    ttl: Duration,
}

impl Store {
    pub fn new(cache: Arc<dyn CacheAdapter>, keys: KeySpace, ttl: Duration) -> Self {
        Self { cache, keys, ttl }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// TTL applied to every block-scoped key, re-armed on each write so a
    /// block's record, touches, counter, and lead index expire together.
    pub(crate) fn ttl(&self) -> Duration {
        self.ttl
    }

    pub(crate) async fn health(&self) -> HealthStatus {
        match self.cache.health_check().await {
            Ok(status) => status,
            Err(err) => HealthStatus::Unhealthy(err.to_string()),
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key = %key, error = %err, "malformed cached payload, treating as absent");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key = %key, error = %err, "cache read failed, treating as absent");
                None
            }
        }
    }

    /// Returns false when the value could not be written.
    pub(crate) async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %key, error = %err, "failed to serialize record, write dropped");
                return false;
            }
        };
        match self.cache.set(key, &raw, Some(self.ttl)).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key = %key, error = %err, "cache write failed, write dropped");
                false
            }
        }
    }

    pub(crate) async fn incr(&self, key: &str, by: i64) -> Option<i64> {
        match self.cache.increment(key, by, Some(self.ttl)).await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = %key, error = %err, "counter increment failed, count dropped");
                None
            }
        }
    }

    pub(crate) async fn read_counter(&self, key: &str) -> Option<i64> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match raw.parse::<i64>() {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key = %key, error = %err, "malformed counter value, treating as absent");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key = %key, error = %err, "counter read failed, treating as absent");
                None
            }
        }
    }

    pub(crate) async fn add_member(
        &self,
        key: &str,
        member: &str,
        ttl: Option<Duration>,
    ) -> bool {
        match self.cache.add_to_set(key, member, ttl).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key = %key, member = %member, error = %err, "set add failed, write dropped");
                false
            }
        }
    }

    pub(crate) async fn remove_member(&self, key: &str, member: &str) {
        if let Err(err) = self.cache.remove_from_set(key, member).await {
            warn!(key = %key, member = %member, error = %err, "set remove failed, write dropped");
        }
    }

    pub(crate) async fn members(&self, key: &str) -> Vec<String> {
        match self.cache.members_of_set(key).await {
            Ok(members) => members,
            Err(err) => {
                warn!(key = %key, error = %err, "set read failed, treating as empty");
                Vec::new()
            }
        }
    }

    pub(crate) async fn scan(&self, prefix: &str) -> Vec<String> {
        match self.cache.keys_by_prefix(prefix).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(prefix = %prefix, error = %err, "prefix scan failed, treating as empty");
                Vec::new()
            }
        }
    }
}
