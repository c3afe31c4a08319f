// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process cache adapter backed by a concurrent hash map.
//!
//! `MemoryCache` implements [`CacheAdapter`] with Redis-flavored semantics:
//! string values, signed 64-bit counters, unordered string sets, and
//! per-key expiry. Expired entries are dropped lazily on access; there is
//! no background sweeper task.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use paceline_core::{CacheAdapter, HealthStatus, PacelineError};

/// What a key currently holds. A key holds exactly one kind of value;
/// writing a different kind replaces the previous one.
#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Int(i64),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A thread-safe in-memory cache.
///
/// Suitable as the default adapter for single-process deployments and as
/// the backing store in tests. All operations are infallible; the error
/// type exists only to satisfy the adapter contract.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    /// True when no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expiry_from(ttl: Option<Duration>) -> Option<Instant> {
        ttl.map(|ttl| Instant::now() + ttl)
    }

    /// Read an entry, dropping it first if its TTL has lapsed.
    fn live_entry(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.clone());
            }
        } else {
            return None;
        }
        // Expired: remove outside the read guard to avoid deadlocking the shard.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }
}

#[async_trait]
impl CacheAdapter for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> Result<HealthStatus, PacelineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PacelineError> {
        match self.live_entry(key) {
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s)),
            Some(Entry {
                value: Value::Int(n),
                ..
            }) => Ok(Some(n.to_string())),
            _ => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), PacelineError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Self::expiry_from(ttl),
            },
        );
        Ok(())
    }

    async fn increment(
        &self,
        key: &str,
        by: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, PacelineError> {
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Int(0),
            expires_at: Self::expiry_from(ttl),
        });
        if entry.is_expired(now) {
            entry.value = Value::Int(0);
            entry.expires_at = Self::expiry_from(ttl);
        }
        let current = match entry.value {
            Value::Int(n) => n,
            // Non-numeric values reset to zero rather than erroring;
            // counters and records never share a key in practice.
            _ => 0,
        };
        let next = current.saturating_add(by);
        entry.value = Value::Int(next);
        if let Some(at) = Self::expiry_from(ttl) {
            entry.expires_at = Some(at);
        }
        Ok(next)
    }

    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, PacelineError> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now) && entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn add_to_set(
        &self,
        key: &str,
        member: &str,
        ttl: Option<Duration>,
    ) -> Result<(), PacelineError> {
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Set(HashSet::new()),
            expires_at: Self::expiry_from(ttl),
        });
        if entry.is_expired(now) {
            entry.value = Value::Set(HashSet::new());
            entry.expires_at = Self::expiry_from(ttl);
        }
        match &mut entry.value {
            Value::Set(members) => {
                members.insert(member.to_string());
            }
            other => {
                *other = Value::Set(HashSet::from([member.to_string()]));
            }
        }
        if let Some(at) = Self::expiry_from(ttl) {
            entry.expires_at = Some(at);
        }
        Ok(())
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> Result<(), PacelineError> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if let Value::Set(members) = &mut entry.value {
                members.remove(member);
            }
        }
        Ok(())
    }

    async fn members_of_set(&self, key: &str) -> Result<Vec<String>, PacelineError> {
        match self.live_entry(key) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => {
                let mut out: Vec<String> = members.into_iter().collect();
                out.sort();
                Ok(out)
            }
            _ => Ok(Vec::new()),
        }
    }
}
