// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic send counters.
//!
//! The total counter key is the authoritative source for a block's
//! `total_touches`. The block record carries a projection of it that lags
//! under concurrent sends; completion decisions read the increment result,
//! never the projection.

use crate::store::Store;

/// Atomically bump the block's total send counter by one. `None` when the
/// cache dropped the increment.
pub(crate) async fn bump_total_touches(store: &Store, block_id: &str) -> Option<i64> {
    store.incr(&store.keys().total_counter(block_id), 1).await
}

/// Read the authoritative total without modifying it. `None` when the key
/// is absent or unreadable.
pub(crate) async fn total_touches(store: &Store, block_id: &str) -> Option<i64> {
    store
        .read_counter(&store.keys().total_counter(block_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{dead_store, memory_store};

    #[tokio::test]
    async fn bump_is_cumulative() {
        let store = memory_store();
        assert_eq!(bump_total_touches(&store, "b1").await, Some(1));
        assert_eq!(bump_total_touches(&store, "b1").await, Some(2));
        assert_eq!(bump_total_touches(&store, "b2").await, Some(1));
        assert_eq!(total_touches(&store, "b1").await, Some(2));
    }

    #[tokio::test]
    async fn missing_counter_reads_none() {
        let store = memory_store();
        assert_eq!(total_touches(&store, "b1").await, None);
    }

    #[tokio::test]
    async fn degraded_counter_drops_count() {
        let store = dead_store();
        assert_eq!(bump_total_touches(&store, "b1").await, None);
        assert_eq!(total_touches(&store, "b1").await, None);
    }
}
