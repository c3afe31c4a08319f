// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Index-set maintenance.
//!
//! Explicit sets replace keyspace scans as the enumeration mechanism: a
//! per-block lead index, a per-campaign block index, and the global active
//! set. The lead index shares the block TTL; the campaign index has its TTL
//! refreshed whenever a block is created in it; the active set never
//! expires (a block must not silently vanish from scheduling).

use crate::store::Store;

pub(crate) async fn add_lead(store: &Store, block_id: &str, lead_id: &str) -> bool {
    store
        .add_member(&store.keys().lead_index(block_id), lead_id, Some(store.ttl()))
        .await
}

/// Lead ids admitted to a block. Empty when the index is missing or the
/// cache is unreadable.
pub(crate) async fn leads(store: &Store, block_id: &str) -> Vec<String> {
    store.members(&store.keys().lead_index(block_id)).await
}

pub(crate) async fn add_block_to_campaign(
    store: &Store,
    team_id: &str,
    campaign_id: &str,
    block_id: &str,
) -> bool {
    store
        .add_member(
            &store.keys().campaign_index(team_id, campaign_id),
            block_id,
            Some(store.ttl()),
        )
        .await
}

pub(crate) async fn campaign_blocks(
    store: &Store,
    team_id: &str,
    campaign_id: &str,
) -> Vec<String> {
    store
        .members(&store.keys().campaign_index(team_id, campaign_id))
        .await
}

pub(crate) async fn add_active(store: &Store, block_id: &str) -> bool {
    store
        .add_member(&store.keys().active_set(), block_id, None)
        .await
}

pub(crate) async fn remove_active(store: &Store, block_id: &str) {
    store
        .remove_member(&store.keys().active_set(), block_id)
        .await
}

pub(crate) async fn active_blocks(store: &Store) -> Vec<String> {
    store.members(&store.keys().active_set()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::memory_store;

    #[tokio::test]
    async fn lead_index_round_trip() {
        let store = memory_store();
        add_lead(&store, "b1", "lead-2").await;
        add_lead(&store, "b1", "lead-1").await;
        add_lead(&store, "b2", "lead-9").await;
        assert_eq!(leads(&store, "b1").await, vec!["lead-1", "lead-2"]);
    }

    #[tokio::test]
    async fn campaign_index_scoped_by_team_and_campaign() {
        let store = memory_store();
        add_block_to_campaign(&store, "t1", "c1", "b1").await;
        add_block_to_campaign(&store, "t1", "c1", "b2").await;
        add_block_to_campaign(&store, "t1", "c2", "b3").await;
        assert_eq!(campaign_blocks(&store, "t1", "c1").await, vec!["b1", "b2"]);
        assert_eq!(campaign_blocks(&store, "t1", "c2").await, vec!["b3"]);
    }

    #[tokio::test]
    async fn active_set_add_and_remove() {
        let store = memory_store();
        add_active(&store, "b1").await;
        add_active(&store, "b2").await;
        remove_active(&store, "b1").await;
        assert_eq!(active_blocks(&store).await, vec!["b2"]);
    }
}
