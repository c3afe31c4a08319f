// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Block record reads and writes.

use tracing::debug;

use crate::store::Store;
use crate::types::CampaignBlock;

/// Load a block record. Absent, unreadable, and malformed all come back
/// as `None`.
pub(crate) async fn load_block(store: &Store, block_id: &str) -> Option<CampaignBlock> {
    store.get_json(&store.keys().block(block_id)).await
}

/// Persist a block record, re-arming its TTL. Returns false when the write
/// was dropped.
pub(crate) async fn save_block(store: &Store, block: &CampaignBlock) -> bool {
    let written = store.put_json(&store.keys().block(&block.id), block).await;
    if written {
        debug!(
            block_id = %block.id,
            status = %block.status(),
            total_touches = block.total_touches,
            "block record saved"
        );
    }
    written
}
