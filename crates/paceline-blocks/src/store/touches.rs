// SPDX-FileCopyrightText: 2026 Paceline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Touch record reads and writes.

use crate::store::Store;
use crate::types::LeadTouch;

pub(crate) async fn load_touch(
    store: &Store,
    block_id: &str,
    lead_id: &str,
    touch_number: u32,
) -> Option<LeadTouch> {
    store
        .get_json(&store.keys().touch(block_id, lead_id, touch_number))
        .await
}

/// Persist a touch record, re-arming its TTL. Returns false when the write
/// was dropped.
pub(crate) async fn save_touch(store: &Store, touch: &LeadTouch) -> bool {
    let key = store
        .keys()
        .touch(&touch.block_id, &touch.lead_id, touch.touch_number);
    store.put_json(&key, touch).await
}

/// Load every existing touch record for one lead, in touch-number order.
/// Absent numbers are simply skipped; the result may have gaps.
pub(crate) async fn touches_for_lead(
    store: &Store,
    block_id: &str,
    lead_id: &str,
    max_touches: u32,
) -> Vec<LeadTouch> {
    let mut touches = Vec::new();
    for touch_number in 1..=max_touches {
        if let Some(touch) = load_touch(store, block_id, lead_id, touch_number).await {
            touches.push(touch);
        }
    }
    touches
}
