//! Live inventory primitives shared by the stock store and the broadcast
//! feed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Available quantity for one stock-tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    /// Menu item the quantity belongs to.
    pub item_id: Uuid,
    /// Units currently available.
    pub quantity: u32,
}

/// A batch of post-commit quantity changes pushed to subscribers.
///
/// Each entry carries the quantity *after* the decrement, so applying
/// deltas in receipt order on top of a snapshot reproduces the live value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDelta {
    /// Merchant whose inventory changed.
    pub merchant_id: Uuid,
    /// Updated levels in commit order.
    pub items: Vec<StockLevel>,
}

impl StockDelta {
    /// Delta for a single item.
    pub fn single(merchant_id: Uuid, item_id: Uuid, quantity: u32) -> Self {
        Self {
            merchant_id,
            items: vec![StockLevel { item_id, quantity }],
        }
    }
}
