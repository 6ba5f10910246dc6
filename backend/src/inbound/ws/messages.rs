//! Wire-level message definitions for the stock feed WebSocket.
//!
//! Feed events are transformed into these payloads before being serialized
//! to JSON and sent to connected clients. The feed is one-way: clients
//! send only control frames.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{StockDelta, StockLevel};

/// One item's quantity as sent on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItemBody {
    pub item_id: Uuid,
    pub quantity: u32,
}

impl From<&StockLevel> for StockItemBody {
    fn from(value: &StockLevel) -> Self {
        Self {
            item_id: value.item_id,
            quantity: value.quantity,
        }
    }
}

/// Outbound feed event.
///
/// `initial` replays the full snapshot on (re)connect; `stock-update`
/// carries post-commit quantities in commit order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StockFeedMessage {
    #[serde(rename_all = "camelCase")]
    Initial { items: Vec<StockItemBody> },
    #[serde(rename_all = "camelCase")]
    StockUpdate { items: Vec<StockItemBody> },
}

impl StockFeedMessage {
    /// Snapshot event sent immediately after the upgrade.
    pub fn initial(levels: &[StockLevel]) -> Self {
        Self::Initial {
            items: levels.iter().map(Into::into).collect(),
        }
    }

    /// Delta event for one committed decrement batch.
    pub fn update(delta: &StockDelta) -> Self {
        Self::StockUpdate {
            items: delta.items.iter().map(Into::into).collect(),
        }
    }
}
