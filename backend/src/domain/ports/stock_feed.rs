//! Driving ports for stock commits and the live stock feed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{Error, StockDelta, StockLevel};

/// Request from the order-commit flow to subtract stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitStockDecrementRequest {
    pub merchant_id: Uuid,
    pub item_id: Uuid,
    /// Units to subtract; the counter saturates at zero.
    pub delta: u32,
}

/// Response carrying the post-decrement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitStockDecrementResponse {
    pub level: StockLevel,
}

/// Driving port for committing stock decrements.
///
/// Called by checkout flows of any flavour (group-session, direct, point of
/// sale). Applying the decrement and emitting the resulting delta to the
/// merchant's feed happen inside one unit of work.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StockCommand: Send + Sync {
    /// Atomically subtract stock and broadcast the post-decrement quantity.
    async fn commit_decrement(
        &self,
        request: CommitStockDecrementRequest,
    ) -> Result<CommitStockDecrementResponse, Error>;
}

/// A live subscription to one merchant's stock feed.
///
/// `initial` is the full snapshot captured at subscription time; the
/// receiver then yields deltas committed after that snapshot, in commit
/// order. A receiver that lags far enough to drop deltas returns
/// [`broadcast::error::RecvError::Lagged`]; the subscriber must resubscribe
/// and start from a fresh snapshot, because missed deltas are never
/// replayed.
#[derive(Debug)]
pub struct StockSubscription {
    /// Snapshot of every stock-tracked item at subscription time.
    pub initial: Vec<StockLevel>,
    /// Ordered post-snapshot deltas.
    pub receiver: broadcast::Receiver<StockDelta>,
}

/// Driving port for subscribing to a merchant's live stock feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StockFeed: Send + Sync {
    /// Open a subscription whose snapshot is consistent with its stream
    /// position.
    async fn subscribe(&self, merchant_id: Uuid) -> Result<StockSubscription, Error>;
}
