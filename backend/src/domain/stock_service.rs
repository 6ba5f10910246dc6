//! Live stock service: atomic decrements fanned out to per-merchant
//! broadcast channels.
//!
//! Each merchant gets one logical channel. A per-merchant commit lock
//! serialises decrement-then-publish, so subscribers observe deltas in
//! commit order and every published quantity is the post-decrement value.
//! Subscribing takes the same lock while pairing the snapshot with a fresh
//! receiver, which makes the snapshot exactly consistent with the stream
//! position.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    CommitStockDecrementRequest, CommitStockDecrementResponse, StockCommand, StockFeed, StockStore,
    StockStoreError, StockSubscription,
};
use crate::domain::{Error, StockDelta};

/// Deltas buffered per subscriber before it is considered lagged.
///
/// A receiver that overruns this buffer gets `RecvError::Lagged` and must
/// resubscribe; the fresh snapshot repairs its view.
const CHANNEL_CAPACITY: usize = 256;

fn map_store_error(error: StockStoreError) -> Error {
    match error {
        StockStoreError::Connection { message } => {
            Error::service_unavailable(format!("stock store unavailable: {message}"))
        }
        StockStoreError::Query { message } => {
            Error::internal(format!("stock store error: {message}"))
        }
        StockStoreError::ItemNotFound {
            merchant_id,
            item_id,
        } => Error::not_found(format!(
            "merchant {merchant_id} does not track item {item_id}"
        )),
    }
}

#[derive(Clone)]
struct MerchantChannel {
    sender: broadcast::Sender<StockDelta>,
    /// Commit lock: the merchant's counters are the unit of mutual
    /// exclusion for order commits.
    commit_lock: Arc<Mutex<()>>,
}

impl MerchantChannel {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            commit_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Stock service implementing the commit and feed driving ports.
pub struct StockService<S> {
    store: Arc<S>,
    channels: Mutex<HashMap<Uuid, MerchantChannel>>,
}

impl<S> StockService<S> {
    /// Create a service over the given stock store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            channels: Mutex::new(HashMap::new()),
        }
    }

    async fn channel(&self, merchant_id: Uuid) -> MerchantChannel {
        let mut channels = self.channels.lock().await;
        channels
            .entry(merchant_id)
            .or_insert_with(MerchantChannel::new)
            .clone()
    }
}

#[async_trait]
impl<S> StockCommand for StockService<S>
where
    S: StockStore,
{
    async fn commit_decrement(
        &self,
        request: CommitStockDecrementRequest,
    ) -> Result<CommitStockDecrementResponse, Error> {
        let channel = self.channel(request.merchant_id).await;
        let _commit = channel.commit_lock.lock().await;

        let level = self
            .store
            .decrement(request.merchant_id, request.item_id, request.delta)
            .await
            .map_err(map_store_error)?;

        // Published while the commit lock is held: receivers see deltas in
        // commit order, each carrying the post-decrement quantity. A send
        // error only means nobody is subscribed, which is fine for pure
        // fan-out.
        let delta = StockDelta::single(request.merchant_id, level.item_id, level.quantity);
        if channel.sender.send(delta).is_err() {
            debug!(merchant_id = %request.merchant_id, "stock delta dropped; no subscribers");
        }

        Ok(CommitStockDecrementResponse { level })
    }
}

#[async_trait]
impl<S> StockFeed for StockService<S>
where
    S: StockStore,
{
    async fn subscribe(&self, merchant_id: Uuid) -> Result<StockSubscription, Error> {
        let channel = self.channel(merchant_id).await;
        let _commit = channel.commit_lock.lock().await;

        let receiver = channel.sender.subscribe();
        let initial = self
            .store
            .snapshot(merchant_id)
            .await
            .map_err(map_store_error)?;

        Ok(StockSubscription { initial, receiver })
    }
}

#[cfg(test)]
#[path = "stock_service_tests.rs"]
mod tests;
