//! In-memory stock counter adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::ports::{StockStore, StockStoreError};
use crate::domain::StockLevel;

/// Per-merchant stock counters backed by process memory.
///
/// The whole table sits behind one async mutex, so `decrement` subtracts
/// and reads the resulting quantity as a single critical section.
#[derive(Default)]
pub struct MemoryStockStore {
    levels: Mutex<HashMap<Uuid, HashMap<Uuid, u32>>>,
}

impl MemoryStockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StockStore for MemoryStockStore {
    async fn snapshot(&self, merchant_id: Uuid) -> Result<Vec<StockLevel>, StockStoreError> {
        let levels = self.levels.lock().await;
        let mut items: Vec<StockLevel> = levels
            .get(&merchant_id)
            .map(|merchant| {
                merchant
                    .iter()
                    .map(|(item_id, quantity)| StockLevel {
                        item_id: *item_id,
                        quantity: *quantity,
                    })
                    .collect()
            })
            .unwrap_or_default();
        // Deterministic snapshots make client-side diffing and tests stable.
        items.sort_unstable_by_key(|level| level.item_id);
        Ok(items)
    }

    async fn decrement(
        &self,
        merchant_id: Uuid,
        item_id: Uuid,
        delta: u32,
    ) -> Result<StockLevel, StockStoreError> {
        let mut levels = self.levels.lock().await;
        let quantity = levels
            .get_mut(&merchant_id)
            .and_then(|merchant| merchant.get_mut(&item_id))
            .ok_or(StockStoreError::ItemNotFound {
                merchant_id,
                item_id,
            })?;
        *quantity = quantity.saturating_sub(delta);
        Ok(StockLevel {
            item_id,
            quantity: *quantity,
        })
    }

    async fn upsert_level(
        &self,
        merchant_id: Uuid,
        level: StockLevel,
    ) -> Result<(), StockStoreError> {
        let mut levels = self.levels.lock().await;
        levels
            .entry(merchant_id)
            .or_default()
            .insert(level.item_id, level.quantity);
        Ok(())
    }
}
