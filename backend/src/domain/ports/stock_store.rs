//! Driven port for per-merchant inventory counters.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::StockLevel;

/// Errors raised by stock store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StockStoreError {
    /// Store connection could not be established.
    #[error("stock store connection failed: {message}")]
    Connection { message: String },
    /// Operation failed during execution.
    #[error("stock store operation failed: {message}")]
    Query { message: String },
    /// The merchant does not track the referenced item.
    #[error("merchant {merchant_id} does not track item {item_id}")]
    ItemNotFound { merchant_id: Uuid, item_id: Uuid },
}

impl StockStoreError {
    /// Construct a [`StockStoreError::Connection`].
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Construct a [`StockStoreError::Query`].
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Port for reading and atomically decrementing stock counters.
///
/// The merchant's counters are the unit of mutual exclusion for order
/// commits: `decrement` must apply the change and return the resulting
/// quantity as one atomic step.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Current levels for every stock-tracked item of the merchant.
    async fn snapshot(&self, merchant_id: Uuid) -> Result<Vec<StockLevel>, StockStoreError>;

    /// Atomically subtract `delta` units (saturating at zero) and return
    /// the post-decrement level.
    async fn decrement(
        &self,
        merchant_id: Uuid,
        item_id: Uuid,
        delta: u32,
    ) -> Result<StockLevel, StockStoreError>;

    /// Create or overwrite one item's level. Used by catalogue imports and
    /// test fixtures; not part of the order-commit path.
    async fn upsert_level(
        &self,
        merchant_id: Uuid,
        level: StockLevel,
    ) -> Result<(), StockStoreError>;
}
