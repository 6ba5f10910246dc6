//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{GroupOrderingCommand, GroupOrderingQuery, StockCommand};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub group_ordering: Arc<dyn GroupOrderingCommand>,
    pub group_ordering_query: Arc<dyn GroupOrderingQuery>,
    pub stock: Arc<dyn StockCommand>,
}

impl HttpState {
    /// Construct state from explicit port implementations.
    pub fn new(
        group_ordering: Arc<dyn GroupOrderingCommand>,
        group_ordering_query: Arc<dyn GroupOrderingQuery>,
        stock: Arc<dyn StockCommand>,
    ) -> Self {
        Self {
            group_ordering,
            group_ordering_query,
            stock,
        }
    }
}
