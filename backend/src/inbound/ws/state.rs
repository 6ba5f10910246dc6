//! Shared WebSocket adapter state.
//!
//! WebSocket entry points depend on the feed driving port instead of the
//! concrete stock service, keeping the adapter testable with deterministic
//! doubles.

use std::sync::Arc;

use crate::domain::ports::StockFeed;
use crate::inbound::ws::OriginPolicy;

/// Dependency bundle for the stock feed endpoint.
#[derive(Clone)]
pub struct WsState {
    pub feed: Arc<dyn StockFeed>,
    pub origins: OriginPolicy,
}

impl WsState {
    /// Construct state from an explicit port implementation and origin
    /// policy.
    pub fn new(feed: Arc<dyn StockFeed>, origins: OriginPolicy) -> Self {
        Self { feed, origins }
    }
}
