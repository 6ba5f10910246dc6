//! Assembly of adapter state from domain services and in-memory stores.

use std::sync::Arc;

use mockable::DefaultClock;

use backend::domain::ports::{GroupOrderingCommand, GroupOrderingQuery, StockCommand, StockFeed};
use backend::domain::{GroupOrderingService, JoinRateLimiter, StockService};
use backend::inbound::http::state::HttpState;
use backend::inbound::ws::WsState;
use backend::outbound::memory::{
    MemoryGroupSessionStore, MemoryJoinAttemptLedger, MemoryStockStore,
};

use crate::server::config::ServerConfig;

/// Everything the server factory needs, pre-wired.
pub(crate) struct AppStates {
    pub(crate) http_state: HttpState,
    pub(crate) ws_state: WsState,
    /// Handle kept for the background sweeper.
    pub(crate) ordering: Arc<dyn GroupOrderingCommand>,
    /// Handle kept for example-data seeding.
    #[cfg(feature = "example-data")]
    pub(crate) stock_store: Arc<MemoryStockStore>,
}

/// Wire the in-memory adapters into the domain services and bundle the
/// resulting port implementations for the HTTP and WebSocket adapters.
pub(crate) fn build_states(config: &ServerConfig) -> AppStates {
    let session_store = Arc::new(MemoryGroupSessionStore::new());
    let attempt_ledger = Arc::new(MemoryJoinAttemptLedger::new());
    let stock_store = Arc::new(MemoryStockStore::new());

    let ordering_service = Arc::new(GroupOrderingService::new(
        session_store,
        JoinRateLimiter::new(attempt_ledger, config.rate_limit.clone()),
        Arc::new(DefaultClock),
        config.group_order.clone(),
    ));
    let stock_service = Arc::new(StockService::new(Arc::clone(&stock_store)));

    let ordering: Arc<dyn GroupOrderingCommand> = ordering_service.clone();
    let ordering_query: Arc<dyn GroupOrderingQuery> = ordering_service;
    let stock_command: Arc<dyn StockCommand> = stock_service.clone();
    let stock_feed: Arc<dyn StockFeed> = stock_service;

    AppStates {
        http_state: HttpState::new(Arc::clone(&ordering), ordering_query, stock_command),
        ws_state: WsState::new(stock_feed, config.origins.clone()),
        ordering,
        #[cfg(feature = "example-data")]
        stock_store,
    }
}
