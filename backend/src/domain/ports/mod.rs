//! Domain ports: driving use-case traits consumed by inbound adapters and
//! driven persistence traits implemented by outbound adapters.

mod group_ordering;
mod group_session_store;
mod join_attempt_ledger;
mod stock_feed;
mod stock_store;

pub use self::group_ordering::{
    CartItemPayload, CreateSessionRequest, CreateSessionResponse, GetSessionRequest,
    GetSessionResponse, GroupOrderingCommand, GroupOrderingQuery, GroupSessionPayload,
    JoinSessionRequest, JoinSessionResponse, KickParticipantRequest, KickParticipantResponse,
    LeaveSessionRequest, LeaveSessionResponse, ParticipantPayload, SweepExpiredResponse,
    UpdateCartRequest, UpdateCartResponse,
};
pub use self::group_session_store::{
    AdmitParticipantOutcome, GroupSessionStore, GroupSessionStoreError, RemoveGuestOutcome,
    ReplaceCartOutcome,
};
pub use self::join_attempt_ledger::{JoinAttemptLedger, JoinAttemptLedgerError};
pub use self::stock_feed::{
    CommitStockDecrementRequest, CommitStockDecrementResponse, StockCommand, StockFeed,
    StockSubscription,
};
pub use self::stock_store::{StockStore, StockStoreError};

#[cfg(test)]
pub use self::group_ordering::{MockGroupOrderingCommand, MockGroupOrderingQuery};
#[cfg(test)]
pub use self::group_session_store::MockGroupSessionStore;
#[cfg(test)]
pub use self::join_attempt_ledger::MockJoinAttemptLedger;
#[cfg(test)]
pub use self::stock_feed::{MockStockCommand, MockStockFeed};
#[cfg(test)]
pub use self::stock_store::MockStockStore;
