//! In-memory driven adapters, one per port.
//!
//! These back the default wiring and the test fixtures. Swapping in a
//! database-backed adapter only requires implementing the same ports.

mod group_session_store;
mod join_attempt_ledger;
mod stock_store;

pub use self::group_session_store::MemoryGroupSessionStore;
pub use self::join_attempt_ledger::MemoryJoinAttemptLedger;
pub use self::stock_store::MemoryStockStore;
