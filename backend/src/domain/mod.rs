//! Domain layer: entities, services, and the ports adapters depend on.
//!
//! Purpose: keep the group-ordering state machine, rate limiting, cart
//! aggregation, and stock propagation transport-free. Inbound adapters call
//! the driving ports; outbound adapters implement the driven ports.

pub mod error;
pub mod group_order;
mod group_ordering_service;
pub mod ports;
pub mod rate_limit;
mod stock;
mod stock_service;

pub use self::error::{Error, ErrorCode, TRACE_ID_HEADER};
pub use self::group_order::{
    Admission, CartItem, CartValidationError, CodeValidationError, DeviceId, GroupSession,
    GroupSessionDraft, GroupSessionValidationError, GuestRemoval, Participant, ParticipantDraft,
    ParticipantId, ParticipantValidationError, SessionCode, SessionStatus,
};
pub use self::group_ordering_service::{
    DefaultGroupOrderEnv, GroupOrderConfig, GroupOrderEnv, GroupOrderingService,
};
pub use self::rate_limit::{
    JoinAttempt, JoinRateLimiter, RateLimitConfig, RateLimitDecision,
};
pub use self::stock::{StockDelta, StockLevel};
pub use self::stock_service::StockService;

/// Convenient result alias for domain operations.
///
/// # Examples
/// ```
/// use backend::domain::{ApiResult, Error};
///
/// fn guard(authorised: bool) -> ApiResult<()> {
///     if authorised {
///         Ok(())
///     } else {
///         Err(Error::unauthorized("nope"))
///     }
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
