//! Group-ordering backend library.
//!
//! Collaborative group-ordering sessions (shared join codes, per-device
//! carts, host moderation) plus a per-merchant live stock feed. Laid out
//! hexagonally: `domain` holds entities, services, and ports; `inbound`
//! the HTTP and WebSocket adapters; `outbound` the driven adapters.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
