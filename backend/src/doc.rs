//! OpenAPI documentation configuration.
//!
//! Defines the [`ApiDoc`] struct generating the OpenAPI specification for
//! the REST surface: group-session operations, the stock decrement hook,
//! and health probes. The WebSocket feed is documented on its handler and
//! does not appear here; OpenAPI has no channel concept for it.

use utoipa::OpenApi;

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Group ordering backend API",
        description = "HTTP interface for collaborative group-order sessions and stock commits."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::group_sessions::create_group_session,
        crate::inbound::http::group_sessions::join_group_session,
        crate::inbound::http::group_sessions::get_group_session,
        crate::inbound::http::group_sessions::kick_group_session_participant,
        crate::inbound::http::group_sessions::leave_group_session,
        crate::inbound::http::group_sessions::update_group_session_cart,
        crate::inbound::http::stock::commit_stock_decrement,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        crate::domain::Error,
        crate::domain::ErrorCode,
    )),
    tags(
        (name = "group-sessions", description = "Collaborative group-order sessions"),
        (name = "stock", description = "Inventory commits feeding the live stock stream"),
        (name = "health", description = "Orchestration probes")
    )
)]
pub struct ApiDoc;
