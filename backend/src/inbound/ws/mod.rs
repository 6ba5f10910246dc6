//! WebSocket inbound adapter for the live stock feed.
//!
//! Responsibilities:
//! - validate upgrade requests (origin allow-list)
//! - open the feed subscription and hand it to the per-connection handler
//! - keep WebSocket-specific concerns at the edge of the system

use actix_web::web::{self, Payload};
use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header::{HeaderValue, ORIGIN},
};
use tracing::{error, warn};
use url::Url;

use crate::inbound::http::validation::{FieldName, parse_uuid};

mod session;

pub mod messages;
pub mod state;

const LOCALHOST: &str = "localhost";

/// Environment variable naming the HTTPS host allowed to open feed
/// connections (subdomains included).
pub const WS_ALLOWED_HOST_ENV: &str = "WS_ALLOWED_ORIGIN_HOST";

/// Origin allow-list applied before the upgrade.
///
/// HTTPS requests from the configured host and its subdomains are
/// accepted, as are HTTP requests from localhost with an explicit
/// non-zero port. With no host configured, only localhost passes.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    primary_host: Option<String>,
}

impl OriginPolicy {
    /// Allow HTTPS origins on `host` and its subdomains.
    pub fn with_primary_host(host: impl Into<String>) -> Self {
        Self {
            primary_host: Some(host.into()),
        }
    }

    /// Load the policy from the process environment.
    pub fn from_env() -> Self {
        Self {
            primary_host: std::env::var(WS_ALLOWED_HOST_ENV).ok(),
        }
    }

    fn is_allowed(&self, origin: &Url) -> bool {
        let Some(host) = origin.host_str() else {
            return false;
        };

        match origin.scheme() {
            "http" if host == LOCALHOST => matches!(origin.port(), Some(port) if port != 0),
            "https" => self.primary_host.as_deref().is_some_and(|primary| {
                host == primary
                    || host
                        .strip_suffix(primary)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }),
            _ => false,
        }
    }
}

/// Handle WebSocket upgrade for the `/ws/stock/{merchant_id}` endpoint.
#[get("/ws/stock/{merchant_id}")]
pub async fn stock_feed_entry(
    state: web::Data<state::WsState>,
    merchant_id: web::Path<String>,
    req: HttpRequest,
    stream: Payload,
) -> actix_web::Result<HttpResponse> {
    let mut origin_iter = req.headers().get_all(ORIGIN);
    let origin_header = origin_iter.next().ok_or_else(|| {
        error!("missing Origin header on stock feed upgrade");
        actix_web::error::ErrorForbidden("Origin not allowed")
    })?;
    if origin_iter.next().is_some() {
        error!("multiple Origin headers on stock feed upgrade");
        return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
    }
    validate_origin(&state.origins, origin_header)?;

    let merchant_id = parse_uuid(&merchant_id, FieldName::new("merchantId"))?;
    let subscription = state.feed.subscribe(merchant_id).await?;

    let (response, session, message_stream) = actix_ws::handle(&req, stream)?;
    actix_web::rt::spawn(session::handle_stock_session(
        subscription,
        session,
        message_stream,
    ));
    Ok(response)
}

fn validate_origin(policy: &OriginPolicy, origin_header: &HeaderValue) -> actix_web::Result<()> {
    let origin_value = origin_header.to_str().map_err(|error| {
        error!(error = %error, "failed to parse Origin header as string");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    let origin = Url::parse(origin_value).map_err(|error| {
        error!(error = %error, "failed to parse Origin header as URL");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    if policy.is_allowed(&origin) {
        Ok(())
    } else {
        warn!(
            origin = origin_value,
            "rejected stock feed upgrade due to disallowed Origin"
        );
        Err(actix_web::error::ErrorForbidden("Origin not allowed"))
    }
}

pub use self::state::WsState;
