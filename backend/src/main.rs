//! Backend entry-point: wires REST endpoints, the stock feed WebSocket,
//! the expiry sweeper, and OpenAPI docs.

mod server;

use actix_web::web;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use backend::inbound::http::health::HealthState;
use server::ServerConfig;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = ServerConfig::from_env();
    let health_state = web::Data::new(HealthState::new());

    let server = server::create_server(health_state, config)?;
    server.await
}
