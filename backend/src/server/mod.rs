//! Server construction and middleware wiring.

mod config;
mod state_builders;
mod sweeper;

pub use config::ServerConfig;

use state_builders::build_states;
use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetricsBuilder;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use backend::Trace;
#[cfg(debug_assertions)]
use backend::doc::ApiDoc;
use backend::inbound::http::group_sessions::{
    create_group_session, get_group_session, join_group_session,
    kick_group_session_participant, leave_group_session, update_group_session_cart,
};
use backend::inbound::http::health::{HealthState, live, ready};
use backend::inbound::http::state::HttpState;
use backend::inbound::http::stock::commit_stock_decrement;
use backend::inbound::ws;
use backend::inbound::ws::WsState;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    ws_state: web::Data<WsState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        ws_state,
    } = deps;

    let api = web::scope("/api/v1")
        .service(create_group_session)
        .service(join_group_session)
        .service(get_group_session)
        .service(kick_group_session_participant)
        .service(leave_group_session)
        .service(update_group_session_cart)
        .service(commit_stock_decrement);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(ws_state)
        .wrap(Trace)
        .service(api)
        .service(ws::stock_feed_entry)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Seed demo stock so the feed is observable without a catalogue import.
#[cfg(feature = "example-data")]
fn seed_example_stock(store: Arc<backend::outbound::memory::MemoryStockStore>) {
    use backend::domain::StockLevel;
    use backend::domain::ports::StockStore;
    use tracing::info;
    use uuid::Uuid;

    actix_web::rt::spawn(async move {
        let merchant_id = Uuid::nil();
        for (item, quantity) in [(Uuid::from_u128(1), 24_u32), (Uuid::from_u128(2), 8)] {
            if let Err(error) = store
                .upsert_level(
                    merchant_id,
                    StockLevel {
                        item_id: item,
                        quantity,
                    },
                )
                .await
            {
                tracing::warn!(error = %error, "example stock seeding failed");
                return;
            }
        }
        info!(merchant_id = %merchant_id, "example stock seeded");
    });
}

/// Construct an Actix HTTP server using the provided health state and
/// configuration, and start the background expiry sweeper.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let states = build_states(&config);

    #[cfg(feature = "example-data")]
    seed_example_stock(Arc::clone(&states.stock_store));

    let _sweeper = sweeper::spawn_expiry_sweeper(
        Arc::clone(&states.ordering),
        Arc::new(mockable::DefaultClock),
        config.sweep_interval,
    );

    let http_state = web::Data::new(states.http_state);
    let ws_state = web::Data::new(states.ws_state);
    let server_health_state = health_state.clone();

    #[cfg(feature = "metrics")]
    let prometheus = PrometheusMetricsBuilder::new("group_ordering")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::other(format!("metrics setup failed: {e}")))?;

    let server = HttpServer::new(move || {
        let app = build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            ws_state: ws_state.clone(),
        });

        #[cfg(feature = "metrics")]
        let app = app.wrap(prometheus.clone());

        app
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
