use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use washroute_engine::{events::EventProducers, OrderFlowApi, SettlementApi, SqliteDatabase, WebhookApi};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::{SharedSecretMiddlewareFactory, SWEEP_SECRET_HEADER},
    notifications::create_notification_handlers,
    routes::{health, GatewayWebhookRoute, SettlementSweepRoute},
    settlement_worker::start_settlement_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    // Dropping the handle does not stop the worker. It runs for as long as the runtime does.
    let _worker = config.sweep_interval.map(|interval| {
        start_settlement_worker(db.clone(), producers.clone(), ServerOptions::from_config(&config), interval)
    });
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    if config.webhook_secret.is_empty() && config.webhook_signature_checks {
        warn!("🚀️ No webhook secret is configured. Every gateway webhook will be rejected.");
    }
    let bind_addr = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let webhook_api = WebhookApi::new(db.clone(), producers.clone(), config.webhook_secret.clone());
        let webhook_api =
            if config.webhook_signature_checks { webhook_api } else { webhook_api.without_signature_checks() };
        let settlement_api = SettlementApi::new(db.clone(), producers.clone());
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let options = ServerOptions::from_config(&config);
        let gateway_scope = web::scope("/gateway").service(GatewayWebhookRoute::<SqliteDatabase>::new());
        let jobs_scope = web::scope("/jobs")
            .wrap(SharedSecretMiddlewareFactory::new(SWEEP_SECRET_HEADER, config.sweep_secret.clone()))
            .service(SettlementSweepRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("wrs::access_log"))
            .app_data(web::Data::new(webhook_api))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(options))
            .service(health)
            .service(gateway_scope)
            .service(jobs_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((bind_addr.0.as_str(), bind_addr.1))?
    .run();
    Ok(srv)
}
