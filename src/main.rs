//!
//! OCPP 1.6J central system for managing EV charging stations over
//! WebSocket and MQTT. Reads configuration from a TOML file
//! (~/.config/voltra-csms/config.toml).

use std::sync::Arc;
use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use voltra_csms::application::services::{
    ChargePointService, ChargingService, HeartbeatMonitor,
};
use voltra_csms::application::{CommandSender, ControlApi, MessageRouter, SessionRegistry};
use voltra_csms::config::AppConfig;
use voltra_csms::domain::repositories::SharedRepositoryProvider;
use voltra_csms::infrastructure::database::migrator::Migrator;
use voltra_csms::infrastructure::database::DatabaseConfig;
use voltra_csms::infrastructure::{init_database, LivenessCache, SeaOrmRepositoryProvider};
use voltra_csms::interfaces::mqtt::MqttTransport;
use voltra_csms::interfaces::ws::OcppWsServer;
use voltra_csms::support::shutdown::ShutdownCoordinator;
use voltra_csms::{create_api_router, create_event_bus, default_config_path};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("CSMS_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let config = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let cfg = AppConfig::default();
            init_tracing(&cfg);
            error!("Failed to load config: {}. Using defaults.", e);
            cfg
        }
    };

    info!("Starting Voltra CSMS...");

    // ── Prometheus metrics recorder ────────────────────────────
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: std::env::var("CSMS_DB_URL")
            .unwrap_or_else(|_| config.database.connection_url()),
        pool: config.database.pool.clone(),
    };
    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    let repos: SharedRepositoryProvider = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    // ── Shared state ───────────────────────────────────────────
    let cache = Arc::new(LivenessCache::new(config.ocpp.authorize_cache_ttl_seconds));
    match cache.rebuild(&repos).await {
        Ok(count) => info!(charge_points = count, "Liveness cache rebuilt from audit trail"),
        Err(e) => warn!("Liveness cache rebuild failed: {}", e),
    }

    let event_bus = create_event_bus();
    let registry = SessionRegistry::shared(config.ocpp.inbound_buffer_depth);
    let command_sender = Arc::new(CommandSender::new(
        registry.clone(),
        cache.clone(),
        event_bus.clone(),
        Duration::from_secs(config.ocpp.call_timeout_seconds as u64),
        config.ocpp.outbound_queue_depth,
    ));

    let charge_point_service = Arc::new(ChargePointService::new(
        repos.clone(),
        config.provisioning.reject_unknown_charge_points,
    ));
    let charging_service = Arc::new(ChargingService::new(repos.clone()));

    // ── Message router ─────────────────────────────────────────
    let (router, intake_rx) = MessageRouter::new(
        registry.clone(),
        command_sender.clone(),
        repos.clone(),
        charge_point_service.clone(),
        charging_service.clone(),
        cache.clone(),
        event_bus.clone(),
        config.clone(),
    );

    // ── Shutdown coordination ──────────────────────────────────
    let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
    let shutdown_signal = shutdown.signal();
    shutdown.start_signal_listener();

    let router_task = {
        let router = router.clone();
        let shutdown = shutdown_signal.clone();
        tokio::spawn(async move { router.run(intake_rx, shutdown).await })
    };

    // ── Heartbeat watchdog + sweeps ────────────────────────────
    let monitor = Arc::new(HeartbeatMonitor::new(
        registry.clone(),
        charging_service.clone(),
        cache.clone(),
        router.intake(),
        config.watchdog_seconds(),
        &config.ocpp,
    ));
    monitor.start(shutdown_signal.clone());

    // ── Transports ─────────────────────────────────────────────
    let ws_server = OcppWsServer::new(
        &config,
        router.intake(),
        repos.clone(),
        shutdown_signal.clone(),
    );
    let ws_task = tokio::spawn(async move { ws_server.run().await });

    if config.mqtt.enabled {
        MqttTransport::new(
            config.mqtt.clone(),
            router.intake(),
            event_bus.clone(),
            shutdown_signal.clone(),
        )
        .start();
        info!(
            broker = format!("{}:{}", config.mqtt.broker_host, config.mqtt.broker_port),
            "MQTT transport enabled"
        );
    } else {
        info!("MQTT transport disabled by configuration");
    }

    // ── REST control plane ─────────────────────────────────────
    let control = Arc::new(ControlApi::new(
        repos.clone(),
        registry.clone(),
        command_sender.clone(),
        charging_service.clone(),
    ));
    let api_router = create_api_router(control, prometheus_handle, &config);

    let api_addr = format!("{}:{}", config.server.api_host, config.server.api_port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("REST API server listening on http://{}", api_addr);
    info!("Swagger UI available at http://{}/docs/", api_addr);

    let api_shutdown = shutdown_signal.clone();
    let api_task = tokio::spawn(async move {
        axum::serve(listener, api_router)
            .with_graceful_shutdown(async move {
                api_shutdown.wait().await;
                info!("REST API server received shutdown signal");
            })
            .await
    });

    info!("All servers started. Press Ctrl+C to shut down gracefully.");

    tokio::select! {
        result = ws_task => {
            match result {
                Ok(Ok(())) => info!("WebSocket server stopped"),
                Ok(Err(e)) => error!("WebSocket server error: {}", e),
                Err(e) => error!("WebSocket server task panicked: {}", e),
            }
        }
        result = api_task => {
            match result {
                Ok(Ok(())) => info!("REST API server stopped"),
                Ok(Err(e)) => error!("REST API server error: {}", e),
                Err(e) => error!("REST API server task panicked: {}", e),
            }
        }
        result = router_task => {
            match result {
                Ok(()) => info!("Message router stopped"),
                Err(e) => error!("Message router task panicked: {}", e),
            }
        }
    }

    // ── Cleanup ────────────────────────────────────────────────
    shutdown_signal.trigger();
    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    } else {
        info!("Database connection closed");
    }

    info!("Voltra CSMS shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    if config.logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
