//! OCPP 1.6 WebSocket gateway binary.
//!
//! Reads configuration from TOML (`OCPP_CONFIG` or the platform config
//! dir), seeds the in-memory directory from the provisioning section, and
//! serves charge point connections until SIGINT/SIGTERM.

use std::sync::Arc;

use tracing::{error, info};

use ocpp_gateway::audit::InMemoryMessageLog;
use ocpp_gateway::commands::CommandSender;
use ocpp_gateway::config::{default_config_path, AppConfig};
use ocpp_gateway::domain::IdTag;
use ocpp_gateway::handlers::vendor::VendorRegistry;
use ocpp_gateway::server::OcppServer;
use ocpp_gateway::services::{
    start_reservation_expiry_task, ChargePointService, ReservationService,
};
use ocpp_gateway::session::SessionRegistry;
use ocpp_gateway::shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};
use ocpp_gateway::storage::{InMemoryStorage, Storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("OCPP_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());

    let config = match AppConfig::load(&config_path) {
        Ok(config) => {
            init_tracing(&config.logging.level);
            info!("Configuration loaded from {}", config_path.display());
            config
        }
        Err(e) => {
            let config = AppConfig::default();
            init_tracing(&config.logging.level);
            error!("Failed to load config: {}. Using defaults.", e);
            config
        }
    };

    info!("Starting OCPP gateway");

    // In-memory directory; provisioning normally happens through an
    // external administrative surface.
    let storage = Arc::new(InMemoryStorage::new());
    let connectors = config.provisioning.connectors_per_station.unwrap_or(2);
    for cp_id in &config.provisioning.charge_points {
        storage.provision_charge_point(cp_id.clone(), connectors);
        info!(charge_point_id = cp_id.as_str(), "Provisioned charge point");
    }
    for tag in &config.provisioning.id_tags {
        storage.provision_id_tag(IdTag::new(tag.clone()));
    }

    let storage: Arc<dyn Storage> = storage;
    let service = Arc::new(ChargePointService::new(storage.clone()));
    let reservations = Arc::new(ReservationService::new(storage.clone()));
    let message_log = InMemoryMessageLog::shared(config.ocpp.message_log_capacity);
    let session_registry = SessionRegistry::shared();
    let command_sender = Arc::new(CommandSender::with_timeout(
        session_registry.clone(),
        message_log.clone(),
        std::time::Duration::from_secs(config.ocpp.command_timeout_secs),
    ));
    let vendors = Arc::new(VendorRegistry::new());

    let shutdown = ShutdownSignal::new();
    tokio::spawn(listen_for_shutdown_signals(shutdown.clone()));

    start_reservation_expiry_task(
        storage.clone(),
        shutdown.clone(),
        config.ocpp.reservation_sweep_secs,
    );

    let server = OcppServer::new(
        config,
        session_registry,
        service,
        reservations,
        command_sender,
        vendors,
        message_log,
    )
    .with_shutdown(shutdown.clone());

    server.run().await?;

    info!("OCPP gateway shutdown complete");
    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}
