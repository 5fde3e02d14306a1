mod config;

use common::domain::DeviceRepository;
use common::postgres::{PostgresClient, PostgresDeviceRepository};
use common::telemetry::{init_telemetry, TelemetryConfig};
use config::ServiceConfig;
use dvapi::DeviceService;
use goose::MigrationRunner;
use std::sync::Arc;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        service_name: config.service_name.clone(),
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(service_name = %config.service_name, "Starting device registry");
    debug!("Configuration: {:?}", config);

    let device_repository = match initialize_device_repository(&config).await {
        Ok(repo) => repo,
        Err(e) => {
            error!("Failed to initialize device store: {:#}", e);
            std::process::exit(1);
        }
    };

    let device_service = Arc::new(DeviceService::new(device_repository));
    info!("Device registry ready");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Running cleanup tasks...");
    device_service.close();
    info!("Cleanup complete");
}

async fn initialize_device_repository(
    config: &ServiceConfig,
) -> anyhow::Result<Arc<dyn DeviceRepository>> {
    let postgres_config = config.postgres();

    info!("Initializing PostgreSQL...");
    MigrationRunner::new(
        postgres_config.goose_binary_path.clone(),
        postgres_config.migrations_dir.clone(),
        "postgres".to_string(),
        postgres_config.dsn(),
    )
    .run_migrations()
    .await?;

    let client = PostgresClient::from_config(&postgres_config)?;
    client.ping().await?;

    Ok(Arc::new(PostgresDeviceRepository::new(client)))
}
