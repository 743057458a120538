//! Oracle gateway - vehicle onboarding and telemetry normalization
//!
//! Bridges an external vehicle-data vendor to a downstream node:
//! enrolls VINs with the vendor, correlates the asynchronous enrollment
//! confirmations, and normalizes the vendor's telemetry stream into
//! canonical events.
//!
//! Module structure:
//! - `domain/` - Core business types (status codes, telemetry, events)
//! - `io/` - External interfaces (vendor API, MQTT, store, node, metrics)
//! - `services/` - Business logic (router, correlator, onboarding, pipeline)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use oracle_gateway::domain::types::Vin;
use oracle_gateway::infra::{Config, Metrics};
use oracle_gateway::io::{
    create_egress_channel, DefaultCatalog, FileCatalog, HttpVendorApi, MemoryVehicleStore,
    NodePublisher, SignalCatalog, VehicleStore, VendorEnrollmentApi,
};
use oracle_gateway::services::{
    ConfirmationRouter, EnrollmentCorrelator, OnboardingService, TelemetryPipeline,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Oracle gateway - vendor onboarding and telemetry normalization
#[derive(Parser, Debug)]
#[command(name = "oracle-gateway", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to the CONFIG_FILE
    /// environment variable, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("oracle-gateway starting");

    let args = Args::parse();
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        vendor_api_url = %config.vendor_api_url(),
        mqtt_host = %config.mqtt_host(),
        mqtt_port = %config.mqtt_port(),
        confirmations_topic = %config.mqtt_confirmations_topic(),
        telemetry_topic = %config.mqtt_telemetry_topic(),
        node_url = %config.node_url(),
        connect_deadline_secs = %config.connect_deadline_secs(),
        prometheus_port = %config.prometheus_port(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Shared components
    let metrics = Arc::new(Metrics::new());
    let store: Arc<dyn VehicleStore> = Arc::new(MemoryVehicleStore::new());
    let catalog: Arc<dyn SignalCatalog> = match config.catalog_file() {
        Some(path) => Arc::new(FileCatalog::new(path)),
        None => Arc::new(DefaultCatalog),
    };
    let api: Arc<dyn VendorEnrollmentApi> = Arc::new(HttpVendorApi::new(&config));
    let router = ConfirmationRouter::new(metrics.clone());

    let correlator = EnrollmentCorrelator::new(api.clone(), store.clone(), router.clone());
    let onboarding = Arc::new(OnboardingService::new(
        correlator,
        api,
        store.clone(),
        Duration::from_secs(config.connect_deadline_secs()),
    ));

    // Telemetry channel (bounded for backpressure)
    let (telemetry_tx, telemetry_rx) = mpsc::channel(1000);

    // Start MQTT client
    let mqtt_config = config.clone();
    let mqtt_router = router.clone();
    let mqtt_metrics = metrics.clone();
    let mqtt_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) = oracle_gateway::io::mqtt::start_mqtt_client(
            &mqtt_config,
            mqtt_router,
            telemetry_tx,
            mqtt_metrics,
            mqtt_shutdown,
        )
        .await
        {
            tracing::error!(error = %e, "MQTT client error");
        }
    });

    // Egress channel and node publisher
    let (egress_sender, egress_rx) = create_egress_channel(metrics.clone());
    let publisher = NodePublisher::new(config.node_url(), metrics.clone());
    let publisher_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        publisher.run(egress_rx, publisher_shutdown).await;
    });

    // Start Prometheus metrics HTTP server (if port > 0)
    let prometheus_port = config.prometheus_port();
    if prometheus_port > 0 {
        let prom_metrics = metrics.clone();
        let prom_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = oracle_gateway::io::prometheus::start_metrics_server(
                prometheus_port,
                prom_metrics,
                prom_shutdown,
            )
            .await
            {
                tracing::error!(error = %e, "Prometheus metrics server error");
            }
        });
    }

    // Start metrics reporter (lock-free reads with full summary)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.snapshot().log();
        }
    });

    // Enroll configured VINs once at startup (dev convenience)
    if !config.connect_on_start().is_empty() {
        let vins: Vec<Vin> = config
            .connect_on_start()
            .iter()
            .filter_map(|s| match Vin::new(s.clone()) {
                Ok(vin) => Some(vin),
                Err(e) => {
                    warn!(vin = %s, error = %e, "skipping invalid VIN in connect_on_start");
                    None
                }
            })
            .collect();
        if !vins.is_empty() {
            let onboarding = onboarding.clone();
            tokio::spawn(async move {
                match onboarding.connect(&vins).await {
                    Ok(outcome) => info!(
                        resolved = %outcome.resolved.len(),
                        unresolved = %outcome.unresolved.len(),
                        "startup_connect_finished"
                    ),
                    Err(e) => tracing::error!(error = %e, "startup_connect_failed"),
                }
            });
        }
    }

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run telemetry pipeline - consumes messages until shutdown
    let pipeline = TelemetryPipeline::new(&config, store, catalog, egress_sender, metrics);
    pipeline.run(telemetry_rx, shutdown_rx).await;

    info!("oracle-gateway shutdown complete");
    Ok(())
}
