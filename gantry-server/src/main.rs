mod args_parse;
mod gantry_service;
mod server_metrics;
mod service_configuration;


use std::{fs::read_to_string, net::SocketAddr, path::Path};

use crate::{
    args_parse::Args,
    gantry_service::GantryService,
    server_metrics::init_metrics,
    service_configuration::{LoadConfiguration, ServiceConfiguration},
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse command line arguments
    let args = Args::parse();

    // Load the configuration from the specified YAML file
    let config_content = read_to_string(Path::new(&args.config_file))
        .with_context(|| format!("Failed to read config file: {}", args.config_file))?;
    let load_config: LoadConfiguration =
        serde_yaml::from_str(&config_content).context("Failed to parse config file")?;

    // Attempt to transform LoadConfiguration into ServiceConfiguration
    let mut service_config: ServiceConfiguration = load_config.try_into()?;

    // If `prom_exporter` is provided via command-line args, override the value from the config file
    if let Some(prom_exporter) = args.prom_exporter {
        let prom_address: SocketAddr = prom_exporter.parse().context(format!(
            "Failed to parse into Socket address: {}",
            prom_exporter
        ))?;
        service_config.prom_exporter = Some(prom_address);
    }

    init_metrics(service_config.prom_exporter, &service_config.cluster_name)?;

    let mut service = GantryService::new(service_config);
    let handle = service.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    service.stop(handle).await
}
