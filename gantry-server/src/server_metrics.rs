use anyhow::{Context, Result};
use gantry_resource_manager::resource_metrics::{Metric, COUNTERS, GAUGES};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

pub(crate) fn init_metrics(prom_addr: Option<SocketAddr>, cluster_name: &str) -> Result<()> {
    info!("initializing metrics exporter");

    if let Some(addr) = prom_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .add_global_label("cluster", cluster_name.to_string())
            .install()
            .context("failed to install Prometheus recorder")?;
        info!(address = %addr, "prometheus exporter listening");
    }

    for metric in COUNTERS {
        register_counter(metric)
    }

    for metric in GAUGES {
        register_gauge(metric)
    }

    Ok(())
}

/// Registers a counter with the given name.
fn register_counter(metric: Metric) {
    metrics::describe_counter!(metric.name, metric.description);
    let _counter = metrics::counter!(metric.name);
}

/// Registers a gauge with the given name.
fn register_gauge(metric: Metric) {
    metrics::describe_gauge!(metric.name, metric.description);
    let _gauge = metrics::gauge!(metric.name);
}
