use anyhow::{anyhow, Context, Result};
use gantry_core::{NodeId, NodeInfo, ResourceSet};
use gantry_resource_manager::{NodeResourceRecord, ResourceManagerConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// configuration settings loaded from the config file
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LoadConfiguration {
    /// Gantry cluster name
    pub(crate) cluster_name: String,
    /// Host the server's listeners bind to
    #[serde(default = "default_host")]
    pub(crate) host: String,
    /// Resource manager tuning
    #[serde(default)]
    pub(crate) resource_manager: Option<ResourceManagerConfig>,
    /// Metrics exporter configuration
    #[serde(default)]
    pub(crate) metrics: Option<MetricsConfig>,
    /// Metadata store configuration
    pub(crate) meta_store: MetaStoreConfig,
    /// Nodes registered on boot
    #[serde(default)]
    pub(crate) static_nodes: Vec<StaticNode>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MetricsConfig {
    pub(crate) prometheus_port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum MetaStoreBackend {
    InMemory,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MetaStoreConfig {
    pub(crate) backend: MetaStoreBackend,
    /// Node resource records present in the store at startup
    #[serde(default)]
    pub(crate) node_resources: Vec<StaticNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StaticNode {
    pub(crate) node_id: Option<NodeId>,
    pub(crate) resources: ResourceSet,
}

impl StaticNode {
    fn resolve(self) -> Result<(NodeId, ResourceSet)> {
        let node_id = self.node_id.unwrap_or_else(NodeId::random);
        if node_id.is_nil() {
            return Err(anyhow!("node id must not be nil"));
        }
        if self.resources.has_invalid_quantity() {
            return Err(anyhow!(
                "node {} has an invalid resource quantity: {}",
                node_id,
                self.resources
            ));
        }
        Ok((node_id, self.resources))
    }
}

/// configuration settings of the Gantry server, validated
#[derive(Debug)]
pub(crate) struct ServiceConfiguration {
    /// Gantry cluster name
    pub(crate) cluster_name: String,
    /// Resource manager tuning
    pub(crate) resource_manager: ResourceManagerConfig,
    /// Prometheus exporter address
    pub(crate) prom_exporter: Option<SocketAddr>,
    /// Metadata store backend
    pub(crate) meta_store_backend: MetaStoreBackend,
    /// Records written to the metadata store before recovery
    pub(crate) seeded_node_resources: Vec<NodeResourceRecord>,
    /// Nodes registered on boot
    pub(crate) static_nodes: Vec<NodeInfo>,
}

impl TryFrom<LoadConfiguration> for ServiceConfiguration {
    type Error = anyhow::Error;

    fn try_from(config: LoadConfiguration) -> Result<Self> {
        let prom_exporter: Option<SocketAddr> =
            match config.metrics.and_then(|metrics| metrics.prometheus_port) {
                Some(port) => Some(
                    format!("{}:{}", config.host, port)
                        .parse()
                        .context("Failed to create prom_exporter")?,
                ),
                None => None,
            };

        let seeded_node_resources = config
            .meta_store
            .node_resources
            .into_iter()
            .map(|node| {
                node.resolve().map(|(node_id, resources_total)| NodeResourceRecord {
                    node_id,
                    resources_total,
                })
            })
            .collect::<Result<Vec<_>>>()
            .context("Invalid meta_store.node_resources entry")?;

        let static_nodes = config
            .static_nodes
            .into_iter()
            .map(|node| {
                node.resolve()
                    .map(|(node_id, resources)| NodeInfo::new(node_id, resources))
            })
            .collect::<Result<Vec<_>>>()
            .context("Invalid static_nodes entry")?;

        Ok(ServiceConfiguration {
            cluster_name: config.cluster_name,
            resource_manager: config.resource_manager.unwrap_or_default(),
            prom_exporter,
            meta_store_backend: config.meta_store.backend,
            seeded_node_resources,
            static_nodes,
        })
    }
}
