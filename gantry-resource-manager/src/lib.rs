//! # Gantry Resource Manager
//!
//! Authoritative record of every node's total and available resources.
//!
//! Nodes register with their capacity, acquire and release resources as work
//! is placed and completed, and send periodic usage reports. Reports are
//! reconciled into the ledger, and the changed part of each report is queued
//! for a periodic broadcast to every other node.
//!
//! The ledger is owned by a single control task (`ResourceManagerService`);
//! callers reach it through the cloneable `ResourceManagerHandle`.

mod errors;
pub use errors::{ResourceManagerError, Result};

pub mod config;
pub use config::ResourceManagerConfig;

mod ledger;
pub use ledger::{ResourceLedger, SchedulingResources};

mod ingestor;
pub use ingestor::ReportIngestor;

mod broadcast_buffer;
pub use broadcast_buffer::BroadcastBuffer;

mod listeners;
pub use listeners::{ListenerRegistry, ResourcesChangedListener};

mod manager;
pub use manager::{NodeResourceEvent, ResourceManager};

mod handlers;
pub use handlers::{RequestCounters, RequestKind};

mod recovery;
pub use recovery::{node_resources_path, InitData, NodeResourceRecord, BASE_NODE_RESOURCES_PATH};

mod service;
pub use service::{ResourceManagerHandle, ResourceManagerService};

// Periodic delta broadcast and the persisted node resource table
mod publisher;
pub use publisher::{MemoryPublisher, Publisher};

mod broadcaster;
pub use broadcaster::{Broadcaster, RESOURCE_USAGE_BATCH_TOPIC};

mod change_feed;
pub use change_feed::{ChangeFeed, NODE_RESOURCE_CHANGE_TOPIC};

pub mod resource_metrics;

#[cfg(test)]
mod service_test;
