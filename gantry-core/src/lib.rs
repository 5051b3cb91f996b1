//! # Gantry Core
//!
//! Types shared by every Gantry crate: node identity, resource sets, the usage
//! reports nodes send on every heartbeat, and the request/reply pairs served by
//! the resource manager.

pub mod node;
pub mod node_id;
pub mod resources;
pub mod rpc;
pub mod usage;

#[cfg(test)]
mod node_id_test;
#[cfg(test)]
mod resources_test;

pub use node::{NodeInfo, NodeResourceChange, NodeState};
pub use node_id::{NodeId, NodeIdError, NODE_ID_SIZE};
pub use resources::ResourceSet;
pub use usage::{
    NormalTaskResources, PendingPlacementGroup, PlacementGroupLoad, PlacementStrategy,
    ResourceDelta, ResourceDemand, ResourceUsageBatch, ResourcesData,
};
