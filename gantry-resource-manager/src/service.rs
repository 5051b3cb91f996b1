use gantry_core::rpc::{
    DeleteResourcesReply, DeleteResourcesRequest, GetAllAvailableResourcesReply,
    GetAllAvailableResourcesRequest, GetAllResourceUsageReply, GetAllResourceUsageRequest,
    GetResourcesReply, GetResourcesRequest, ReportResourceUsageReply, ReportResourceUsageRequest,
    UpdateResourcesReply, UpdateResourcesRequest,
};
use gantry_core::{NodeId, NodeInfo, PlacementGroupLoad, ResourceSet};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    errors::{ResourceManagerError, Result},
    ledger::SchedulingResources,
    listeners::ResourcesChangedListener,
    manager::ResourceManager,
};

/// Commands processed by the resource manager control loop.
pub(crate) enum ResourceManagerCommand {
    GetResources {
        request: GetResourcesRequest,
        response_tx: oneshot::Sender<GetResourcesReply>,
    },
    UpdateResources {
        request: UpdateResourcesRequest,
        response_tx: oneshot::Sender<UpdateResourcesReply>,
    },
    DeleteResources {
        request: DeleteResourcesRequest,
        response_tx: oneshot::Sender<DeleteResourcesReply>,
    },
    GetAllAvailableResources {
        request: GetAllAvailableResourcesRequest,
        response_tx: oneshot::Sender<GetAllAvailableResourcesReply>,
    },
    ReportResourceUsage {
        request: ReportResourceUsageRequest,
        response_tx: oneshot::Sender<ReportResourceUsageReply>,
    },
    GetAllResourceUsage {
        request: GetAllResourceUsageRequest,
        response_tx: oneshot::Sender<GetAllResourceUsageReply>,
    },
    NodeAdded {
        node: NodeInfo,
        response_tx: oneshot::Sender<()>,
    },
    NodeDead {
        node_id: NodeId,
        response_tx: oneshot::Sender<bool>,
    },
    SetAvailable {
        node_id: NodeId,
        resources: ResourceSet,
        response_tx: oneshot::Sender<bool>,
    },
    Acquire {
        node_id: NodeId,
        resources: ResourceSet,
        response_tx: oneshot::Sender<bool>,
    },
    Release {
        node_id: NodeId,
        resources: ResourceSet,
        response_tx: oneshot::Sender<bool>,
    },
    UpdateCapacity {
        node_id: NodeId,
        resources: ResourceSet,
        response_tx: oneshot::Sender<bool>,
    },
    UpdateNormalTaskResources {
        node_id: NodeId,
        resources: ResourceSet,
        timestamp: i64,
        response_tx: oneshot::Sender<bool>,
    },
    UpdatePlacementGroupLoad {
        load: PlacementGroupLoad,
        response_tx: oneshot::Sender<()>,
    },
    AddListener {
        listener: ResourcesChangedListener,
        response_tx: oneshot::Sender<()>,
    },
    GetClusterResources {
        response_tx: oneshot::Sender<HashMap<NodeId, SchedulingResources>>,
    },
    GetNodeResources {
        node_id: NodeId,
        response_tx: oneshot::Sender<Option<SchedulingResources>>,
    },
    DebugString {
        response_tx: oneshot::Sender<String>,
    },
    ClusterResourcesString {
        response_tx: oneshot::Sender<String>,
    },
    Shutdown,
}

/// Runs the resource manager on a single task.
///
/// All ledger access is serialized through the command queue, so the manager
/// itself needs no locking. Listeners run on this task as part of the command
/// that triggered them.
pub struct ResourceManagerService;

impl ResourceManagerService {
    /// Spawns the control loop. The manager should be initialized beforehand.
    pub fn start(
        mut manager: ResourceManager,
        command_queue_capacity: usize,
    ) -> (ResourceManagerHandle, JoinHandle<()>) {
        let (command_tx, mut command_rx) = mpsc::channel(command_queue_capacity.max(1));

        if !manager.is_initialized() {
            warn!("resource manager started without recovering persisted node resources");
        }

        let handle = tokio::spawn(async move {
            info!("resource manager control loop started");

            while let Some(command) = command_rx.recv().await {
                if !Self::process(&mut manager, command) {
                    info!("resource manager control loop shutting down");
                    break;
                }
            }

            info!("resource manager control loop stopped");
        });

        (ResourceManagerHandle { command_tx }, handle)
    }

    // Returns false once the loop should stop.
    fn process(manager: &mut ResourceManager, command: ResourceManagerCommand) -> bool {
        use ResourceManagerCommand::*;

        // A dropped receiver only means the caller stopped waiting
        match command {
            GetResources {
                request,
                response_tx,
            } => {
                let _ = response_tx.send(manager.handle_get_resources(request));
            }
            UpdateResources {
                request,
                response_tx,
            } => {
                let _ = response_tx.send(manager.handle_update_resources(request));
            }
            DeleteResources {
                request,
                response_tx,
            } => {
                let _ = response_tx.send(manager.handle_delete_resources(request));
            }
            GetAllAvailableResources {
                request,
                response_tx,
            } => {
                let _ = response_tx.send(manager.handle_get_all_available_resources(request));
            }
            ReportResourceUsage {
                request,
                response_tx,
            } => {
                let _ = response_tx.send(manager.handle_report_resource_usage(request));
            }
            GetAllResourceUsage {
                request,
                response_tx,
            } => {
                let _ = response_tx.send(manager.handle_get_all_resource_usage(request));
            }
            NodeAdded { node, response_tx } => {
                manager.on_node_add(&node);
                let _ = response_tx.send(());
            }
            NodeDead {
                node_id,
                response_tx,
            } => {
                let _ = response_tx.send(manager.on_node_dead(&node_id));
            }
            SetAvailable {
                node_id,
                resources,
                response_tx,
            } => {
                let _ = response_tx.send(manager.set_available_resources(&node_id, resources));
            }
            Acquire {
                node_id,
                resources,
                response_tx,
            } => {
                let _ = response_tx.send(manager.acquire_resources(&node_id, &resources));
            }
            Release {
                node_id,
                resources,
                response_tx,
            } => {
                let _ = response_tx.send(manager.release_resources(&node_id, &resources));
            }
            UpdateCapacity {
                node_id,
                resources,
                response_tx,
            } => {
                let _ = response_tx.send(manager.update_resource_capacity(&node_id, &resources));
            }
            UpdateNormalTaskResources {
                node_id,
                resources,
                timestamp,
                response_tx,
            } => {
                let applied =
                    manager.update_node_normal_task_resources(node_id, &resources, timestamp);
                let _ = response_tx.send(applied);
            }
            UpdatePlacementGroupLoad { load, response_tx } => {
                manager.update_placement_group_load(load);
                let _ = response_tx.send(());
            }
            AddListener {
                listener,
                response_tx,
            } => {
                manager.add_resources_changed_listener(listener);
                let _ = response_tx.send(());
            }
            GetClusterResources { response_tx } => {
                let _ = response_tx.send(manager.get_cluster_resources().clone());
            }
            GetNodeResources {
                node_id,
                response_tx,
            } => {
                let _ = response_tx.send(manager.get_node_resources(&node_id).cloned());
            }
            DebugString { response_tx } => {
                let _ = response_tx.send(manager.debug_string());
            }
            ClusterResourcesString { response_tx } => {
                let _ = response_tx.send(manager.cluster_resources_string());
            }
            Shutdown => return false,
        }
        true
    }
}

/// Cloneable async facade over the control loop.
///
/// Every call is queued behind the commands already submitted and fails with
/// `ServiceStopped` once the loop has exited.
#[derive(Debug, Clone)]
pub struct ResourceManagerHandle {
    command_tx: mpsc::Sender<ResourceManagerCommand>,
}

impl ResourceManagerHandle {
    async fn call<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> ResourceManagerCommand,
    ) -> Result<R> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(command(response_tx))
            .await
            .map_err(|_| ResourceManagerError::ServiceStopped)?;
        response_rx
            .await
            .map_err(|_| ResourceManagerError::ServiceStopped)
    }

    pub async fn get_resources(&self, request: GetResourcesRequest) -> Result<GetResourcesReply> {
        self.call(|response_tx| ResourceManagerCommand::GetResources {
            request,
            response_tx,
        })
        .await
    }

    pub async fn update_resources(
        &self,
        request: UpdateResourcesRequest,
    ) -> Result<UpdateResourcesReply> {
        self.call(|response_tx| ResourceManagerCommand::UpdateResources {
            request,
            response_tx,
        })
        .await
    }

    pub async fn delete_resources(
        &self,
        request: DeleteResourcesRequest,
    ) -> Result<DeleteResourcesReply> {
        self.call(|response_tx| ResourceManagerCommand::DeleteResources {
            request,
            response_tx,
        })
        .await
    }

    pub async fn get_all_available_resources(
        &self,
        request: GetAllAvailableResourcesRequest,
    ) -> Result<GetAllAvailableResourcesReply> {
        self.call(|response_tx| ResourceManagerCommand::GetAllAvailableResources {
            request,
            response_tx,
        })
        .await
    }

    pub async fn report_resource_usage(
        &self,
        request: ReportResourceUsageRequest,
    ) -> Result<ReportResourceUsageReply> {
        self.call(|response_tx| ResourceManagerCommand::ReportResourceUsage {
            request,
            response_tx,
        })
        .await
    }

    pub async fn get_all_resource_usage(
        &self,
        request: GetAllResourceUsageRequest,
    ) -> Result<GetAllResourceUsageReply> {
        self.call(|response_tx| ResourceManagerCommand::GetAllResourceUsage {
            request,
            response_tx,
        })
        .await
    }

    pub async fn on_node_add(&self, node: NodeInfo) -> Result<()> {
        self.call(|response_tx| ResourceManagerCommand::NodeAdded { node, response_tx })
            .await
    }

    /// Returns whether the node was known.
    pub async fn on_node_dead(&self, node_id: NodeId) -> Result<bool> {
        self.call(|response_tx| ResourceManagerCommand::NodeDead {
            node_id,
            response_tx,
        })
        .await
    }

    pub async fn set_available_resources(
        &self,
        node_id: NodeId,
        resources: ResourceSet,
    ) -> Result<bool> {
        self.call(|response_tx| ResourceManagerCommand::SetAvailable {
            node_id,
            resources,
            response_tx,
        })
        .await
    }

    pub async fn acquire_resources(&self, node_id: NodeId, resources: ResourceSet) -> Result<bool> {
        self.call(|response_tx| ResourceManagerCommand::Acquire {
            node_id,
            resources,
            response_tx,
        })
        .await
    }

    pub async fn release_resources(&self, node_id: NodeId, resources: ResourceSet) -> Result<bool> {
        self.call(|response_tx| ResourceManagerCommand::Release {
            node_id,
            resources,
            response_tx,
        })
        .await
    }

    pub async fn update_resource_capacity(
        &self,
        node_id: NodeId,
        resources: ResourceSet,
    ) -> Result<bool> {
        self.call(|response_tx| ResourceManagerCommand::UpdateCapacity {
            node_id,
            resources,
            response_tx,
        })
        .await
    }

    pub async fn update_node_normal_task_resources(
        &self,
        node_id: NodeId,
        resources: ResourceSet,
        timestamp: i64,
    ) -> Result<bool> {
        self.call(|response_tx| ResourceManagerCommand::UpdateNormalTaskResources {
            node_id,
            resources,
            timestamp,
            response_tx,
        })
        .await
    }

    pub async fn update_placement_group_load(&self, load: PlacementGroupLoad) -> Result<()> {
        self.call(|response_tx| ResourceManagerCommand::UpdatePlacementGroupLoad {
            load,
            response_tx,
        })
        .await
    }

    pub async fn add_resources_changed_listener(
        &self,
        listener: ResourcesChangedListener,
    ) -> Result<()> {
        self.call(|response_tx| ResourceManagerCommand::AddListener {
            listener,
            response_tx,
        })
        .await
    }

    pub async fn get_cluster_resources(&self) -> Result<HashMap<NodeId, SchedulingResources>> {
        self.call(|response_tx| ResourceManagerCommand::GetClusterResources { response_tx })
            .await
    }

    pub async fn get_node_resources(&self, node_id: NodeId) -> Result<Option<SchedulingResources>> {
        self.call(|response_tx| ResourceManagerCommand::GetNodeResources {
            node_id,
            response_tx,
        })
        .await
    }

    pub async fn debug_string(&self) -> Result<String> {
        self.call(|response_tx| ResourceManagerCommand::DebugString { response_tx })
            .await
    }

    pub async fn cluster_resources_string(&self) -> Result<String> {
        self.call(|response_tx| ResourceManagerCommand::ClusterResourcesString { response_tx })
            .await
    }

    /// Stops the control loop after the commands queued before it.
    pub async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(ResourceManagerCommand::Shutdown)
            .await
            .map_err(|_| ResourceManagerError::ServiceStopped)
    }
}
