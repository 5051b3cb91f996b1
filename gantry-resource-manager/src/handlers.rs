use gantry_core::rpc::{
    AvailableResources, DeleteResourcesReply, DeleteResourcesRequest,
    GetAllAvailableResourcesReply, GetAllAvailableResourcesRequest, GetAllResourceUsageReply,
    GetAllResourceUsageRequest, GetResourcesReply, GetResourcesRequest, ReportResourceUsageReply,
    ReportResourceUsageRequest, ResourceUsageSnapshot, Status, UpdateResourcesReply,
    UpdateResourcesRequest,
};
use gantry_core::{NodeId, NodeResourceChange, ResourceSet};
use metrics::counter;
use std::fmt::Write;
use tracing::{debug, trace, warn};

use crate::{
    manager::{NodeResourceEvent, ResourceManager},
    resource_metrics::RESOURCE_REQUESTS_TOTAL,
};

/// The externally served operations, used to index the request counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    GetResources = 0,
    UpdateResources = 1,
    DeleteResources = 2,
    GetAllAvailableResources = 3,
    ReportResourceUsage = 4,
    GetAllResourceUsage = 5,
}

impl RequestKind {
    pub const ALL: [RequestKind; 6] = [
        RequestKind::GetResources,
        RequestKind::UpdateResources,
        RequestKind::DeleteResources,
        RequestKind::GetAllAvailableResources,
        RequestKind::ReportResourceUsage,
        RequestKind::GetAllResourceUsage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::GetResources => "get_resources",
            RequestKind::UpdateResources => "update_resources",
            RequestKind::DeleteResources => "delete_resources",
            RequestKind::GetAllAvailableResources => "get_all_available_resources",
            RequestKind::ReportResourceUsage => "report_resource_usage",
            RequestKind::GetAllResourceUsage => "get_all_resource_usage",
        }
    }
}

/// Number of requests served per operation. Diagnostics only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestCounters {
    counts: [u64; 6],
}

impl RequestCounters {
    pub fn record(&mut self, kind: RequestKind) {
        self.counts[kind as usize] += 1;
        counter!(RESOURCE_REQUESTS_TOTAL.name, "operation" => kind.as_str()).increment(1);
    }

    pub fn get(&self, kind: RequestKind) -> u64 {
        self.counts[kind as usize]
    }
}

fn validate_node_id(node_id: &NodeId) -> Result<(), Status> {
    if node_id.is_nil() {
        return Err(Status::InvalidArgument("node id must not be nil".to_string()));
    }
    Ok(())
}

fn validate_quantities(resources: &ResourceSet) -> Result<(), Status> {
    if resources.names().any(str::is_empty) {
        return Err(Status::InvalidArgument(
            "resource names must not be empty".to_string(),
        ));
    }
    if resources.has_invalid_quantity() {
        return Err(Status::InvalidArgument(format!(
            "resource quantities must be finite and non-negative, got {}",
            resources
        )));
    }
    Ok(())
}

fn unknown_node(node_id: &NodeId) -> Status {
    Status::NotFound(format!("node {} is not registered", node_id))
}

impl ResourceManager {
    /// Total and available resources of a node. Empty sets for an unknown node.
    pub fn handle_get_resources(&mut self, request: GetResourcesRequest) -> GetResourcesReply {
        self.counters.record(RequestKind::GetResources);
        trace!(node_id = %request.node_id, "get resources request");

        match self.ledger.get(&request.node_id) {
            Some(node) => GetResourcesReply {
                status: Status::Ok,
                resources_total: node.total().clone(),
                resources_available: node.available().clone(),
            },
            None => GetResourcesReply::default(),
        }
    }

    pub fn handle_update_resources(
        &mut self,
        request: UpdateResourcesRequest,
    ) -> UpdateResourcesReply {
        self.counters.record(RequestKind::UpdateResources);
        debug!(
            node_id = %request.node_id,
            resources = %request.resources,
            "update resources request"
        );

        if let Err(status) = validate_node_id(&request.node_id)
            .and_then(|_| validate_quantities(&request.resources))
        {
            return UpdateResourcesReply { status };
        }

        if !self.update_resource_capacity(&request.node_id, &request.resources) {
            return UpdateResourcesReply {
                status: unknown_node(&request.node_id),
            };
        }

        let resources_total = self
            .ledger
            .get(&request.node_id)
            .map(|node| node.total().clone())
            .unwrap_or_default();
        self.emit(NodeResourceEvent::Changed(NodeResourceChange {
            node_id: request.node_id,
            updated_resources: request.resources,
            deleted_resources: Vec::new(),
            resources_total,
        }));

        UpdateResourcesReply { status: Status::Ok }
    }

    pub fn handle_delete_resources(
        &mut self,
        request: DeleteResourcesRequest,
    ) -> DeleteResourcesReply {
        self.counters.record(RequestKind::DeleteResources);
        debug!(
            node_id = %request.node_id,
            resources = ?request.resource_name_list,
            "delete resources request"
        );

        if let Err(status) = validate_node_id(&request.node_id) {
            return DeleteResourcesReply { status };
        }
        if request.resource_name_list.iter().any(String::is_empty) {
            return DeleteResourcesReply {
                status: Status::InvalidArgument("resource names must not be empty".to_string()),
            };
        }

        if !self.delete_resources(&request.node_id, &request.resource_name_list) {
            return DeleteResourcesReply {
                status: unknown_node(&request.node_id),
            };
        }

        let resources_total = self
            .ledger
            .get(&request.node_id)
            .map(|node| node.total().clone())
            .unwrap_or_default();
        self.emit(NodeResourceEvent::Changed(NodeResourceChange {
            node_id: request.node_id,
            updated_resources: ResourceSet::new(),
            deleted_resources: request.resource_name_list,
            resources_total,
        }));

        DeleteResourcesReply { status: Status::Ok }
    }

    /// Available resources of every node, ordered by node id.
    pub fn handle_get_all_available_resources(
        &mut self,
        _request: GetAllAvailableResourcesRequest,
    ) -> GetAllAvailableResourcesReply {
        self.counters.record(RequestKind::GetAllAvailableResources);

        let mut resources_list: Vec<AvailableResources> = self
            .ledger
            .get_all()
            .iter()
            .map(|(node_id, node)| AvailableResources {
                node_id: *node_id,
                resources_available: node.available().clone(),
            })
            .collect();
        resources_list.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        GetAllAvailableResourcesReply {
            status: Status::Ok,
            resources_list,
        }
    }

    pub fn handle_report_resource_usage(
        &mut self,
        request: ReportResourceUsageRequest,
    ) -> ReportResourceUsageReply {
        self.counters.record(RequestKind::ReportResourceUsage);
        let report = request.resources;

        if let Err(status) = validate_node_id(&report.node_id) {
            warn!("rejecting resource usage report without a node id");
            return ReportResourceUsageReply { status };
        }
        trace!(node_id = %report.node_id, "resource usage report");

        if let Err(status) = validate_quantities(&report.resources_available)
            .and_then(|_| validate_quantities(&report.resources_total))
            .and_then(|_| validate_quantities(&report.resources_normal_task))
            .and_then(|_| validate_quantities(&report.resource_load))
        {
            warn!(node_id = %report.node_id, "rejecting resource usage report with invalid quantities");
            return ReportResourceUsageReply { status };
        }

        self.update_from_resource_report(report);
        ReportResourceUsageReply { status: Status::Ok }
    }

    /// Latest report of every node with the demand aggregated per shape.
    pub fn handle_get_all_resource_usage(
        &mut self,
        _request: GetAllResourceUsageRequest,
    ) -> GetAllResourceUsageReply {
        self.counters.record(RequestKind::GetAllResourceUsage);

        GetAllResourceUsageReply {
            status: Status::Ok,
            resource_usage_data: ResourceUsageSnapshot {
                batch: self.ingestor.resource_usages(),
                resource_load_by_shape: self.ingestor.aggregate_load_by_shape(),
                placement_group_load: self.ingestor.placement_group_load().cloned(),
            },
        }
    }

    pub fn request_counters(&self) -> &RequestCounters {
        &self.counters
    }

    /// Per-operation request counts, one per line.
    pub fn debug_string(&self) -> String {
        let mut out = String::from("ResourceManager:");
        for kind in RequestKind::ALL {
            let _ = write!(
                out,
                "\n- {} request count: {}",
                kind.as_str(),
                self.counters.get(kind)
            );
        }
        out
    }
}
