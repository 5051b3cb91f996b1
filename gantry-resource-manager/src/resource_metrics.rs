// Centralized metric name constants for the resource manager crate.
// The server registers their descriptions when it installs the exporter.

#[derive(Debug, Clone, Copy)]
pub struct Metric {
    pub name: &'static str,
    pub description: &'static str,
}

pub const COUNTERS: [Metric; 7] = [
    RESOURCE_REQUESTS_TOTAL,
    RESOURCE_ACQUIRE_TOTAL,
    RESOURCE_RELEASE_TOTAL,
    NORMAL_TASK_REPORTS_DROPPED_TOTAL,
    BROADCAST_BATCHES_TOTAL,
    BROADCAST_DELTAS_TOTAL,
    BROADCAST_PUBLISH_FAILURES_TOTAL,
];

pub const GAUGES: [Metric; 1] = [LEDGER_NODES];

// LEDGER Metrics --------------------------

pub const LEDGER_NODES: Metric = Metric {
    name: "gantry_ledger_nodes",
    description: "Number of nodes currently tracked by the resource ledger",
};

pub const RESOURCE_ACQUIRE_TOTAL: Metric = Metric {
    name: "gantry_resource_acquire_total",
    description: "Total acquire attempts against the ledger (result={ok,rejected})",
};

pub const RESOURCE_RELEASE_TOTAL: Metric = Metric {
    name: "gantry_resource_release_total",
    description: "Total release attempts against the ledger (result={ok,rejected})",
};

// REQUEST Metrics --------------------------

pub const RESOURCE_REQUESTS_TOTAL: Metric = Metric {
    name: "gantry_resource_requests_total",
    description: "Total node resource requests handled (per operation)",
};

pub const NORMAL_TASK_REPORTS_DROPPED_TOTAL: Metric = Metric {
    name: "gantry_normal_task_reports_dropped_total",
    description: "Normal task resource records dropped because a newer one was already applied",
};

// BROADCAST Metrics --------------------------

pub const BROADCAST_BATCHES_TOTAL: Metric = Metric {
    name: "gantry_broadcast_batches_total",
    description: "Total resource usage batches published",
};

pub const BROADCAST_DELTAS_TOTAL: Metric = Metric {
    name: "gantry_broadcast_deltas_total",
    description: "Total node deltas carried by published batches",
};

pub const BROADCAST_PUBLISH_FAILURES_TOTAL: Metric = Metric {
    name: "gantry_broadcast_publish_failures_total",
    description: "Total failed publish attempts (per topic)",
};
