use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_broadcast_period_ms() -> u64 {
    100
}

fn default_max_broadcasting_batch_size() -> usize {
    512
}

fn default_command_queue_capacity() -> usize {
    1024
}

/// Resource Manager configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResourceManagerConfig {
    /// How often the pending usage deltas are flushed and published (milliseconds)
    #[serde(default = "default_broadcast_period_ms")]
    pub broadcast_period_ms: u64,

    /// Max number of node deltas carried by one broadcast
    #[serde(default = "default_max_broadcasting_batch_size")]
    pub max_broadcasting_batch_size: usize,

    /// Bound of the control loop command queue
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
}

impl ResourceManagerConfig {
    pub fn broadcast_period(&self) -> Duration {
        Duration::from_millis(self.broadcast_period_ms.max(1))
    }
}

impl Default for ResourceManagerConfig {
    fn default() -> Self {
        Self {
            broadcast_period_ms: default_broadcast_period_ms(),
            max_broadcasting_batch_size: default_max_broadcasting_batch_size(),
            command_queue_capacity: default_command_queue_capacity(),
        }
    }
}
