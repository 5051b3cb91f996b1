use gantry_core::ResourceUsageBatch;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

use crate::{
    broadcast_buffer::BroadcastBuffer,
    config::ResourceManagerConfig,
    errors::{ResourceManagerError, Result},
    publisher::Publisher,
    resource_metrics::{
        BROADCAST_BATCHES_TOTAL, BROADCAST_DELTAS_TOTAL, BROADCAST_PUBLISH_FAILURES_TOTAL,
    },
};

pub const RESOURCE_USAGE_BATCH_TOPIC: &str = "resource_usage_batch";

/// Periodically flushes the broadcast buffer and publishes the batch.
///
/// Empty flushes are skipped. A batch that fails to publish is lost; the next
/// report of each node carries its state again.
pub struct Broadcaster {
    buffer: BroadcastBuffer,
    publisher: Arc<dyn Publisher>,
    period: Duration,
    max_batch_size: usize,
}

impl Broadcaster {
    pub fn new(
        buffer: BroadcastBuffer,
        publisher: Arc<dyn Publisher>,
        config: &ResourceManagerConfig,
    ) -> Self {
        Broadcaster {
            buffer,
            publisher,
            period: config.broadcast_period(),
            max_batch_size: config.max_broadcasting_batch_size.max(1),
        }
    }

    /// Starts the periodic flush. On cancellation the buffer is drained before the task exits.
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                period_ms = self.period.as_millis() as u64,
                max_batch_size = self.max_batch_size,
                "resource usage broadcaster started"
            );

            let mut ticker = tokio::time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        loop {
                            match self.run_once().await {
                                Ok(0) | Err(_) => break,
                                Ok(_) => continue,
                            }
                        }
                        info!("resource usage broadcaster stopped after drain (cancel)");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            error!(error = %e, "resource usage broadcast failed");
                        }
                    }
                }
            }
        })
    }

    /// Flushes one batch and publishes it. Returns the number of deltas published.
    pub async fn run_once(&self) -> Result<usize> {
        // The buffer lock is released before publishing
        let batch = self.buffer.flush(self.max_batch_size);
        if batch.is_empty() {
            return Ok(0);
        }

        let size = batch.len();
        let payload = ResourceUsageBatch { batch }.to_bytes()?;

        if let Err(e) = self
            .publisher
            .publish(RESOURCE_USAGE_BATCH_TOPIC, payload)
            .await
        {
            counter!(BROADCAST_PUBLISH_FAILURES_TOTAL.name, "topic" => RESOURCE_USAGE_BATCH_TOPIC)
                .increment(1);
            return Err(ResourceManagerError::Publish {
                topic: RESOURCE_USAGE_BATCH_TOPIC.to_string(),
                reason: e.to_string(),
            });
        }

        counter!(BROADCAST_BATCHES_TOTAL.name).increment(1);
        counter!(BROADCAST_DELTAS_TOTAL.name).increment(size as u64);
        trace!(deltas = size, "published resource usage batch");
        Ok(size)
    }
}
