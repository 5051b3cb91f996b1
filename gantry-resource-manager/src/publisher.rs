use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

use crate::errors::Result;

const TOPIC_CHANNEL_CAPACITY: usize = 256;

/// Outbound channel for resource usage batches and node resource changes.
///
/// Implementations may block on network I/O; callers never hold the broadcast
/// buffer lock while publishing.
#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

/// In-process publisher with one broadcast channel per topic.
///
/// Publishing to a topic without subscribers succeeds and drops the payload.
/// Slow subscribers observe a lag error on their stream and miss the oldest payloads.
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    topics: Arc<DashMap<String, broadcast::Sender<Vec<u8>>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        MemoryPublisher::default()
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CHANNEL_CAPACITY).0)
            .value()
            .clone()
    }

    /// Stream of every payload published to `topic` from now on.
    pub fn subscribe(&self, topic: &str) -> BroadcastStream<Vec<u8>> {
        BroadcastStream::new(self.sender(topic).subscribe())
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let receivers = self.sender(topic).send(payload).unwrap_or(0);
        trace!(topic, receivers, "published payload");
        Ok(())
    }
}
