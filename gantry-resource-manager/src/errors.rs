use gantry_metadata_store::MetadataError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResourceManagerError>;

#[derive(Error, Debug)]
pub enum ResourceManagerError {
    #[error("failed to recover node resources from {path}: {reason}")]
    RecoveryFailed { path: String, reason: String },

    #[error("resource manager was already initialized")]
    AlreadyInitialized,

    #[error("metadata store error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publish to topic {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("resource manager service is not running")]
    ServiceStopped,
}
