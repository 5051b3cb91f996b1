use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Size in bytes of a node identifier.
pub const NODE_ID_SIZE: usize = 28;

#[derive(Error, Debug, PartialEq)]
pub enum NodeIdError {
    #[error("node id must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("node id is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Cluster-unique identifier of a node, fixed for the node's lifetime.
///
/// Rendered as lowercase hex, both by `Display` and on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId([u8; NODE_ID_SIZE]);

impl NodeId {
    pub const fn from_bytes(bytes: [u8; NODE_ID_SIZE]) -> Self {
        NodeId(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, NodeIdError> {
        let id: [u8; NODE_ID_SIZE] = bytes.try_into().map_err(|_| NodeIdError::InvalidLength {
            expected: NODE_ID_SIZE,
            actual: bytes.len(),
        })?;
        Ok(NodeId(id))
    }

    pub fn from_hex(value: &str) -> Result<Self, NodeIdError> {
        let bytes = hex::decode(value)?;
        Self::from_slice(&bytes)
    }

    /// The all-zero id, never assigned to a live node.
    pub const fn nil() -> Self {
        NodeId([0u8; NODE_ID_SIZE])
    }

    pub fn is_nil(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; NODE_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        NodeId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NODE_ID_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::nil()
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Short form keeps log lines readable.
impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}..)", &self.to_hex()[..8])
    }
}

impl FromStr for NodeId {
    type Err = NodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        NodeId::from_hex(&value).map_err(de::Error::custom)
    }
}
