use crate::{NodeId, NodeIdError, NODE_ID_SIZE};

#[test]
fn test_hex_round_trip() {
    let id = NodeId::random();
    let hex = id.to_string();
    assert_eq!(hex.len(), NODE_ID_SIZE * 2);
    assert_eq!(hex.parse::<NodeId>().unwrap(), id);
}

#[test]
fn test_rejects_wrong_length() {
    let err = NodeId::from_hex("abcd").unwrap_err();
    assert_eq!(
        err,
        NodeIdError::InvalidLength {
            expected: NODE_ID_SIZE,
            actual: 2
        }
    );
}

#[test]
fn test_rejects_non_hex() {
    let value = "zz".repeat(NODE_ID_SIZE);
    assert!(matches!(
        NodeId::from_hex(&value),
        Err(NodeIdError::InvalidHex(_))
    ));
}

#[test]
fn test_nil_id() {
    assert!(NodeId::nil().is_nil());
    assert!(NodeId::default().is_nil());
    assert!(!NodeId::from_bytes([7u8; NODE_ID_SIZE]).is_nil());
}

#[test]
fn test_serializes_as_hex_string() {
    let id = NodeId::from_bytes([0xab; NODE_ID_SIZE]);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", "ab".repeat(NODE_ID_SIZE)));

    let back: NodeId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);

    assert!(serde_json::from_str::<NodeId>("\"0102\"").is_err());
}
