use crate::{join_path, MemoryStore, MetadataError, MetadataStore};
use serde_json::json;

#[tokio::test]
async fn test_put_get_delete() -> crate::Result<()> {
    let store = MemoryStore::new();
    let path = "/cluster/node_resources/node-a";

    assert!(store.get(path).await?.is_none());

    store.put(path, json!({"CPU": 4.0})).await?;
    assert_eq!(store.get(path).await?, Some(json!({"CPU": 4.0})));

    store.delete(path).await?;
    assert!(store.get(path).await?.is_none());

    // deleting an absent key is not an error
    store.delete(path).await?;
    Ok(())
}

#[tokio::test]
async fn test_rejects_short_paths() {
    let store = MemoryStore::new();
    let err = store.put("/cluster", json!(null)).await.unwrap_err();
    assert!(matches!(err, MetadataError::InvalidArguments(_)));

    let err = store.put("/cluster/node_resources", json!(null)).await.unwrap_err();
    assert!(matches!(err, MetadataError::InvalidArguments(_)));
}

#[tokio::test]
async fn test_get_bulk_returns_full_keys_and_versions() -> crate::Result<()> {
    let store = MemoryStore::new();
    store.put("/cluster/node_resources/a", json!(1)).await?;
    store.put("/cluster/node_resources/b", json!(2)).await?;
    store.put("/cluster/node_resources/b", json!(3)).await?;
    store.put("/cluster/nodes/c", json!(4)).await?;

    let entries = store.get_bulk("/cluster/node_resources/").await?;
    let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["/cluster/node_resources/a", "/cluster/node_resources/b"]);
    assert_eq!(entries[0].version, 1);
    assert_eq!(entries[1].version, 2);
    assert_eq!(entries[1].value, b"3".to_vec());

    assert!(store.get_bulk("/cluster/empty/").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_get_childrens() -> crate::Result<()> {
    let store = MemoryStore::new();
    store.put("/cluster/nodes/a/state", json!("alive")).await?;
    store.put("/cluster/nodes/ab", json!(null)).await?;

    let children = store.get_childrens("/cluster/nodes/a").await?;
    assert_eq!(children, vec!["/cluster/nodes/a/state".to_string()]);

    let all = store.get_childrens("/cluster/nodes").await?;
    assert_eq!(all.len(), 2);
    Ok(())
}

#[test]
fn test_join_path() {
    assert_eq!(join_path(&["/cluster", "node_resources", "abc"]), "/cluster/node_resources/abc");
    assert_eq!(join_path(&["/cluster/", "/nodes/"]), "/cluster/nodes");
}
