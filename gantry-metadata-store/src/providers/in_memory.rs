use crate::{
    errors::Result,
    store::{KeyValueVersion, MetadataStore},
    MetadataError,
};

use async_trait::async_trait;
use dashmap::{mapref::one::RefMut, DashMap};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct VersionedValue {
    value: Value,
    version: i64,
}

/// MemoryStore is an in-memory key-value store implementing the MetadataStore trait.
///
/// Keys are grouped into tables by their first two path segments
/// (`/cluster/node_resources/{node_id}` lives in table `/cluster/node_resources`).
/// Every put bumps the version of the key, starting at 1.
/// Nothing survives a restart, so it backs tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, BTreeMap<String, VersionedValue>>>,
}

fn split_path(path: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = path.split('/').collect();

    // empty, namespace, table
    if parts.len() < 3 || !parts[0].is_empty() {
        return Err(MetadataError::InvalidArguments(format!(
            "Path must have at least 3 segments: {}",
            path
        )));
    }

    Ok((parts[..3].join("/"), parts[3..].join("/")))
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Arc::new(DashMap::new()),
        }
    }

    fn get_map(&self, table: &str) -> RefMut<'_, String, BTreeMap<String, VersionedValue>> {
        self.inner.entry(table.to_owned()).or_default()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let (table, key) = split_path(path)?;

        Ok(self
            .inner
            .get(&table)
            .and_then(|bmap| bmap.get(&key).map(|entry| entry.value.clone())))
    }

    // Returns full paths, as a remote backend would
    async fn get_childrens(&self, path: &str) -> Result<Vec<String>> {
        let (table, minimum_path) = split_path(path)?;

        let mut child_paths = Vec::new();
        if let Some(bmap_ref) = self.inner.get(&table) {
            for key in bmap_ref.keys() {
                let is_child = if minimum_path.is_empty() {
                    !key.is_empty()
                } else {
                    key.len() > minimum_path.len()
                        && key.starts_with(&minimum_path)
                        && key.as_bytes()[minimum_path.len()] == b'/'
                };
                if is_child {
                    child_paths.push(format!("{}/{}", table, key));
                }
            }
        }
        Ok(child_paths)
    }

    async fn put(&self, path: &str, value: Value) -> Result<()> {
        let (table, key) = split_path(path)?;

        if key.is_empty() {
            return Err(MetadataError::InvalidArguments(format!(
                "Path must have a key component: {}",
                path
            )));
        }

        let mut bmap = self.get_map(&table);
        let version = bmap.get(&key).map_or(1, |entry| entry.version + 1);
        bmap.insert(key, VersionedValue { value, version });

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let (table, key) = split_path(path)?;

        if key.is_empty() {
            return Err(MetadataError::InvalidArguments(format!(
                "Path must have a key component: {}",
                path
            )));
        }

        if let Some(mut bmap) = self.inner.get_mut(&table) {
            bmap.remove(&key);
        }

        Ok(())
    }

    async fn get_bulk(&self, prefix: &str) -> Result<Vec<KeyValueVersion>> {
        let (table, suffix) = split_path(prefix)?;

        let mut out: Vec<KeyValueVersion> = Vec::new();
        if let Some(bmap_ref) = self.inner.get(&table) {
            for (k, entry) in bmap_ref.iter() {
                if k.starts_with(&suffix) {
                    out.push(KeyValueVersion {
                        key: format!("{}/{}", table, k),
                        value: serde_json::to_vec(&entry.value)?,
                        version: entry.version,
                    });
                }
            }
        }
        Ok(out)
    }
}
