mod errors;
pub use errors::{MetadataError, Result};

mod store;
pub use store::{KeyValueVersion, MetadataStore};

mod providers;
pub use providers::in_memory::MemoryStore;

/// Joins path segments into a store key: `join_path(&["/cluster", "nodes", "a"])` is `/cluster/nodes/a`.
pub fn join_path(parts: &[&str]) -> String {
    let mut path = String::new();
    for part in parts {
        let part = part.trim_matches('/');
        if part.is_empty() {
            continue;
        }
        path.push('/');
        path.push_str(part);
    }
    path
}

#[cfg(test)]
mod in_memory_test;
