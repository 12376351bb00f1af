use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{join_path, segments, HierarchicalStore};

/// In-process JSON tree with the same path semantics as the remote store.
/// Used by tests and local runs without a backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    root: Arc<RwLock<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_data(Value::Null)
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            root: Arc::new(RwLock::new(data)),
        }
    }

    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn write_at(node: &mut Value, path: &[&str], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    if let Value::Object(map) = node {
        if rest.is_empty() {
            if value.is_null() {
                map.remove(*head);
            } else {
                map.insert((*head).to_string(), value);
            }
        } else {
            let child = map.entry((*head).to_string()).or_insert(Value::Null);
            write_at(child, rest, value);
            if is_empty_node(child) {
                map.remove(*head);
            }
        }
    }
}

#[async_trait]
impl HierarchicalStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let parts = segments(path)?;
        let root = self.root.read().await;

        let mut node = &*root;
        for part in parts {
            match node.get(part) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }

        Ok(if is_empty_node(node) { None } else { Some(node.clone()) })
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let parts = segments(path)?;
        let mut root = self.root.write().await;
        write_at(&mut root, &parts, value);
        Ok(())
    }

    async fn update(&self, path: &str, values: Map<String, Value>) -> Result<(), StoreError> {
        let targets = values
            .into_iter()
            .map(|(key, value)| {
                let full = join_path(&[path, &key]);
                segments(&full)?;
                Ok((full, value))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        // Validate everything first so a bad key leaves the tree untouched.
        let mut root = self.root.write().await;
        for (full, value) in targets {
            let parts = segments(&full)?;
            write_at(&mut root, &parts, value);
        }
        Ok(())
    }
}
