//! In-process store implementation for testing and development.
//!
//! Collections live in a shared map; watchers registered through
//! `subscribe` are notified synchronously from the writing call. This
//! gives tests a fully deterministic stand-in for the remote store,
//! including the merge and subscription semantics the agent depends on.

use crate::error::{StoreError, StoreResult};
use crate::traits::{ChangeBatch, Document, QueryFilter, RemoteStore};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// In-memory document store.
///
/// Cloning is cheap and every clone shares the same collections, so one
/// store can back all three agent activities in a test.
///
/// # Examples
///
/// ```
/// use rollcall_store::{MemoryStore, RemoteStore};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> rollcall_store::StoreResult<()> {
///     let store = MemoryStore::new();
///
///     store.set_merge("students", "s-001", json!({"name": "Ada"})).await?;
///     let doc = store.get("students", "s-001").await?.unwrap();
///     assert_eq!(doc["name"], "Ada");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    watchers: Vec<Watcher>,
}

#[derive(Debug)]
struct Watcher {
    collection: String,
    filter: QueryFilter,
    tx: mpsc::UnboundedSender<ChangeBatch>,
}

/// Merge `fields` into `target` one top-level field at a time. Explicit
/// nulls overwrite; fields absent from the payload are untouched.
fn merge_into(target: &mut Value, fields: &Value) {
    if let (Value::Object(target), Value::Object(updates)) = (target, fields) {
        for (key, value) in updates {
            target.insert(key.clone(), value.clone());
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
        require_existing: bool,
    ) -> StoreResult<()> {
        let mut inner = self.locked();

        let snapshot = {
            let docs = inner.collections.entry(collection.to_string()).or_default();
            if require_existing && !docs.contains_key(id) {
                return Err(StoreError::not_found(collection, id));
            }
            let doc = docs
                .entry(id.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            merge_into(doc, &fields);
            doc.clone()
        };

        // Push the changed document to every live watcher it matches;
        // watchers whose receiver is gone are dropped here.
        inner.watchers.retain(|watcher| {
            if watcher.collection != collection || !watcher.filter.matches(&snapshot) {
                return true;
            }
            watcher
                .tx
                .send(vec![Document::new(id, snapshot.clone())])
                .is_ok()
        });

        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let inner = self.locked();
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        self.write(collection, id, fields, false)
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        self.write(collection, id, fields, true)
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: QueryFilter,
    ) -> StoreResult<mpsc::UnboundedReceiver<ChangeBatch>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.locked();

        let initial: ChangeBatch = inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| filter.matches(data))
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default();
        if !initial.is_empty() {
            let _ = tx.send(initial);
        }

        inner.watchers.push(Watcher {
            collection: collection.to_string(),
            filter,
            tx,
        });
        Ok(rx)
    }
}
