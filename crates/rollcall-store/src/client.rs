//! Enum wrapper for store client dispatch.
//!
//! Native `async fn` in traits (RPITIT, Edition 2024) are not
//! object-safe, so `Box<dyn RemoteStore>` is not available. The agent's
//! three activities instead share clones of one concrete [`AnyStore`].

use crate::error::StoreResult;
use crate::http::HttpStore;
use crate::memory::MemoryStore;
use crate::traits::{ChangeBatch, QueryFilter, RemoteStore};
use serde_json::Value;
use tokio::sync::mpsc;

/// Enum wrapper for remote store dispatch.
///
/// # Examples
///
/// ```
/// use rollcall_store::{AnyStore, MemoryStore, RemoteStore};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> rollcall_store::StoreResult<()> {
///     let store = AnyStore::Memory(MemoryStore::new());
///     store.set_merge("students", "s-001", json!({"name": "Ada"})).await?;
///     assert!(store.get("students", "s-001").await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyStore {
    /// In-process store for development and testing.
    Memory(MemoryStore),

    /// Client for the hosted document API.
    Http(HttpStore),
}

impl RemoteStore for AnyStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        match self {
            Self::Memory(store) => store.get(collection, id).await,
            Self::Http(store) => store.get(collection, id).await,
        }
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        match self {
            Self::Memory(store) => store.set_merge(collection, id, fields).await,
            Self::Http(store) => store.set_merge(collection, id, fields).await,
        }
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        match self {
            Self::Memory(store) => store.update(collection, id, fields).await,
            Self::Http(store) => store.update(collection, id, fields).await,
        }
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: QueryFilter,
    ) -> StoreResult<mpsc::UnboundedReceiver<ChangeBatch>> {
        match self {
            Self::Memory(store) => store.subscribe(collection, filter).await,
            Self::Http(store) => store.subscribe(collection, filter).await,
        }
    }
}
