//! Remote store trait and query types.

#![allow(async_fn_in_trait)]

use crate::error::StoreResult;
use serde_json::Value;
use tokio::sync::mpsc;

/// A document together with its id, as delivered by subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id within its collection.
    pub id: String,

    /// Document body.
    pub data: Value,
}

impl Document {
    /// Create a new document.
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// One delivery of changed documents.
pub type ChangeBatch = Vec<Document>;

/// Equality filter over top-level document fields.
///
/// # Examples
///
/// ```
/// use rollcall_store::QueryFilter;
/// use serde_json::json;
///
/// let filter = QueryFilter::new()
///     .field_eq("deviceId", "10000000deadbeef")
///     .field_eq("status", "pending");
///
/// assert!(filter.matches(&json!({
///     "deviceId": "10000000deadbeef",
///     "status": "pending",
///     "type": "REBOOT",
/// })));
/// assert!(!filter.matches(&json!({
///     "deviceId": "10000000deadbeef",
///     "status": "completed",
/// })));
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    conditions: Vec<(String, Value)>,
}

impl QueryFilter {
    /// Create an empty filter (matches every document).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Whether `data` satisfies every condition.
    #[must_use]
    pub fn matches(&self, data: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }

    /// The equality conditions, in insertion order.
    #[must_use]
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }
}

/// Remote key-document store boundary.
///
/// This trait uses native async trait methods (Edition 2024 RPITIT); use
/// [`AnyStore`](crate::client::AnyStore) where one concrete, cloneable
/// client type is needed across tasks.
pub trait RemoteStore: Send + Sync {
    /// Fetch a document, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Merge `fields` into the document, creating it if absent.
    ///
    /// Only the top-level fields present in `fields` are touched;
    /// explicit nulls clear, omissions leave the stored value alone.
    async fn set_merge(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()>;

    /// Merge `fields` into an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) when
    /// the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()>;

    /// Watch documents matching `filter`.
    ///
    /// Delivers an initial batch of matching documents, then a batch per
    /// observed change, until the receiver is dropped.
    async fn subscribe(
        &self,
        collection: &str,
        filter: QueryFilter,
    ) -> StoreResult<mpsc::UnboundedReceiver<ChangeBatch>>;
}
