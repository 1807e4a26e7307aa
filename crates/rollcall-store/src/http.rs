//! HTTP client for the hosted document store API.
//!
//! The remote exposes a small REST surface per collection:
//!
//! - `GET {base}/{collection}/{id}` returns the document body, 404 when
//!   absent.
//! - `PATCH {base}/{collection}/{id}` merges the JSON body into the
//!   document, creating it if absent (explicit nulls clear fields).
//! - `GET {base}/{collection}?field=value&...` returns matching rows as
//!   `[{"id": "...", "data": {...}}]`.
//!
//! Requests carry the credential file's API key as a bearer token.
//!
//! # Design Principles
//!
//! The client is a thin transport layer:
//! - **No automatic retry**: the agent's loops already decide their own
//!   retry cadence.
//! - **No connection pooling knobs**: one device, one client.
//! - **Polling watcher**: the subscription contract is served by a
//!   spawned task that re-runs the filtered query, diffs against the
//!   last observed state, and pushes changed documents; it ends when
//!   the receiver is dropped.

use crate::error::{StoreError, StoreResult};
use crate::traits::{ChangeBatch, Document, QueryFilter, RemoteStore};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between watcher polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Contents of the credential file.
///
/// The agent reads this once at startup; a missing or unreadable file is
/// a fatal startup error, not something to retry around.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreCredentials {
    /// Base URL of the document API.
    pub base_url: String,

    /// API key sent as a bearer token.
    pub api_key: String,
}

impl StoreCredentials {
    /// Load credentials from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a credential error naming the path when the file is
    /// missing, unreadable, or not the expected JSON shape.
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            StoreError::credentials(format!("cannot read {}: {error}", path.display()))
        })?;
        let credentials: StoreCredentials = serde_json::from_str(&raw).map_err(|error| {
            StoreError::credentials(format!("cannot parse {}: {error}", path.display()))
        })?;
        if credentials.base_url.trim().is_empty() {
            return Err(StoreError::credentials("base_url is empty"));
        }
        Ok(credentials)
    }
}

/// Configuration for the HTTP store client.
///
/// # Examples
///
/// ```
/// use rollcall_store::{HttpStoreConfig, StoreCredentials};
/// use std::time::Duration;
///
/// let credentials = StoreCredentials {
///     base_url: "https://records.example.net/v1".to_string(),
///     api_key: "k-123".to_string(),
/// };
/// let config = HttpStoreConfig::new(credentials)
///     .with_poll_interval(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the document API.
    pub base_url: String,

    /// API key sent as a bearer token.
    pub api_key: String,

    /// Timeout for every request.
    pub timeout: Duration,

    /// Interval between watcher polls.
    pub poll_interval: Duration,
}

impl HttpStoreConfig {
    /// Build a config from loaded credentials with default timings.
    #[must_use]
    pub fn new(credentials: StoreCredentials) -> Self {
        Self {
            base_url: credentials.base_url,
            api_key: credentials.api_key,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the watcher poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Row shape returned by the collection query endpoint.
#[derive(Debug, Deserialize)]
struct QueryRow {
    id: String,
    data: Value,
}

/// HTTP implementation of [`RemoteStore`].
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    config: HttpStoreConfig,
}

impl HttpStore {
    /// Create a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: HttpStoreConfig) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.config.base_url.trim_end_matches('/'))
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{id}", self.collection_url(collection))
    }

    /// Run the filtered collection query once.
    async fn query(&self, collection: &str, filter: &QueryFilter) -> StoreResult<Vec<Document>> {
        let mut request = self
            .client
            .get(self.collection_url(collection))
            .bearer_auth(&self.config.api_key);
        for (field, value) in filter.conditions() {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            request = request.query(&[(field.as_str(), value)]);
        }

        let rows: Vec<QueryRow> = request.send().await?.error_for_status()?.json().await?;
        Ok(rows
            .into_iter()
            .map(|row| Document::new(row.id, row.data))
            .collect())
    }
}

impl RemoteStore for HttpStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let response = self
            .client
            .get(self.document_url(collection, id))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json().await?))
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        self.client
            .patch(self.document_url(collection, id))
            .bearer_auth(&self.config.api_key)
            .json(&fields)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        // The API's PATCH merge-creates, so existence is checked first.
        if self.get(collection, id).await?.is_none() {
            return Err(StoreError::not_found(collection, id));
        }
        self.set_merge(collection, id, fields).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: QueryFilter,
    ) -> StoreResult<mpsc::UnboundedReceiver<ChangeBatch>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = self.clone();
        let collection = collection.to_string();

        tokio::spawn(async move {
            let mut last_seen: std::collections::HashMap<String, Value> =
                std::collections::HashMap::new();
            loop {
                if tx.is_closed() {
                    debug!(collection = %collection, "watcher receiver dropped, stopping poll");
                    break;
                }
                match store.query(&collection, &filter).await {
                    Ok(documents) => {
                        let mut current = std::collections::HashMap::new();
                        let mut changed = Vec::new();
                        for document in documents {
                            if last_seen.get(&document.id) != Some(&document.data) {
                                changed.push(document.clone());
                            }
                            current.insert(document.id, document.data);
                        }
                        last_seen = current;
                        if !changed.is_empty() && tx.send(changed).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(%error, collection = %collection, "change poll failed");
                    }
                }
                tokio::time::sleep(store.config.poll_interval).await;
            }
        });

        Ok(rx)
    }
}
