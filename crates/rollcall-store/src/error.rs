use thiserror::Error;

/// Errors from remote document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document does not exist (strict updates only).
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Transport-level failure talking to the remote API.
    #[error("Remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Document body could not be encoded or decoded.
    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential file missing or unusable.
    #[error("Credential error: {message}")]
    Credentials { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create a new not-found error.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Create a new credential error.
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }
}

/// Specialized result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
