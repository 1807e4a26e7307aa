//! Error types for sensor operations.

/// Result type alias for sensor operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// Errors that can occur while driving the fingerprint sensor or the
/// local template store.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// Sensor is not connected or stopped answering.
    #[error("Sensor disconnected: {message}")]
    Disconnected { message: String },

    /// Image capture failed (distinct from an empty sensor window,
    /// which is a normal outcome).
    #[error("Capture failed: {message}")]
    CaptureFailed { message: String },

    /// Feature extraction from the captured image failed.
    #[error("Feature extraction failed: {message}")]
    ExtractionFailed { message: String },

    /// Template creation, export or load failed.
    #[error("Template operation failed: {message}")]
    TemplateError { message: String },

    /// Generic I/O error (template store).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SensorError {
    /// Create a new disconnected error.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::Disconnected {
            message: message.into(),
        }
    }

    /// Create a new capture error.
    pub fn capture(message: impl Into<String>) -> Self {
        Self::CaptureFailed {
            message: message.into(),
        }
    }

    /// Create a new extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            message: message.into(),
        }
    }

    /// Create a new template error.
    pub fn template(message: impl Into<String>) -> Self {
        Self::TemplateError {
            message: message.into(),
        }
    }
}
