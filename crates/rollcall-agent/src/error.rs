use thiserror::Error;

/// Errors from the agent's activities.
///
/// All of these are transient from the process's point of view: they are
/// logged by the owning loop (and fail the command being handled, if
/// any), never crash the process, and never cross into another activity.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Peripheral failure.
    #[error("Sensor error: {0}")]
    Sensor(#[from] rollcall_sensor::SensorError),

    /// Remote store failure.
    #[error("Store error: {0}")]
    Store(#[from] rollcall_store::StoreError),

    /// Domain validation or document decoding failure.
    #[error(transparent)]
    Core(#[from] rollcall_core::Error),

    /// An enrollment wait expired.
    #[error("Timed out waiting for {step}")]
    StepTimeout { step: &'static str },

    /// The OS power command returned a failure status.
    #[error("Power command exited with status {code:?}")]
    PowerCommand { code: Option<i32> },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
