//! Rollcall attendance device agent.
//!
//! Links a fingerprint sensor to a remote record store: a heartbeat loop
//! reconciles pairing state and pushes throttled health snapshots, a
//! verification loop records attendance on local fingerprint matches,
//! and a dispatcher executes remotely queued commands (enrollment,
//! pairing reset, reboot, shutdown).
//!
//! # Concurrency
//!
//! Three long-lived tasks share a handful of cloneable handles:
//!
//! ```text
//! ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │ HeartbeatReporter│   │ BiometricEngine  │   │ CommandDispatcher│
//! │ (30 s tick)      │   │ (verification)   │   │ (change batches) │
//! └──────┬───────────┘   └──────┬───────────┘   └──────┬───────────┘
//!        │   SharedPairing      │    Arc<Mutex<AnySensor>>          │
//!        └──────────┬───────────┴───────────┬──────────┘
//!                   │                       │
//!              AnyStore (clone)       TemplateStore (clone)
//! ```
//!
//! Each task owns its failure domain: errors are logged and the owning
//! loop continues; nothing propagates across tasks. Enrollment holds the
//! sensor mutex for its whole capture protocol, so verification can
//! never poll the peripheral mid-enrollment.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod heartbeat;
pub mod identity;
pub mod pairing;
pub mod power;

pub use config::AgentConfig;
pub use dispatch::CommandDispatcher;
pub use engine::{BiometricEngine, EnrollOutcome};
pub use error::{AgentError, Result};
pub use heartbeat::HeartbeatReporter;
pub use pairing::SharedPairing;
pub use power::{AnyPower, MockPower, PowerAction, PowerControl, SystemPower};
