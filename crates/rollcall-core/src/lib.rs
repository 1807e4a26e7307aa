//! Shared domain types for the Rollcall attendance device agent.
//!
//! This crate holds the vocabulary the rest of the workspace speaks:
//! validated identifiers, the remote document views (device, student,
//! command records), the in-memory pairing state machine, wire field
//! constants, and the tunable defaults. It performs no I/O.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
