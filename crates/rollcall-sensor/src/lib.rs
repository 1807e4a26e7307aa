//! Fingerprint peripheral abstraction for the Rollcall attendance agent.
//!
//! This crate models the biometric sensor as a small set of async
//! capture/enroll/compare primitives and provides the on-device template
//! file store. The sensor's wire protocol (UART framing, checksums,
//! image transfer) stays behind the [`FingerprintSensor`] trait; the
//! agent only ever sees feature slots, templates, and match scores.
//!
//! # Design Philosophy
//!
//! - **Async-first**: all operations use native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Expected negatives are values, not errors**: an empty sensor
//!   window ([`CaptureOutcome::NoFinger`]) and two captures that do not
//!   form one template ([`TemplateOutcome::Mismatch`]) are ordinary
//!   protocol outcomes. Errors are reserved for the sensor actually
//!   misbehaving.
//! - **Mock for development**: [`MockSensor`] simulates the full capture
//!   pipeline and is driven programmatically through
//!   [`MockSensorHandle`], so every flow can run without hardware.
//!
//! # Example
//!
//! ```
//! use rollcall_sensor::{CaptureOutcome, FingerprintSensor, MockSensor, Slot};
//!
//! #[tokio::main]
//! async fn main() -> rollcall_sensor::Result<()> {
//!     let (mut sensor, handle) = MockSensor::new();
//!
//!     handle.touch(vec![1, 2, 3, 4])?;
//!     assert_eq!(sensor.capture_image().await?, CaptureOutcome::Image);
//!     sensor.extract_features(Slot::One).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod error;
pub mod mock;
pub mod store;
pub mod traits;

// Re-export commonly used types for convenience
pub use devices::AnySensor;
pub use error::{Result, SensorError};
pub use mock::{MockSensor, MockSensorHandle};
pub use store::TemplateStore;
pub use traits::{CaptureOutcome, FingerprintSensor, Slot, TemplateOutcome};
