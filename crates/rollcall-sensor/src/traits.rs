//! Fingerprint sensor trait definition.
//!
//! The trait mirrors how capacitive fingerprint modules actually work:
//! the host captures an image, converts it into a feature set stored in
//! one of two on-chip slots, and either combines both slots into an
//! enrollment template or compares them for a match score. Raw template
//! bytes can be moved in and out of the slots, which is what lets the
//! agent keep its own template files and run 1:N matching host-side.
//!
//! The trait uses native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT), so it is not object-safe; use the
//! [`AnySensor`](crate::devices::AnySensor) enum wrapper where a single
//! concrete type is needed.

#![allow(async_fn_in_trait)]

use crate::error::Result;

/// Feature buffer slot on the sensor.
///
/// The capture pipeline is two-slotted: enrollment extracts two
/// consecutive captures into [`Slot::One`] and [`Slot::Two`] before
/// combining them; verification extracts the live capture into
/// [`Slot::One`] and loads each stored template into [`Slot::Two`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    /// Slot number as the hardware counts them.
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }
}

/// Outcome of a single capture attempt.
///
/// A capture attempt returns immediately; waiting for a finger is the
/// caller's loop, not the sensor's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// An image was captured and is ready for feature extraction.
    Image,

    /// Nothing on the sensor window.
    NoFinger,
}

/// Outcome of combining the two capture slots into one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateOutcome {
    /// The captures agreed; a combined template is ready for export.
    Created,

    /// The two captures were not the same finger.
    Mismatch,
}

/// Fingerprint sensor abstraction.
///
/// # Examples
///
/// ```no_run
/// use rollcall_sensor::{CaptureOutcome, FingerprintSensor, Slot};
/// use rollcall_sensor::error::Result;
///
/// async fn capture_features<S: FingerprintSensor>(sensor: &mut S) -> Result<bool> {
///     match sensor.capture_image().await? {
///         CaptureOutcome::NoFinger => Ok(false),
///         CaptureOutcome::Image => {
///             sensor.extract_features(Slot::One).await?;
///             Ok(true)
///         }
///     }
/// }
/// ```
pub trait FingerprintSensor: Send + Sync {
    /// Whether the physical sensor is attached and answering.
    async fn is_present(&self) -> bool;

    /// Attempt one image capture.
    ///
    /// Returns [`CaptureOutcome::NoFinger`] immediately when nothing is
    /// on the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is disconnected or the capture
    /// itself fails.
    async fn capture_image(&mut self) -> Result<CaptureOutcome>;

    /// Convert the last captured image into features stored in `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no captured image or the image is
    /// unusable (too smudged, too partial).
    async fn extract_features(&mut self, slot: Slot) -> Result<()>;

    /// Combine slots [`Slot::One`] and [`Slot::Two`] into one template.
    ///
    /// # Errors
    ///
    /// Returns an error only on device failure; two captures that do not
    /// agree are reported as [`TemplateOutcome::Mismatch`].
    async fn create_template(&mut self) -> Result<TemplateOutcome>;

    /// Read back the template bytes held in `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is empty or the transfer fails.
    async fn export_template(&mut self, slot: Slot) -> Result<Vec<u8>>;

    /// Load stored template bytes into `slot` for comparison.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a template this sensor
    /// understands.
    async fn load_template(&mut self, template: &[u8], slot: Slot) -> Result<()>;

    /// Compare slots [`Slot::One`] and [`Slot::Two`], returning a match
    /// score (higher is more confident).
    ///
    /// # Errors
    ///
    /// Returns an error if either slot is empty.
    async fn compare_templates(&mut self) -> Result<u16>;
}
