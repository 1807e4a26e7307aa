//! Enum wrapper for sensor dispatch.
//!
//! Native `async fn` in traits (RPITIT, Edition 2024) are not
//! object-safe, so `Box<dyn FingerprintSensor>` is not available. The
//! enum wrapper provides concrete type dispatch at compile time instead,
//! which is also what lets the agent park the sensor behind one
//! `Arc<Mutex<AnySensor>>` shared by enrollment and verification.

use crate::mock::MockSensor;
use crate::traits::{CaptureOutcome, FingerprintSensor, Slot, TemplateOutcome};
use crate::Result;

/// Enum wrapper for fingerprint sensor dispatch.
///
/// # Examples
///
/// ```
/// use rollcall_sensor::{AnySensor, FingerprintSensor, MockSensor};
///
/// #[tokio::main]
/// async fn main() {
///     let (sensor, _handle) = MockSensor::new();
///     let any_sensor = AnySensor::Mock(sensor);
///     assert!(any_sensor.is_present().await);
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySensor {
    /// Mock sensor for development and testing.
    Mock(MockSensor),
    // TODO: Uart(UartSensor) once a real module driver lands behind the
    // hardware-uart feature.
}

impl FingerprintSensor for AnySensor {
    async fn is_present(&self) -> bool {
        match self {
            Self::Mock(sensor) => sensor.is_present().await,
        }
    }

    async fn capture_image(&mut self) -> Result<CaptureOutcome> {
        match self {
            Self::Mock(sensor) => sensor.capture_image().await,
        }
    }

    async fn extract_features(&mut self, slot: Slot) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.extract_features(slot).await,
        }
    }

    async fn create_template(&mut self) -> Result<TemplateOutcome> {
        match self {
            Self::Mock(sensor) => sensor.create_template().await,
        }
    }

    async fn export_template(&mut self, slot: Slot) -> Result<Vec<u8>> {
        match self {
            Self::Mock(sensor) => sensor.export_template(slot).await,
        }
    }

    async fn load_template(&mut self, template: &[u8], slot: Slot) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.load_template(template, slot).await,
        }
    }

    async fn compare_templates(&mut self) -> Result<u16> {
        match self {
            Self::Mock(sensor) => sensor.compare_templates().await,
        }
    }
}
