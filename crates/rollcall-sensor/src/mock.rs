//! Mock fingerprint sensor for testing and development.
//!
//! Simulates the two-slot capture pipeline of a real fingerprint module
//! without requiring hardware. Fingers are "placed" programmatically
//! through [`MockSensorHandle`]; the sensor consumes those scripted
//! events one capture attempt at a time.

use crate::{
    Result,
    error::SensorError,
    traits::{CaptureOutcome, FingerprintSensor, Slot, TemplateOutcome},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Score the mock reports when the compared slots hold identical bytes.
pub const MOCK_MATCH_SCORE: u16 = 100;

/// Score the mock reports when the compared slots differ.
pub const MOCK_NO_MATCH_SCORE: u16 = 0;

/// Scripted capture event.
#[derive(Debug, Clone)]
enum MockCapture {
    /// A finger on the window, captured as these template bytes.
    Finger(Vec<u8>),

    /// An explicit empty read of the window.
    Empty,
}

/// Mock fingerprint sensor.
///
/// Capture attempts consume scripted events queued through the handle;
/// an empty queue reads as an empty sensor window, which is what makes
/// the agent's poll-until-finger loops drivable from tests.
///
/// # Examples
///
/// ```
/// use rollcall_sensor::mock::MOCK_MATCH_SCORE;
/// use rollcall_sensor::{CaptureOutcome, FingerprintSensor, MockSensor, Slot};
///
/// #[tokio::main]
/// async fn main() -> rollcall_sensor::Result<()> {
///     let (mut sensor, handle) = MockSensor::new();
///
///     handle.touch(vec![1, 2, 3])?;
///     assert_eq!(sensor.capture_image().await?, CaptureOutcome::Image);
///     sensor.extract_features(Slot::One).await?;
///
///     sensor.load_template(&[1, 2, 3], Slot::Two).await?;
///     assert_eq!(sensor.compare_templates().await?, MOCK_MATCH_SCORE);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSensor {
    /// Scripted capture events from the handle.
    capture_rx: mpsc::UnboundedReceiver<MockCapture>,

    /// Simulated hardware presence.
    present: Arc<AtomicBool>,

    /// Last captured image, pending feature extraction.
    captured: Option<Vec<u8>>,

    /// The two feature slots.
    slots: [Option<Vec<u8>>; 2],
}

impl MockSensor {
    /// Create a mock sensor and its control handle.
    ///
    /// The sensor starts out present.
    pub fn new() -> (Self, MockSensorHandle) {
        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        let present = Arc::new(AtomicBool::new(true));

        let sensor = Self {
            capture_rx,
            present: present.clone(),
            captured: None,
            slots: [None, None],
        };

        let handle = MockSensorHandle {
            capture_tx,
            present,
        };

        (sensor, handle)
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Vec<u8>> {
        &mut self.slots[usize::from(slot.index() - 1)]
    }

    fn slot_ref(&self, slot: Slot) -> &Option<Vec<u8>> {
        &self.slots[usize::from(slot.index() - 1)]
    }
}

impl FingerprintSensor for MockSensor {
    async fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    async fn capture_image(&mut self) -> Result<CaptureOutcome> {
        match self.capture_rx.try_recv() {
            Ok(MockCapture::Finger(bytes)) => {
                self.captured = Some(bytes);
                Ok(CaptureOutcome::Image)
            }
            Ok(MockCapture::Empty) | Err(TryRecvError::Empty) => Ok(CaptureOutcome::NoFinger),
            Err(TryRecvError::Disconnected) => {
                Err(SensorError::disconnected("mock capture channel closed"))
            }
        }
    }

    async fn extract_features(&mut self, slot: Slot) -> Result<()> {
        let image = self
            .captured
            .take()
            .ok_or_else(|| SensorError::extraction("no captured image"))?;
        *self.slot_mut(slot) = Some(image);
        Ok(())
    }

    async fn create_template(&mut self) -> Result<TemplateOutcome> {
        match (&self.slots[0], &self.slots[1]) {
            (Some(first), Some(second)) if first == second => Ok(TemplateOutcome::Created),
            (Some(_), Some(_)) => Ok(TemplateOutcome::Mismatch),
            _ => Err(SensorError::template("capture slots not populated")),
        }
    }

    async fn export_template(&mut self, slot: Slot) -> Result<Vec<u8>> {
        self.slot_ref(slot)
            .clone()
            .ok_or_else(|| SensorError::template(format!("slot {} is empty", slot.index())))
    }

    async fn load_template(&mut self, template: &[u8], slot: Slot) -> Result<()> {
        if template.is_empty() {
            return Err(SensorError::template("empty template data"));
        }
        *self.slot_mut(slot) = Some(template.to_vec());
        Ok(())
    }

    async fn compare_templates(&mut self) -> Result<u16> {
        match (&self.slots[0], &self.slots[1]) {
            (Some(first), Some(second)) => Ok(if first == second {
                MOCK_MATCH_SCORE
            } else {
                MOCK_NO_MATCH_SCORE
            }),
            _ => Err(SensorError::template("comparison slots not populated")),
        }
    }
}

/// Handle for scripting a [`MockSensor`].
///
/// Cloneable; every clone feeds the same sensor.
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    capture_tx: mpsc::UnboundedSender<MockCapture>,

    present: Arc<AtomicBool>,
}

impl MockSensorHandle {
    /// Queue a finger placement that captures as `template`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub fn touch(&self, template: Vec<u8>) -> Result<()> {
        self.capture_tx
            .send(MockCapture::Finger(template))
            .map_err(|_| SensorError::disconnected("mock sensor dropped"))
    }

    /// Queue an explicit empty read of the window.
    ///
    /// Scripts the gap between two placements so removal waits observe
    /// a clear window in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub fn release(&self) -> Result<()> {
        self.capture_tx
            .send(MockCapture::Empty)
            .map_err(|_| SensorError::disconnected("mock sensor dropped"))
    }

    /// Set simulated hardware presence.
    pub fn set_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }
}
