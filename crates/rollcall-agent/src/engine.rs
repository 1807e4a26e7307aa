//! Biometric engine: enrollment protocol and verification loop.
//!
//! Both protocols require a linked user and run against the shared
//! sensor mutex. Enrollment holds the lock for its whole capture
//! sequence; the verification loop takes it once per tick. Template
//! mismatch during enrollment and a scan with no match are expected
//! negative outcomes with their own status messages, not errors.

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::pairing::SharedPairing;
use chrono::Utc;
use rollcall_core::constants::{
    COLLECTION_STATUS, COLLECTION_STUDENTS, FIELD_ATTENDANCE, FIELD_ENROLLMENT_STATUS,
    FIELD_FINGERPRINT_STATUS, FIELD_LAST_ENROLLED, FINGERPRINT_ENROLLED, MSG_ENROLL_MISMATCH,
    MSG_ENROLL_SUCCESS, MSG_PLACE_AGAIN, MSG_PLACE_FINGER, MSG_REMOVE_FINGER,
};
use rollcall_core::{StudentId, StudentRecord, merge_field, today_key};
use rollcall_sensor::{
    AnySensor, CaptureOutcome, FingerprintSensor, Slot, TemplateOutcome, TemplateStore,
};
use rollcall_store::{AnyStore, RemoteStore};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of an enrollment run.
///
/// Exactly one of these is returned for every invocation, and the device
/// record's enrollment status ends on a terminal message whenever the
/// capture protocol actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    /// Template stored locally and the student record stamped.
    Enrolled,

    /// Mismatched captures, a step timeout, or any error along the way.
    Failed,
}

impl EnrollOutcome {
    /// Whether the enrollment succeeded.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, EnrollOutcome::Enrolled)
    }
}

/// Enrollment and verification against the shared sensor.
pub struct BiometricEngine {
    store: AnyStore,
    sensor: Arc<Mutex<AnySensor>>,
    templates: TemplateStore,
    pairing: SharedPairing,
    device_id: String,
    config: Arc<AgentConfig>,
}

impl BiometricEngine {
    /// Create an engine for `device_id`.
    pub fn new(
        store: AnyStore,
        sensor: Arc<Mutex<AnySensor>>,
        templates: TemplateStore,
        pairing: SharedPairing,
        device_id: String,
        config: Arc<AgentConfig>,
    ) -> Self {
        Self {
            store,
            sensor,
            templates,
            pairing,
            device_id,
            config,
        }
    }

    /// Publish a human-readable enrollment status message.
    ///
    /// Best-effort: a failed banner write is logged and the protocol
    /// carries on.
    async fn publish_status(&self, message: &str) {
        let fields = merge_field(FIELD_ENROLLMENT_STATUS, Value::String(message.to_string()));
        if let Err(error) = self
            .store
            .set_merge(COLLECTION_STATUS, &self.device_id, fields)
            .await
        {
            warn!(%error, "failed to publish enrollment status");
        }
    }

    /// Run the two-capture enrollment protocol for `student`.
    ///
    /// Requires a linked user and a present sensor; absent either, the
    /// protocol is refused without touching the enrollment status field.
    pub async fn enroll(&self, student: &StudentId) -> EnrollOutcome {
        if !self.pairing.is_linked().await {
            warn!(student = %student, "enrollment refused: no linked user");
            return EnrollOutcome::Failed;
        }

        // Exclusive sensor access for the whole capture sequence keeps
        // the verification loop off the peripheral.
        let mut sensor = self.sensor.lock().await;
        if !sensor.is_present().await {
            warn!(student = %student, "enrollment refused: sensor not present");
            return EnrollOutcome::Failed;
        }

        match self.run_protocol(&mut sensor, student).await {
            Ok(TemplateOutcome::Created) => {
                self.publish_status(MSG_ENROLL_SUCCESS).await;
                info!(student = %student, "enrollment complete");
                EnrollOutcome::Enrolled
            }
            Ok(TemplateOutcome::Mismatch) => {
                self.publish_status(MSG_ENROLL_MISMATCH).await;
                warn!(student = %student, "enrollment captures did not match");
                EnrollOutcome::Failed
            }
            Err(error) => {
                self.publish_status(&format!("Error: {error}")).await;
                warn!(student = %student, %error, "enrollment failed");
                EnrollOutcome::Failed
            }
        }
    }

    /// The capture sequence itself. A template file is written iff this
    /// returns `Ok(Created)`.
    async fn run_protocol(
        &self,
        sensor: &mut AnySensor,
        student: &StudentId,
    ) -> Result<TemplateOutcome> {
        self.publish_status(MSG_PLACE_FINGER).await;
        self.wait_for_finger(sensor, "first capture").await?;
        sensor.extract_features(Slot::One).await?;

        self.publish_status(MSG_REMOVE_FINGER).await;
        tokio::time::sleep(self.config.enroll_pause).await;
        self.wait_for_removal(sensor).await?;

        self.publish_status(MSG_PLACE_AGAIN).await;
        self.wait_for_finger(sensor, "second capture").await?;
        sensor.extract_features(Slot::Two).await?;

        match sensor.create_template().await? {
            TemplateOutcome::Mismatch => Ok(TemplateOutcome::Mismatch),
            TemplateOutcome::Created => {
                let template = sensor.export_template(Slot::One).await?;

                let mut fields = Map::new();
                fields.insert(
                    FIELD_FINGERPRINT_STATUS.to_string(),
                    json!(FINGERPRINT_ENROLLED),
                );
                fields.insert(
                    FIELD_LAST_ENROLLED.to_string(),
                    json!(Utc::now().to_rfc3339()),
                );
                self.store
                    .update(COLLECTION_STUDENTS, student.as_str(), Value::Object(fields))
                    .await?;

                // Last fallible step: the file exists iff the result is
                // a success.
                self.templates.write(student, &template).await?;
                Ok(TemplateOutcome::Created)
            }
        }
    }

    /// Poll until a finger is captured, bounded by the step timeout.
    async fn wait_for_finger(&self, sensor: &mut AnySensor, step: &'static str) -> Result<()> {
        tokio::time::timeout(self.config.enroll_step_timeout, async {
            loop {
                if sensor.capture_image().await? == CaptureOutcome::Image {
                    return Ok::<(), AgentError>(());
                }
                tokio::time::sleep(self.config.capture_poll_interval).await;
            }
        })
        .await
        .map_err(|_| AgentError::StepTimeout { step })?
    }

    /// Poll until the sensor window reads clear, bounded by the step
    /// timeout.
    async fn wait_for_removal(&self, sensor: &mut AnySensor) -> Result<()> {
        tokio::time::timeout(self.config.enroll_step_timeout, async {
            loop {
                if sensor.capture_image().await? == CaptureOutcome::NoFinger {
                    return Ok::<(), AgentError>(());
                }
                tokio::time::sleep(self.config.capture_poll_interval).await;
            }
        })
        .await
        .map_err(|_| AgentError::StepTimeout {
            step: "finger removal",
        })?
    }

    /// Continuous verification loop. Never returns; every error is
    /// confined to its tick.
    pub async fn run_verification(self: Arc<Self>) {
        info!("verification loop started");
        loop {
            tokio::time::sleep(self.config.idle_scan_interval).await;
            if !self.pairing.is_linked().await {
                continue;
            }
            match self.scan_once().await {
                Ok(Some(student)) => match self.mark_attendance(&student).await {
                    // Cooling down after a recorded match keeps one
                    // physical contact from triggering twice.
                    Ok(true) => tokio::time::sleep(self.config.match_cooldown).await,
                    Ok(false) => {}
                    Err(error) => warn!(%error, student = %student, "attendance write failed"),
                },
                Ok(None) => {}
                Err(error) => warn!(%error, "verification tick failed"),
            }
        }
    }

    /// One capture-and-match attempt.
    ///
    /// Returns `Ok(None)` when the window is empty, the capture is not
    /// usable, or no stored template reaches the score threshold. The
    /// scan walks templates in sorted student-id order and accepts the
    /// first hit.
    pub async fn scan_once(&self) -> Result<Option<StudentId>> {
        let mut sensor = self.sensor.lock().await;
        if !sensor.is_present().await {
            return Ok(None);
        }
        if sensor.capture_image().await? != CaptureOutcome::Image {
            return Ok(None);
        }
        if let Err(error) = sensor.extract_features(Slot::One).await {
            // An unusable capture is a skipped tick, not a failure.
            debug!(%error, "live capture not usable");
            return Ok(None);
        }

        for student in self.templates.list().await? {
            let stored = self.templates.read(&student).await?;
            sensor.load_template(&stored, Slot::Two).await?;
            let score = sensor.compare_templates().await?;
            if score >= self.config.match_threshold {
                info!(student = %student, score = u64::from(score), "fingerprint match");
                return Ok(Some(student));
            }
        }
        Ok(None)
    }

    /// Mark `student` present for today.
    ///
    /// Returns `Ok(true)` when an attendance entry was written,
    /// `Ok(false)` when today is already marked (no write) or the
    /// student record no longer exists remotely.
    pub async fn mark_attendance(&self, student: &StudentId) -> Result<bool> {
        let Some(value) = self.store.get(COLLECTION_STUDENTS, student.as_str()).await? else {
            debug!(student = %student, "matched a template with no student record");
            return Ok(false);
        };
        let mut record = StudentRecord::from_value(&value)?;

        let today = today_key();
        if !record.mark_present(&today) {
            return Ok(false);
        }

        let attendance: Map<String, Value> = record
            .attendance
            .iter()
            .map(|(date, mark)| (date.clone(), Value::String(mark.clone())))
            .collect();
        self.store
            .update(
                COLLECTION_STUDENTS,
                student.as_str(),
                merge_field(FIELD_ATTENDANCE, Value::Object(attendance)),
            )
            .await?;
        info!(student = %student, name = %record.name, date = %today, "attendance marked");
        Ok(true)
    }
}
