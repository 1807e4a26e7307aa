//! Constants shared across the Rollcall workspace.
//!
//! This module centralizes the remote collection names, the wire field
//! names used in remote documents, the agent's tunable defaults, and the
//! human-readable status strings published during enrollment. Keeping the
//! wire vocabulary in one place means the dashboard and the device can
//! never drift apart one field at a time.
//!
//! # Wire Conventions
//!
//! Remote documents are plain JSON objects with camelCase field names.
//! Merge writes distinguish three presence states per field:
//!
//! | State | Meaning |
//! |-------|---------|
//! | present with value | field is set/overwritten |
//! | present as `null` | field is explicitly cleared |
//! | absent | field is left untouched by the merge |
//!
//! The health snapshot relies on all three (see
//! [`HealthSnapshot`](crate::types::HealthSnapshot)).

// ============================================================================
// Remote Collections
// ============================================================================

/// Collection of device records, keyed by device identifier.
///
/// One document per physical device. Written by the heartbeat reporter
/// (health fields) and the command dispatcher (pairing/enrollment fields);
/// read by the dashboard that pairs and monitors devices.
pub const COLLECTION_STATUS: &str = "system_status";

/// Collection of student records, keyed by student identifier.
///
/// Created and maintained by the dashboard; the device only stamps
/// enrollment state and attendance entries into existing documents.
pub const COLLECTION_STUDENTS: &str = "students";

/// Collection of transient command records addressed to devices.
///
/// Commands are created externally as `pending` and consumed exactly once
/// by the dispatcher of the matching device.
pub const COLLECTION_COMMANDS: &str = "kiosk_commands";

// ============================================================================
// Wire Field Names
// ============================================================================

/// Device record: last heartbeat timestamp (RFC 3339).
pub const FIELD_LAST_ONLINE: &str = "lastOnline";

/// Device record: liveness status (always `"online"` when written).
pub const FIELD_STATUS: &str = "status";

/// Device record: whether the fingerprint sensor is attached and answering.
pub const FIELD_HARDWARE_READY: &str = "hardwareReady";

/// Device record: count of locally stored fingerprint templates.
pub const FIELD_TEMPLATES_STORED: &str = "templatesStored";

/// Device record and command record: the device identifier.
pub const FIELD_DEVICE_ID: &str = "deviceId";

/// Device record: pairing code shown to users while the device is unlinked.
///
/// Non-null only while [`FIELD_USER_ID`] is null.
pub const FIELD_PAIRING_TOKEN: &str = "pairingToken";

/// Device record: CPU temperature in degrees Celsius.
///
/// Only written when the reading moved at least
/// [`TEMP_REPORT_THRESHOLD`] since the last reported value.
pub const FIELD_CPU_TEMP: &str = "cpuTemp";

/// Device record: human-readable enrollment progress/terminal message.
pub const FIELD_ENROLLMENT_STATUS: &str = "enrollmentStatus";

/// Device record: account identifier this device is linked to.
pub const FIELD_USER_ID: &str = "userId";

/// Student record: display name.
pub const FIELD_NAME: &str = "name";

/// Student record: enrollment marker (see [`FINGERPRINT_ENROLLED`]).
pub const FIELD_FINGERPRINT_STATUS: &str = "fingerprintStatus";

/// Student record: timestamp of the last successful enrollment (RFC 3339).
pub const FIELD_LAST_ENROLLED: &str = "lastEnrolled";

/// Student record: map of `YYYY-MM-DD` date keys to [`PRESENT`].
pub const FIELD_ATTENDANCE: &str = "attendance";

/// Command record: command type discriminator.
pub const FIELD_TYPE: &str = "type";

/// Command record: enrollment target (required iff type is `ENROLL`).
pub const FIELD_STUDENT_ID: &str = "studentId";

// ============================================================================
// Wire Values
// ============================================================================

/// Value written into a student's attendance map for an attended date.
pub const PRESENT: &str = "present";

/// Value of [`FIELD_FINGERPRINT_STATUS`] once a template exists on-device.
pub const FINGERPRINT_ENROLLED: &str = "enrolled";

// ============================================================================
// Heartbeat Defaults
// ============================================================================

/// Default interval between health snapshot writes.
///
/// # Value: 30 seconds
///
/// Chosen to keep the remote write volume low while still letting the
/// dashboard distinguish an offline device from a slow one.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Minimum CPU temperature movement that warrants a report.
///
/// Readings closer than this to the last *reported* value are omitted
/// from the snapshot entirely. Bandwidth policy, not correctness.
///
/// # Value: 0.5 degrees Celsius
pub const TEMP_REPORT_THRESHOLD: f64 = 0.5;

// ============================================================================
// Pairing
// ============================================================================

/// Length of the numeric pairing token shown to users while unlinked.
pub const PAIRING_TOKEN_LENGTH: usize = 6;

/// Prefix marking a device identifier as session-scoped (not a hardware
/// serial). Applied when `/proc/cpuinfo` yields no usable serial.
pub const UNSTABLE_ID_PREFIX: &str = "DEV_PI_";

/// Random suffix length appended to [`UNSTABLE_ID_PREFIX`].
pub const UNSTABLE_ID_SUFFIX_LEN: usize = 8;

// ============================================================================
// Biometric Engine Defaults
// ============================================================================

/// Minimum comparison score accepted as a fingerprint match.
///
/// Scan order is sorted by student id and the first template reaching
/// this score wins (first-hit, not best-of).
///
/// # Value: 50
pub const DEFAULT_MATCH_THRESHOLD: u16 = 50;

/// Verification loop tick interval while nothing is on the sensor.
///
/// # Value: 500 ms
pub const IDLE_SCAN_INTERVAL_MS: u64 = 500;

/// Pause after a successful match before scanning resumes, so one
/// physical contact does not trigger twice.
///
/// # Value: 5 seconds
pub const MATCH_COOLDOWN_SECS: u64 = 5;

/// Poll interval for the enrollment capture/removal busy-waits.
pub const CAPTURE_POLL_INTERVAL_MS: u64 = 100;

/// Upper bound on each enrollment wait (first capture, finger removal,
/// second capture). Expiry fails the enrollment cleanly instead of
/// blocking the dispatcher forever.
///
/// # Value: 30 seconds
pub const DEFAULT_ENROLL_STEP_TIMEOUT_SECS: u64 = 30;

/// Grace period after asking the user to lift their finger, before the
/// removal wait starts polling.
pub const DEFAULT_ENROLL_PAUSE_SECS: u64 = 2;

// ============================================================================
// Command Dispatch Defaults
// ============================================================================

/// Delay between acknowledging a REBOOT/SHUTDOWN command and invoking
/// the OS action, giving the status write time to reach the remote.
///
/// # Value: 3 seconds
pub const DEFAULT_POWER_DELAY_SECS: u64 = 3;

// ============================================================================
// Host Paths
// ============================================================================

/// Default directory for local fingerprint template files.
pub const DEFAULT_TEMPLATES_DIR: &str = "fingerprint_templates";

/// Default path of the remote store credential file (fatal if absent).
pub const DEFAULT_CREDENTIALS_FILE: &str = "service_account.json";

/// Kernel file carrying the board serial number.
pub const CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Kernel thermal zone file (millidegrees Celsius).
pub const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

// ============================================================================
// Enrollment Status Messages
// ============================================================================

/// First capture prompt.
pub const MSG_PLACE_FINGER: &str = "Place finger on sensor...";

/// Prompt between the two captures.
pub const MSG_REMOVE_FINGER: &str = "Remove finger...";

/// Second capture prompt.
pub const MSG_PLACE_AGAIN: &str = "Place same finger again...";

/// Terminal message on success.
pub const MSG_ENROLL_SUCCESS: &str = "Enrollment successful";

/// Terminal message when the two captures do not form one template.
pub const MSG_ENROLL_MISMATCH: &str = "Fail: fingers did not match";
