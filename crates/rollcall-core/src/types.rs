use crate::{
    Result,
    constants::{
        FIELD_CPU_TEMP, FIELD_DEVICE_ID, FIELD_HARDWARE_READY, FIELD_LAST_ONLINE,
        FIELD_PAIRING_TOKEN, FIELD_STATUS, FIELD_STUDENT_ID, FIELD_TEMPLATES_STORED,
        PAIRING_TOKEN_LENGTH, PRESENT,
    },
    error::Error,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use subtle::ConstantTimeEq;

/// Student identifier.
///
/// Used both as the remote document key and as the local template file
/// stem, so the character set is restricted to names that are safe on a
/// filesystem: ASCII alphanumerics, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Create a new student id with validation.
    ///
    /// The id is trimmed before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidStudentId` if the id is empty or contains
    /// characters outside `[A-Za-z0-9_-]`.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::InvalidStudentId("empty id".to_string()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::InvalidStudentId(format!(
                "id must contain only ASCII alphanumerics, '-' or '_', got {id:?}"
            )));
        }
        Ok(StudentId(id.to_string()))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StudentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StudentId::new(s)
    }
}

/// Pairing token (fixed-length numeric code).
///
/// Shown to a user to link the device to their account; present on the
/// device record only while the device is unlinked.
///
/// # Security
/// This type implements constant-time comparison to prevent timing
/// attacks when the token is checked during pairing.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairingToken(String);

impl PairingToken {
    /// Create a pairing token with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidPairingToken` if the token is not exactly
    /// [`PAIRING_TOKEN_LENGTH`] ASCII digits.
    pub fn new(token: &str) -> Result<Self> {
        if token.len() != PAIRING_TOKEN_LENGTH || !token.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidPairingToken(format!(
                "token must be {PAIRING_TOKEN_LENGTH} digits, got {token:?}"
            )));
        }
        Ok(PairingToken(token.to_string()))
    }

    /// Generate a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let digits: String = (0..PAIRING_TOKEN_LENGTH)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        PairingToken(digits)
    }

    /// Get the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairingToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PairingToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PairingToken::new(s)
    }
}

/// Constant-time comparison implementation for PairingToken
///
/// This prevents timing attacks by ensuring comparison takes the same
/// time regardless of where the strings differ.
impl PartialEq for PairingToken {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

/// Hash implementation for PairingToken
///
/// Implements standard hashing for use in hash-based collections.
impl std::hash::Hash for PairingToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Device liveness status as written in health snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// The device is up and reporting.
    Online,
}

/// Remote command type.
///
/// Wire spellings are exact: `ENROLL`, `REBOOT`, `SHUTDOWN`,
/// `RESET_PAIRING`. Any other string fails deserialization, which the
/// dispatcher treats as an unrecognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    /// Run the enrollment capture protocol for a student.
    Enroll,

    /// Acknowledge, then reboot the host.
    Reboot,

    /// Acknowledge, then power the host off.
    Shutdown,

    /// Clear the device's linked user and pairing token.
    ResetPairing,
}

impl CommandType {
    /// Wire spelling of this command type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::Enroll => "ENROLL",
            CommandType::Reboot => "REBOOT",
            CommandType::Shutdown => "SHUTDOWN",
            CommandType::ResetPairing => "RESET_PAIRING",
        }
    }

    /// Returns `true` for commands that end the process via an OS power
    /// action.
    #[must_use]
    pub fn is_power_action(self) -> bool {
        matches!(self, CommandType::Reboot | CommandType::Shutdown)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a command record.
///
/// Created externally as `pending`; transitions monotonically to exactly
/// one of `completed` or `failed`, never both, never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Completed,
    Failed,
}

impl CommandStatus {
    /// Wire spelling of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CommandStatus::Pending => "pending",
            CommandStatus::Completed => "completed",
            CommandStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A command document addressed to a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Target device identifier.
    #[serde(rename = "deviceId")]
    pub device_id: String,

    /// Command type discriminator.
    #[serde(rename = "type")]
    pub kind: CommandType,

    /// Lifecycle status.
    pub status: CommandStatus,

    /// Enrollment target, required iff `kind` is [`CommandType::Enroll`].
    #[serde(rename = "studentId", default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
}

impl CommandRecord {
    /// Decode a command record from a raw document.
    ///
    /// # Errors
    /// Returns `Error::MalformedDocument` when required fields are absent
    /// or the command type is not one this agent understands.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// The validated enrollment target.
    ///
    /// # Errors
    /// Returns `Error::MissingField` when `studentId` is absent, or a
    /// validation error when it is not a usable id.
    pub fn enroll_target(&self) -> Result<StudentId> {
        let raw = self
            .student_id
            .as_deref()
            .ok_or_else(|| Error::MissingField(FIELD_STUDENT_ID.to_string()))?;
        StudentId::new(raw)
    }
}

/// Read view of a device record.
///
/// Only the fields the agent consumes are decoded; everything else in the
/// document is left to the remote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceRecord {
    /// Account this device is linked to, if any.
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,

    /// Advertised pairing token, if any.
    #[serde(rename = "pairingToken", default)]
    pub pairing_token: Option<String>,

    /// Last published enrollment status message.
    #[serde(rename = "enrollmentStatus", default)]
    pub enrollment_status: Option<String>,
}

impl DeviceRecord {
    /// Decode a device record from a raw document.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// Read/modify view of a student record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Enrollment marker.
    #[serde(rename = "fingerprintStatus", default)]
    pub fingerprint_status: Option<String>,

    /// Attendance map: `YYYY-MM-DD` date key to `"present"`.
    #[serde(default)]
    pub attendance: BTreeMap<String, String>,
}

impl StudentRecord {
    /// Decode a student record from a raw document.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Mark the student present for `date`.
    ///
    /// Returns `false` when the date is already marked, in which case the
    /// map is unchanged and no write-back is needed. At most one entry
    /// exists per calendar date; entries are never removed.
    pub fn mark_present(&mut self, date: &str) -> bool {
        if self.attendance.get(date).is_some_and(|v| v == PRESENT) {
            return false;
        }
        self.attendance
            .insert(date.to_string(), PRESENT.to_string());
        true
    }
}

/// Attendance map key for a calendar date.
#[must_use]
pub fn attendance_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Attendance map key for today, in the device's local calendar.
#[must_use]
pub fn today_key() -> String {
    attendance_key(Local::now().date_naive())
}

/// Build a one-field merge map.
#[must_use]
pub fn merge_field(field: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(field.to_string(), value);
    Value::Object(map)
}

/// One heartbeat's worth of device health fields.
///
/// Serialized by hand into a merge map because two fields carry
/// non-uniform presence semantics: `pairingToken` must be an explicit
/// null once a user is linked (clearing the remote field), while
/// `cpuTemp` must be omitted entirely when the reading has not moved
/// past the report threshold (leaving the remote field untouched).
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    /// Snapshot timestamp.
    pub last_online: DateTime<Utc>,

    /// Liveness status.
    pub status: DeviceStatus,

    /// Whether the sensor is attached and answering.
    pub hardware_ready: bool,

    /// Count of locally stored templates.
    pub templates_stored: usize,

    /// Device identifier.
    pub device_id: String,

    /// Token to advertise; `None` writes an explicit null.
    pub pairing_token: Option<PairingToken>,

    /// Temperature to report; `None` omits the field.
    pub cpu_temp: Option<f64>,
}

impl HealthSnapshot {
    /// The merge map to write into the device record.
    #[must_use]
    pub fn merge_fields(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            FIELD_LAST_ONLINE.to_string(),
            json!(self.last_online.to_rfc3339()),
        );
        map.insert(FIELD_STATUS.to_string(), json!(self.status));
        map.insert(FIELD_HARDWARE_READY.to_string(), json!(self.hardware_ready));
        map.insert(
            FIELD_TEMPLATES_STORED.to_string(),
            json!(self.templates_stored),
        );
        map.insert(FIELD_DEVICE_ID.to_string(), json!(self.device_id));
        map.insert(
            FIELD_PAIRING_TOKEN.to_string(),
            match &self.pairing_token {
                Some(token) => json!(token.as_str()),
                None => Value::Null,
            },
        );
        if let Some(temp) = self.cpu_temp {
            map.insert(FIELD_CPU_TEMP.to_string(), json!(temp));
        }
        Value::Object(map)
    }
}

/// Pairing phase, derived from the in-memory state.
///
/// Exactly one of `{linked, unlinked-with-token, unlinked-without-token}`
/// holds at any observed instant; the phase is re-derived from the remote
/// record each heartbeat rather than tracked as its own variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairingPhase {
    /// No linked user and no token minted yet.
    UnpairedNoToken,

    /// No linked user; a token is being advertised.
    UnpairedWithToken,

    /// A user is linked; biometric operations are enabled.
    Paired,
}

impl fmt::Display for PairingPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let phase = match self {
            PairingPhase::UnpairedNoToken => "unpaired",
            PairingPhase::UnpairedWithToken => "unpaired (token ready)",
            PairingPhase::Paired => "paired",
        };
        write!(f, "{phase}")
    }
}

/// In-memory pairing state.
///
/// Owned by the heartbeat reporter, which refreshes it from the device
/// record each tick; the biometric engine reads only `linked_user_id` as
/// its gate.
#[derive(Debug, Clone, Default)]
pub struct PairingState {
    /// Account identifier currently linked to this device.
    pub linked_user_id: Option<String>,

    /// Token minted or adopted while unlinked.
    pub pairing_token: Option<PairingToken>,

    /// Temperature last actually sent to the remote.
    pub last_reported_temp: f64,
}

impl PairingState {
    /// Derive the current phase.
    #[must_use]
    pub fn phase(&self) -> PairingPhase {
        match (&self.linked_user_id, &self.pairing_token) {
            (Some(_), _) => PairingPhase::Paired,
            (None, Some(_)) => PairingPhase::UnpairedWithToken,
            (None, None) => PairingPhase::UnpairedNoToken,
        }
    }

    /// Whether a user is linked.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.linked_user_id.is_some()
    }

    /// Adopt the remote record's pairing fields. The remote is
    /// authoritative; a token the record carries in an unexpected shape
    /// is treated as absent and reminted on the next tick.
    pub fn apply_record(&mut self, record: &DeviceRecord) {
        self.linked_user_id = record.user_id.clone();
        self.pairing_token = record
            .pairing_token
            .as_deref()
            .and_then(|t| PairingToken::new(t).ok());
    }

    /// Mint a token when neither a linked user nor a token exists.
    /// Returns the phase after the (possible) mint.
    pub fn ensure_token(&mut self) -> PairingPhase {
        if self.linked_user_id.is_none() && self.pairing_token.is_none() {
            self.pairing_token = Some(PairingToken::generate());
        }
        self.phase()
    }

    /// Token to advertise in a health snapshot: the minted token while
    /// unlinked, `None` (an explicit clear) once a user is linked.
    #[must_use]
    pub fn advertised_token(&self) -> Option<PairingToken> {
        if self.linked_user_id.is_none() {
            self.pairing_token.clone()
        } else {
            None
        }
    }

    /// Whether `temp` moved enough from the last reported value to be
    /// worth including in a snapshot.
    #[must_use]
    pub fn should_report_temp(&self, temp: f64, threshold: f64) -> bool {
        (temp - self.last_reported_temp).abs() >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("s-001", "s-001")]
    #[case("  abc12  ", "abc12")]
    #[case("A_B-c", "A_B-c")]
    fn test_student_id_valid(#[case] input: &str, #[case] expected: &str) {
        let id = StudentId::new(input).unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("../etc/passwd")]
    #[case("a b")]
    #[case("id.dat")]
    fn test_student_id_invalid(#[case] input: &str) {
        assert!(StudentId::new(input).is_err());
    }

    #[rstest]
    #[case("000000")]
    #[case("123456")]
    #[case("987654")]
    fn test_pairing_token_valid(#[case] input: &str) {
        let token: PairingToken = input.parse().unwrap();
        assert_eq!(token.as_str(), input);
    }

    #[rstest]
    #[case("12345")] // too short
    #[case("1234567")] // too long
    #[case("12345a")] // non-digit
    #[case("")]
    fn test_pairing_token_invalid(#[case] input: &str) {
        assert!(PairingToken::new(input).is_err());
    }

    #[test]
    fn test_pairing_token_generate() {
        for _ in 0..32 {
            let token = PairingToken::generate();
            assert_eq!(token.as_str().len(), PAIRING_TOKEN_LENGTH);
            assert!(token.as_str().chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_command_type_wire_spelling() {
        assert_eq!(
            serde_json::to_value(CommandType::ResetPairing).unwrap(),
            json!("RESET_PAIRING")
        );
        assert_eq!(
            serde_json::to_value(CommandType::Enroll).unwrap(),
            json!("ENROLL")
        );
        assert_eq!(CommandType::Reboot.as_str(), "REBOOT");
        assert!(CommandType::Shutdown.is_power_action());
        assert!(!CommandType::Enroll.is_power_action());
    }

    #[test]
    fn test_command_record_decode() {
        let value = json!({
            "deviceId": "10000000deadbeef",
            "type": "ENROLL",
            "status": "pending",
            "studentId": "s-001",
        });
        let command = CommandRecord::from_value(&value).unwrap();
        assert_eq!(command.kind, CommandType::Enroll);
        assert_eq!(command.status, CommandStatus::Pending);
        assert_eq!(command.enroll_target().unwrap().as_str(), "s-001");
    }

    #[test]
    fn test_command_record_unknown_type_rejected() {
        let value = json!({
            "deviceId": "10000000deadbeef",
            "type": "RESTART",
            "status": "pending",
        });
        assert!(CommandRecord::from_value(&value).is_err());
    }

    #[test]
    fn test_command_record_enroll_target_missing() {
        let value = json!({
            "deviceId": "10000000deadbeef",
            "type": "ENROLL",
            "status": "pending",
        });
        let command = CommandRecord::from_value(&value).unwrap();
        assert!(matches!(
            command.enroll_target(),
            Err(Error::MissingField(_))
        ));
    }

    #[test]
    fn test_student_record_mark_present_idempotent() {
        let mut record = StudentRecord::default();
        assert!(record.mark_present("2026-08-07"));
        assert!(!record.mark_present("2026-08-07"));
        assert_eq!(record.attendance.len(), 1);
        assert_eq!(record.attendance.get("2026-08-07").unwrap(), PRESENT);

        // A second date adds a second entry, never replacing the first.
        assert!(record.mark_present("2026-08-08"));
        assert_eq!(record.attendance.len(), 2);
    }

    #[test]
    fn test_attendance_key_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(attendance_key(date), "2026-08-07");
    }

    #[test]
    fn test_health_snapshot_token_presence() {
        let snapshot = HealthSnapshot {
            last_online: Utc::now(),
            status: DeviceStatus::Online,
            hardware_ready: true,
            templates_stored: 3,
            device_id: "10000000deadbeef".to_string(),
            pairing_token: Some(PairingToken::new("123456").unwrap()),
            cpu_temp: None,
        };
        let fields = snapshot.merge_fields();
        assert_eq!(fields[FIELD_PAIRING_TOKEN], json!("123456"));
        assert_eq!(fields[FIELD_STATUS], json!("online"));
        // Unchanged temperature stays out of the merge entirely.
        assert!(fields.get(FIELD_CPU_TEMP).is_none());
    }

    #[test]
    fn test_health_snapshot_clears_token_when_linked() {
        let snapshot = HealthSnapshot {
            last_online: Utc::now(),
            status: DeviceStatus::Online,
            hardware_ready: false,
            templates_stored: 0,
            device_id: "10000000deadbeef".to_string(),
            pairing_token: None,
            cpu_temp: Some(41.5),
        };
        let fields = snapshot.merge_fields();
        // Explicit null, not an omission: the merge must clear the field.
        assert_eq!(fields[FIELD_PAIRING_TOKEN], Value::Null);
        assert_eq!(fields[FIELD_CPU_TEMP], json!(41.5));
    }

    #[test]
    fn test_pairing_state_phases() {
        let mut state = PairingState::default();
        assert_eq!(state.phase(), PairingPhase::UnpairedNoToken);

        assert_eq!(state.ensure_token(), PairingPhase::UnpairedWithToken);
        let minted = state.pairing_token.clone().unwrap();

        // A second tick keeps the already minted token.
        state.ensure_token();
        assert_eq!(state.pairing_token.clone().unwrap(), minted);

        state.linked_user_id = Some("u1".to_string());
        assert_eq!(state.phase(), PairingPhase::Paired);
        assert!(state.is_linked());
        // Linked devices never advertise a token.
        assert!(state.advertised_token().is_none());
    }

    #[test]
    fn test_pairing_state_apply_record() {
        let mut state = PairingState::default();
        state.ensure_token();

        let record = DeviceRecord {
            user_id: Some("u1".to_string()),
            pairing_token: None,
            enrollment_status: None,
        };
        state.apply_record(&record);
        assert!(state.is_linked());
        assert!(state.pairing_token.is_none());

        // A malformed remote token is treated as absent.
        let record = DeviceRecord {
            user_id: None,
            pairing_token: Some("not-a-token".to_string()),
            enrollment_status: None,
        };
        state.apply_record(&record);
        assert_eq!(state.phase(), PairingPhase::UnpairedNoToken);
    }

    #[rstest]
    #[case(40.0, 40.3, false)] // below threshold, omitted
    #[case(40.0, 40.6, true)] // at/over threshold, included
    #[case(40.0, 39.5, true)] // movement counts in both directions
    #[case(0.0, 0.0, false)]
    fn test_temp_report_threshold(
        #[case] last_reported: f64,
        #[case] current: f64,
        #[case] expected: bool,
    ) {
        let state = PairingState {
            last_reported_temp: last_reported,
            ..PairingState::default()
        };
        assert_eq!(state.should_report_temp(current, 0.5), expected);
    }
}
