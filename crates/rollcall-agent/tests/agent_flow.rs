//! End-to-end agent flows against the in-process store, the mock sensor
//! and the power recorder.

use rollcall_agent::{
    AgentConfig, AnyPower, BiometricEngine, CommandDispatcher, EnrollOutcome, HeartbeatReporter,
    MockPower, PowerAction, SharedPairing,
};
use rollcall_core::constants::{COLLECTION_COMMANDS, COLLECTION_STATUS, COLLECTION_STUDENTS};
use rollcall_core::{StudentId, today_key};
use rollcall_sensor::{AnySensor, MockSensor, MockSensorHandle, TemplateStore};
use rollcall_store::{AnyStore, Document, MemoryStore, RemoteStore};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

const DEVICE_ID: &str = "100000003d9a2f41";

struct Harness {
    store: AnyStore,
    pairing: SharedPairing,
    sensor_handle: MockSensorHandle,
    templates: TemplateStore,
    power: MockPower,
    reporter: HeartbeatReporter,
    engine: Arc<BiometricEngine>,
    dispatcher: CommandDispatcher,
    config: Arc<AgentConfig>,
    _tempdir: TempDir,
}

async fn harness() -> Harness {
    let tempdir = TempDir::new().unwrap();
    let config = Arc::new(
        AgentConfig::default()
            .with_heartbeat_interval(Duration::from_millis(20))
            .with_idle_scan_interval(Duration::from_millis(10))
            .with_match_cooldown(Duration::from_millis(10))
            .with_capture_poll_interval(Duration::from_millis(5))
            .with_enroll_step_timeout(Duration::from_millis(400))
            .with_enroll_pause(Duration::from_millis(5))
            .with_power_delay(Duration::from_millis(10))
            .with_templates_dir(tempdir.path().join("templates"))
            .with_thermal_path(tempdir.path().join("thermal"))
            .with_cpuinfo_path(tempdir.path().join("cpuinfo")),
    );

    let store = AnyStore::Memory(MemoryStore::new());
    let pairing = SharedPairing::new();
    let (mock_sensor, sensor_handle) = MockSensor::new();
    let sensor = Arc::new(Mutex::new(AnySensor::Mock(mock_sensor)));
    let templates = TemplateStore::open(&config.templates_dir).await.unwrap();
    let power = MockPower::new();

    let reporter = HeartbeatReporter::new(
        store.clone(),
        pairing.clone(),
        sensor.clone(),
        templates.clone(),
        DEVICE_ID.to_string(),
        config.clone(),
    );
    let engine = Arc::new(BiometricEngine::new(
        store.clone(),
        sensor.clone(),
        templates.clone(),
        pairing.clone(),
        DEVICE_ID.to_string(),
        config.clone(),
    ));
    let dispatcher = CommandDispatcher::new(
        store.clone(),
        engine.clone(),
        AnyPower::Mock(power.clone()),
        DEVICE_ID.to_string(),
        config.clone(),
    );

    Harness {
        store,
        pairing,
        sensor_handle,
        templates,
        power,
        reporter,
        engine,
        dispatcher,
        config,
        _tempdir: tempdir,
    }
}

/// Link the device by seeding the remote record and running one tick.
async fn link_device(h: &Harness) {
    h.store
        .set_merge(COLLECTION_STATUS, DEVICE_ID, json!({"userId": "u1"}))
        .await
        .unwrap();
    h.reporter.tick().await.unwrap();
    assert!(h.pairing.is_linked().await);
}

async fn seed_student(h: &Harness, id: &str, name: &str) {
    h.store
        .set_merge(COLLECTION_STUDENTS, id, json!({"name": name}))
        .await
        .unwrap();
}

async fn status_doc(h: &Harness) -> Value {
    h.store
        .get(COLLECTION_STATUS, DEVICE_ID)
        .await
        .unwrap()
        .expect("device record should exist")
}

async fn seed_command(h: &Harness, id: &str, body: Value) -> Document {
    h.store
        .set_merge(COLLECTION_COMMANDS, id, body)
        .await
        .unwrap();
    Document::new(
        id,
        h.store
            .get(COLLECTION_COMMANDS, id)
            .await
            .unwrap()
            .unwrap(),
    )
}

async fn command_status(store: &AnyStore, id: &str) -> Value {
    store.get(COLLECTION_COMMANDS, id).await.unwrap().unwrap()["status"].clone()
}

async fn wait_for_command_status(store: &AnyStore, id: &str, expected: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(doc) = store.get(COLLECTION_COMMANDS, id).await.unwrap() {
            if doc["status"] == expected {
                return;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("command {id} never reached status {expected}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn student(id: &str) -> StudentId {
    StudentId::new(id).unwrap()
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_heartbeat_creates_record_with_token() {
    let h = harness().await;
    h.reporter.tick().await.unwrap();

    let doc = status_doc(&h).await;
    let token = doc["pairingToken"].as_str().expect("token advertised");
    assert_eq!(token.len(), 6);
    assert!(token.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(doc["status"], "online");
    assert_eq!(doc["deviceId"], DEVICE_ID);
    assert_eq!(doc["hardwareReady"], true);
    assert_eq!(doc["templatesStored"], 0);
    assert!(doc.get("userId").is_none());

    // The minted token is stable across ticks.
    h.reporter.tick().await.unwrap();
    assert_eq!(status_doc(&h).await["pairingToken"], token);
}

#[tokio::test]
async fn heartbeat_reports_absent_hardware() {
    let h = harness().await;
    h.sensor_handle.set_present(false);
    h.reporter.tick().await.unwrap();
    assert_eq!(status_doc(&h).await["hardwareReady"], false);
}

#[tokio::test]
async fn heartbeat_adopts_remote_link_and_clears_token() {
    let h = harness().await;
    h.reporter.tick().await.unwrap();
    assert!(status_doc(&h).await["pairingToken"].is_string());

    // The dashboard links the device; the next tick adopts it.
    h.store
        .set_merge(COLLECTION_STATUS, DEVICE_ID, json!({"userId": "u1"}))
        .await
        .unwrap();
    h.reporter.tick().await.unwrap();

    assert!(h.pairing.is_linked().await);
    let doc = status_doc(&h).await;
    // Never both set: linking clears the advertised token.
    assert_eq!(doc["userId"], "u1");
    assert_eq!(doc["pairingToken"], Value::Null);
}

#[tokio::test]
async fn heartbeat_throttles_temperature_reports() {
    let h = harness().await;
    let thermal = h.config.thermal_path.clone();

    tokio::fs::write(&thermal, "40000\n").await.unwrap();
    h.reporter.tick().await.unwrap();
    assert!((status_doc(&h).await["cpuTemp"].as_f64().unwrap() - 40.0).abs() < 1e-9);

    // 40.3 is within the 0.5 threshold of the last reported 40.0: the
    // field is omitted and the stored value stays at 40.0.
    tokio::fs::write(&thermal, "40300\n").await.unwrap();
    h.reporter.tick().await.unwrap();
    assert!((status_doc(&h).await["cpuTemp"].as_f64().unwrap() - 40.0).abs() < 1e-9);

    // 40.6 crosses the threshold and becomes the new reported value.
    tokio::fs::write(&thermal, "40600\n").await.unwrap();
    h.reporter.tick().await.unwrap();
    assert!((status_doc(&h).await["cpuTemp"].as_f64().unwrap() - 40.6).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Enrollment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enrollment_success_writes_template_and_stamps_record() {
    let h = harness().await;
    link_device(&h).await;
    seed_student(&h, "s-001", "Ada").await;

    let template = vec![7u8; 32];
    h.sensor_handle.touch(template.clone()).unwrap();
    h.sensor_handle.release().unwrap();
    h.sensor_handle.touch(template.clone()).unwrap();

    let outcome = h.engine.enroll(&student("s-001")).await;
    assert_eq!(outcome, EnrollOutcome::Enrolled);
    assert!(outcome.is_success());

    assert!(h.templates.contains(&student("s-001")).await);
    assert_eq!(
        h.templates.read(&student("s-001")).await.unwrap(),
        template
    );

    let record = h
        .store
        .get(COLLECTION_STUDENTS, "s-001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record["fingerprintStatus"], "enrolled");
    assert!(record["lastEnrolled"].is_string());

    assert_eq!(
        status_doc(&h).await["enrollmentStatus"],
        "Enrollment successful"
    );
}

#[tokio::test]
async fn enrollment_mismatch_fails_without_template() {
    let h = harness().await;
    link_device(&h).await;
    seed_student(&h, "s-001", "Ada").await;

    h.sensor_handle.touch(vec![1u8; 32]).unwrap();
    h.sensor_handle.release().unwrap();
    h.sensor_handle.touch(vec![2u8; 32]).unwrap();

    let outcome = h.engine.enroll(&student("s-001")).await;
    assert_eq!(outcome, EnrollOutcome::Failed);
    assert!(!h.templates.contains(&student("s-001")).await);

    let record = h
        .store
        .get(COLLECTION_STUDENTS, "s-001")
        .await
        .unwrap()
        .unwrap();
    assert!(record.get("fingerprintStatus").is_none());

    assert_eq!(
        status_doc(&h).await["enrollmentStatus"],
        "Fail: fingers did not match"
    );
}

#[tokio::test]
async fn enrollment_refused_when_unlinked() {
    let h = harness().await;

    let outcome = h.engine.enroll(&student("s-001")).await;
    assert_eq!(outcome, EnrollOutcome::Failed);

    // The gate refused before the protocol ran: no record was touched.
    assert!(
        h.store
            .get(COLLECTION_STATUS, DEVICE_ID)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn enrollment_step_timeout_fails_cleanly() {
    let h = harness().await;
    link_device(&h).await;
    seed_student(&h, "s-001", "Ada").await;

    // Nothing ever touches the sensor.
    let outcome = h.engine.enroll(&student("s-001")).await;
    assert_eq!(outcome, EnrollOutcome::Failed);

    let message = status_doc(&h).await["enrollmentStatus"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.starts_with("Error:"), "got {message:?}");
    assert!(!h.templates.contains(&student("s-001")).await);
}

#[tokio::test]
async fn enrollment_without_student_record_leaves_no_template() {
    let h = harness().await;
    link_device(&h).await;

    let template = vec![4u8; 32];
    h.sensor_handle.touch(template.clone()).unwrap();
    h.sensor_handle.release().unwrap();
    h.sensor_handle.touch(template).unwrap();

    let outcome = h.engine.enroll(&student("ghost")).await;
    assert_eq!(outcome, EnrollOutcome::Failed);
    // The record stamp failed before the file write: success iff a file
    // exists still holds.
    assert!(!h.templates.contains(&student("ghost")).await);
}

// ---------------------------------------------------------------------------
// Verification and attendance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verification_match_marks_attendance_once() {
    let h = harness().await;
    link_device(&h).await;
    seed_student(&h, "s-001", "Ada").await;
    h.templates
        .write(&student("s-001"), &[9u8; 16])
        .await
        .unwrap();

    h.sensor_handle.touch(vec![9u8; 16]).unwrap();
    let matched = h.engine.scan_once().await.unwrap().expect("match");
    assert_eq!(matched.as_str(), "s-001");

    assert!(h.engine.mark_attendance(&matched).await.unwrap());
    let record = h
        .store
        .get(COLLECTION_STUDENTS, "s-001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record["attendance"][today_key()], "present");

    // Marking again the same day is a no-op, not a duplicate.
    assert!(!h.engine.mark_attendance(&matched).await.unwrap());
    let record = h
        .store
        .get(COLLECTION_STUDENTS, "s-001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record["attendance"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn verification_scans_in_sorted_order_first_hit() {
    let h = harness().await;
    link_device(&h).await;
    h.templates.write(&student("alice"), &[1u8; 8]).await.unwrap();
    h.templates.write(&student("bob"), &[2u8; 8]).await.unwrap();

    // The live capture matches the second template in scan order; the
    // first scores below threshold and is passed over.
    h.sensor_handle.touch(vec![2u8; 8]).unwrap();
    let matched = h.engine.scan_once().await.unwrap().expect("match");
    assert_eq!(matched.as_str(), "bob");
}

#[tokio::test]
async fn verification_no_match_is_quiet() {
    let h = harness().await;
    link_device(&h).await;
    h.templates.write(&student("alice"), &[1u8; 8]).await.unwrap();

    h.sensor_handle.touch(vec![3u8; 8]).unwrap();
    assert!(h.engine.scan_once().await.unwrap().is_none());

    // Empty window: nothing this tick either.
    assert!(h.engine.scan_once().await.unwrap().is_none());
}

#[tokio::test]
async fn verification_skips_when_sensor_absent() {
    let h = harness().await;
    link_device(&h).await;
    h.sensor_handle.set_present(false);
    h.sensor_handle.touch(vec![1u8; 8]).unwrap();
    assert!(h.engine.scan_once().await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_pairing_clears_both_fields() {
    let h = harness().await;
    h.store
        .set_merge(
            COLLECTION_STATUS,
            DEVICE_ID,
            json!({"userId": "u1", "pairingToken": "123456"}),
        )
        .await
        .unwrap();

    let command = seed_command(
        &h,
        "cmd-reset",
        json!({"deviceId": DEVICE_ID, "type": "RESET_PAIRING", "status": "pending"}),
    )
    .await;
    h.dispatcher.dispatch(command).await;

    let doc = status_doc(&h).await;
    assert_eq!(doc["userId"], Value::Null);
    assert_eq!(doc["pairingToken"], Value::Null);
    assert_eq!(command_status(&h.store, "cmd-reset").await, "completed");
}

#[tokio::test]
async fn reboot_acknowledges_before_power_action() {
    let h = harness().await;
    let command = seed_command(
        &h,
        "cmd-reboot",
        json!({"deviceId": DEVICE_ID, "type": "REBOOT", "status": "pending"}),
    )
    .await;
    h.dispatcher.dispatch(command).await;

    assert_eq!(command_status(&h.store, "cmd-reboot").await, "completed");
    assert_eq!(h.power.actions(), vec![PowerAction::Reboot]);
}

#[tokio::test]
async fn shutdown_acknowledges_before_power_action() {
    let h = harness().await;
    let command = seed_command(
        &h,
        "cmd-off",
        json!({"deviceId": DEVICE_ID, "type": "SHUTDOWN", "status": "pending"}),
    )
    .await;
    h.dispatcher.dispatch(command).await;

    assert_eq!(command_status(&h.store, "cmd-off").await, "completed");
    assert_eq!(h.power.actions(), vec![PowerAction::PowerOff]);
}

#[tokio::test]
async fn enroll_command_end_to_end() {
    let h = harness().await;
    link_device(&h).await;
    seed_student(&h, "s-001", "Ada").await;

    let template = vec![6u8; 32];
    h.sensor_handle.touch(template.clone()).unwrap();
    h.sensor_handle.release().unwrap();
    h.sensor_handle.touch(template).unwrap();

    let command = seed_command(
        &h,
        "cmd-enroll",
        json!({
            "deviceId": DEVICE_ID,
            "type": "ENROLL",
            "status": "pending",
            "studentId": "s-001",
        }),
    )
    .await;
    h.dispatcher.dispatch(command).await;

    assert_eq!(command_status(&h.store, "cmd-enroll").await, "completed");
    assert!(h.templates.contains(&student("s-001")).await);
}

#[tokio::test]
async fn enroll_command_without_target_fails() {
    let h = harness().await;
    link_device(&h).await;

    let command = seed_command(
        &h,
        "cmd-enroll",
        json!({"deviceId": DEVICE_ID, "type": "ENROLL", "status": "pending"}),
    )
    .await;
    h.dispatcher.dispatch(command).await;

    assert_eq!(command_status(&h.store, "cmd-enroll").await, "failed");
}

#[tokio::test]
async fn unknown_command_type_left_pending() {
    let h = harness().await;
    let command = seed_command(
        &h,
        "cmd-future",
        json!({"deviceId": DEVICE_ID, "type": "RESTART", "status": "pending"}),
    )
    .await;
    h.dispatcher.dispatch(command).await;

    assert_eq!(command_status(&h.store, "cmd-future").await, "pending");
}

#[tokio::test]
async fn completed_command_not_reprocessed() {
    let h = harness().await;
    let command = seed_command(
        &h,
        "cmd-done",
        json!({"deviceId": DEVICE_ID, "type": "REBOOT", "status": "completed"}),
    )
    .await;
    h.dispatcher.dispatch(command).await;

    assert!(h.power.actions().is_empty());
}

#[tokio::test]
async fn dispatcher_consumes_subscription() {
    let h = harness().await;

    // Queued before the dispatcher starts: delivered in the initial
    // snapshot.
    h.store
        .set_merge(
            COLLECTION_COMMANDS,
            "cmd-early",
            json!({"deviceId": DEVICE_ID, "type": "RESET_PAIRING", "status": "pending"}),
        )
        .await
        .unwrap();

    let store = h.store.clone();
    tokio::spawn(h.dispatcher.run());

    wait_for_command_status(&store, "cmd-early", "completed").await;

    // Queued while listening: delivered as a change batch.
    store
        .set_merge(
            COLLECTION_COMMANDS,
            "cmd-late",
            json!({"deviceId": DEVICE_ID, "type": "RESET_PAIRING", "status": "pending"}),
        )
        .await
        .unwrap();
    wait_for_command_status(&store, "cmd-late", "completed").await;

    // A command for another device is never touched.
    store
        .set_merge(
            COLLECTION_COMMANDS,
            "cmd-other",
            json!({"deviceId": "another-device", "type": "RESET_PAIRING", "status": "pending"}),
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(command_status(&store, "cmd-other").await, "pending");
}
