//! Pairing reconciliation and throttled health reporting.
//!
//! Each tick re-derives the pairing state from the remote device record
//! (remote is authoritative), mints a pairing token when the device is
//! unlinked and has none, and merge-writes a health snapshot. The
//! snapshot and the dispatcher touch disjoint fields of the same record,
//! which is what makes their concurrent writes safe.
//!
//! The loop never exits: every tick error is logged and the next tick
//! runs after the same sleep.

use crate::config::AgentConfig;
use crate::error::Result;
use crate::pairing::SharedPairing;
use chrono::Utc;
use rollcall_core::constants::COLLECTION_STATUS;
use rollcall_core::{DeviceRecord, DeviceStatus, HealthSnapshot, PairingPhase};
use rollcall_sensor::{AnySensor, FingerprintSensor, TemplateStore};
use rollcall_store::{AnyStore, RemoteStore};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Instantaneous CPU temperature in degrees Celsius.
///
/// The kernel reports millidegrees; an unreadable or unparsable file
/// reads as 0.0.
pub(crate) fn read_cpu_temp(path: &Path) -> f64 {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .map(|millidegrees| millidegrees / 1000.0)
        .unwrap_or(0.0)
}

/// Periodic pairing + health reporter.
pub struct HeartbeatReporter {
    store: AnyStore,
    pairing: SharedPairing,
    sensor: Arc<Mutex<AnySensor>>,
    templates: TemplateStore,
    device_id: String,
    config: Arc<AgentConfig>,
}

impl HeartbeatReporter {
    /// Create a reporter for `device_id`.
    pub fn new(
        store: AnyStore,
        pairing: SharedPairing,
        sensor: Arc<Mutex<AnySensor>>,
        templates: TemplateStore,
        device_id: String,
        config: Arc<AgentConfig>,
    ) -> Self {
        Self {
            store,
            pairing,
            sensor,
            templates,
            device_id,
            config,
        }
    }

    /// Run forever. Tick errors are logged and the loop continues.
    pub async fn run(self) {
        info!(device = %self.device_id, "heartbeat reporter started");
        loop {
            if let Err(error) = self.tick().await {
                warn!(%error, "heartbeat tick failed");
            }
            tokio::time::sleep(self.config.heartbeat_interval).await;
        }
    }

    /// One reconcile-and-report cycle.
    pub async fn tick(&self) -> Result<()> {
        let record = match self.store.get(COLLECTION_STATUS, &self.device_id).await? {
            Some(value) => Some(DeviceRecord::from_value(&value)?),
            None => None,
        };

        let hardware_ready = self.sensor.lock().await.is_present().await;
        let templates_stored = self.templates.count().await?;
        let current_temp = read_cpu_temp(&self.config.thermal_path);

        let (snapshot, state) = self
            .pairing
            .with_mut(|state| {
                if let Some(record) = &record {
                    state.apply_record(record);
                }
                state.ensure_token();

                let report_temp =
                    state.should_report_temp(current_temp, self.config.temp_report_threshold);
                let snapshot = HealthSnapshot {
                    last_online: Utc::now(),
                    status: DeviceStatus::Online,
                    hardware_ready,
                    templates_stored,
                    device_id: self.device_id.clone(),
                    pairing_token: state.advertised_token(),
                    cpu_temp: report_temp.then_some(current_temp),
                };
                (snapshot, state.clone())
            })
            .await;

        let temp_reported = snapshot.cpu_temp.is_some();
        self.store
            .set_merge(COLLECTION_STATUS, &self.device_id, snapshot.merge_fields())
            .await?;

        // The last reported value moves only once the write went through.
        if temp_reported {
            self.pairing
                .with_mut(|state| state.last_reported_temp = current_temp)
                .await;
        }

        match state.phase() {
            PairingPhase::Paired => info!(
                user = state.linked_user_id.as_deref().unwrap_or(""),
                "heartbeat sent (paired)"
            ),
            PairingPhase::UnpairedWithToken => info!(
                token = state
                    .pairing_token
                    .as_ref()
                    .map(|t| t.as_str())
                    .unwrap_or(""),
                "heartbeat sent (unpaired)"
            ),
            PairingPhase::UnpairedNoToken => info!("heartbeat sent"),
        }
        Ok(())
    }
}
