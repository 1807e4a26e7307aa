//! Remote command dispatcher.
//!
//! A reactive consumer of the pending-command subscription for this
//! device. Documents in a batch are handled independently and in
//! delivery order; one failing command ends `failed` and never takes the
//! dispatcher down. Power commands write their terminal status before
//! the OS action fires, so the remote never observes an unresolved
//! command after a power event.

use crate::config::AgentConfig;
use crate::engine::BiometricEngine;
use crate::error::Result;
use crate::power::{AnyPower, PowerControl};
use rollcall_core::constants::{
    COLLECTION_COMMANDS, COLLECTION_STATUS, FIELD_DEVICE_ID, FIELD_PAIRING_TOKEN, FIELD_STATUS,
    FIELD_USER_ID,
};
use rollcall_core::{CommandRecord, CommandStatus, CommandType, merge_field};
use rollcall_store::{AnyStore, Document, QueryFilter, RemoteStore};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Consumer of pending commands addressed to this device.
pub struct CommandDispatcher {
    store: AnyStore,
    engine: Arc<BiometricEngine>,
    power: AnyPower,
    device_id: String,
    config: Arc<AgentConfig>,
}

impl CommandDispatcher {
    /// Create a dispatcher for `device_id`.
    pub fn new(
        store: AnyStore,
        engine: Arc<BiometricEngine>,
        power: AnyPower,
        device_id: String,
        config: Arc<AgentConfig>,
    ) -> Self {
        Self {
            store,
            engine,
            power,
            device_id,
            config,
        }
    }

    /// The subscription filter: commands for this device, still pending.
    fn pending_filter(device_id: &str) -> QueryFilter {
        QueryFilter::new()
            .field_eq(FIELD_DEVICE_ID, device_id)
            .field_eq(FIELD_STATUS, CommandStatus::Pending.as_str())
    }

    /// Consume the subscription until the store closes it.
    pub async fn run(self) {
        let filter = Self::pending_filter(&self.device_id);
        let mut changes = match self.store.subscribe(COLLECTION_COMMANDS, filter).await {
            Ok(changes) => changes,
            Err(err) => {
                error!(%err, "command subscription failed");
                return;
            }
        };

        info!(device = %self.device_id, "command dispatcher listening");
        while let Some(batch) = changes.recv().await {
            for document in batch {
                self.dispatch(document).await;
            }
        }
        warn!("command subscription ended");
    }

    /// Handle one changed document. Every failure is contained here.
    pub async fn dispatch(&self, document: Document) {
        let command = match CommandRecord::from_value(&document.data) {
            Ok(command) => command,
            Err(error) => {
                // Unrecognized types and malformed documents are left
                // pending on purpose: a future handler may claim them.
                debug!(id = %document.id, %error, "ignoring unrecognized command document");
                return;
            }
        };
        if command.status != CommandStatus::Pending {
            return;
        }

        info!(id = %document.id, kind = %command.kind, "command received");
        if let Err(error) = self.execute(&document.id, &command).await {
            warn!(id = %document.id, %error, "command failed");
            self.finish(&document.id, CommandStatus::Failed).await;
        }
    }

    async fn execute(&self, id: &str, command: &CommandRecord) -> Result<()> {
        match command.kind {
            CommandType::Enroll => {
                let student = command.enroll_target()?;
                let outcome = self.engine.enroll(&student).await;
                let status = if outcome.is_success() {
                    CommandStatus::Completed
                } else {
                    CommandStatus::Failed
                };
                self.finish(id, status).await;
            }
            CommandType::Reboot => {
                // Terminal status goes out before the disruptive side
                // effect; the delay lets the write reach the remote.
                self.finish(id, CommandStatus::Completed).await;
                info!(delay = ?self.config.power_delay, "rebooting");
                tokio::time::sleep(self.config.power_delay).await;
                if let Err(error) = self.power.reboot().await {
                    error!(%error, "reboot invocation failed");
                }
            }
            CommandType::Shutdown => {
                self.finish(id, CommandStatus::Completed).await;
                info!(delay = ?self.config.power_delay, "shutting down");
                tokio::time::sleep(self.config.power_delay).await;
                if let Err(error) = self.power.power_off().await {
                    error!(%error, "power-off invocation failed");
                }
            }
            CommandType::ResetPairing => {
                let mut fields = Map::new();
                fields.insert(FIELD_USER_ID.to_string(), Value::Null);
                fields.insert(FIELD_PAIRING_TOKEN.to_string(), Value::Null);
                self.store
                    .set_merge(COLLECTION_STATUS, &self.device_id, Value::Object(fields))
                    .await?;
                info!("pairing reset");
                self.finish(id, CommandStatus::Completed).await;
            }
        }
        Ok(())
    }

    /// Best-effort terminal status write.
    async fn finish(&self, id: &str, status: CommandStatus) {
        let fields = merge_field(FIELD_STATUS, Value::String(status.as_str().to_string()));
        if let Err(error) = self.store.update(COLLECTION_COMMANDS, id, fields).await {
            warn!(id, %error, "failed to write command status");
        }
    }
}
