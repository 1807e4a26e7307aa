//! OS power control seam.
//!
//! REBOOT and SHUTDOWN commands end in a one-line OS invocation. The
//! trait exists so the dispatcher can be exercised in tests without
//! taking the machine down with it.

#![allow(async_fn_in_trait)]

use crate::error::{AgentError, Result};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Power control abstraction.
pub trait PowerControl: Send + Sync {
    /// Reboot the host.
    async fn reboot(&self) -> Result<()>;

    /// Power the host off.
    async fn power_off(&self) -> Result<()>;
}

/// Invokes the host OS power commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPower;

async fn run_privileged(args: &[&str]) -> Result<()> {
    let status = tokio::process::Command::new("sudo")
        .args(args)
        .status()
        .await?;
    if !status.success() {
        return Err(AgentError::PowerCommand {
            code: status.code(),
        });
    }
    Ok(())
}

impl PowerControl for SystemPower {
    async fn reboot(&self) -> Result<()> {
        info!("invoking OS reboot");
        run_privileged(&["reboot"]).await
    }

    async fn power_off(&self) -> Result<()> {
        info!("invoking OS power-off");
        run_privileged(&["shutdown", "-h", "now"]).await
    }
}

/// Recorded power invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Reboot,
    PowerOff,
}

/// Records invocations instead of touching the host.
#[derive(Debug, Clone, Default)]
pub struct MockPower {
    actions: Arc<Mutex<Vec<PowerAction>>>,
}

impl MockPower {
    /// Create a recorder with no actions yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The actions invoked so far, in order.
    #[must_use]
    pub fn actions(&self) -> Vec<PowerAction> {
        self.actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, action: PowerAction) {
        self.actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(action);
    }
}

impl PowerControl for MockPower {
    async fn reboot(&self) -> Result<()> {
        self.record(PowerAction::Reboot);
        Ok(())
    }

    async fn power_off(&self) -> Result<()> {
        self.record(PowerAction::PowerOff);
        Ok(())
    }
}

/// Enum wrapper for power control dispatch.
#[derive(Debug, Clone)]
pub enum AnyPower {
    /// Real OS invocations.
    System(SystemPower),

    /// Recorder for tests.
    Mock(MockPower),
}

impl PowerControl for AnyPower {
    async fn reboot(&self) -> Result<()> {
        match self {
            Self::System(power) => power.reboot().await,
            Self::Mock(power) => power.reboot().await,
        }
    }

    async fn power_off(&self) -> Result<()> {
        match self {
            Self::System(power) => power.power_off().await,
            Self::Mock(power) => power.power_off().await,
        }
    }
}
