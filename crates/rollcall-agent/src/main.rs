//! Rollcall agent entry point.
//!
//! Startup is the only place where errors are fatal: a missing credential
//! file or a store client that cannot be built exits nonzero. Once the
//! three activities are running, every failure is transient and stays
//! inside its owning loop.

use anyhow::Context;
use rollcall_agent::{
    AgentConfig, AnyPower, BiometricEngine, CommandDispatcher, HeartbeatReporter, SharedPairing,
    SystemPower, identity,
};
use rollcall_sensor::{AnySensor, MockSensor, TemplateStore};
use rollcall_store::{AnyStore, HttpStore, HttpStoreConfig, StoreCredentials};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AgentConfig::default();

    let device_id = identity::resolve_device_id(&config.cpuinfo_path);
    info!(device = %device_id, "device identity resolved");

    let credentials = StoreCredentials::from_file(&config.credentials_path).with_context(|| {
        format!(
            "credential file {} is required",
            config.credentials_path.display()
        )
    })?;
    let store = AnyStore::Http(
        HttpStore::new(HttpStoreConfig::new(credentials))
            .context("remote store initialization failed")?,
    );
    info!("--- [1/2] remote store connected ---");

    let templates = TemplateStore::open(&config.templates_dir)
        .await
        .context("template directory unavailable")?;

    // Development sensor until a UART driver lands; the control handle
    // stays alive so the simulated hardware keeps reporting present.
    let (mock_sensor, _sensor_handle) = MockSensor::new();
    let sensor = Arc::new(Mutex::new(AnySensor::Mock(mock_sensor)));
    info!("--- [2/2] sensor attached ---");

    let config = Arc::new(config);
    let pairing = SharedPairing::new();

    let reporter = HeartbeatReporter::new(
        store.clone(),
        pairing.clone(),
        sensor.clone(),
        templates.clone(),
        device_id.clone(),
        config.clone(),
    );
    let engine = Arc::new(BiometricEngine::new(
        store.clone(),
        sensor.clone(),
        templates.clone(),
        pairing.clone(),
        device_id.clone(),
        config.clone(),
    ));
    let dispatcher = CommandDispatcher::new(
        store,
        engine.clone(),
        AnyPower::System(SystemPower),
        device_id.clone(),
        config,
    );

    tokio::spawn(reporter.run());
    tokio::spawn(engine.run_verification());
    tokio::spawn(dispatcher.run());

    info!(device = %device_id, "rollcall agent active");
    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for interrupt")?;
    info!("interrupt received, shutting down");
    Ok(())
}
