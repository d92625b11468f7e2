//! # thinghubd: thinghub daemon
//!
//! Composition root that wires drivers, things and storage together.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Instantiate things from their types, spawn their runtime tasks and
//!   bind them to drivers
//! - Pull every bound driver periodically and log the resulting events
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing_subscriber::EnvFilter;

use thinghub_adapter_storage_sqlite_sqlx::{Config as StorageConfig, SqliteMetadataStore};
use thinghub_adapter_virtual::{VirtualLight, VirtualSensor, models};
use thinghub_app::event_bus::InProcessEventBus;
use thinghub_app::runtime::ThingHandle;
use thinghub_domain::driver::Driver;
use thinghub_domain::event::Event;
use thinghub_domain::metadata::{self, MetaOptions};
use thinghub_domain::model::ThingType;

use crate::config::{Config, VirtualKind};

type Store = Arc<SqliteMetadataStore>;
type Bus = Arc<InProcessEventBus>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("opening database")?;
    let store: Store = Arc::new(SqliteMetadataStore::new(db.pool().clone()));

    // Event bus
    let bus: Bus = Arc::new(InProcessEventBus::new(config.bus.capacity));
    let logger = tokio::spawn(log_events(BroadcastStream::new(bus.subscribe())));

    // Things
    let mut handles = Vec::new();
    for device in &config.drivers.virtual_devices {
        let (thing_type, driver) = match device.kind {
            VirtualKind::Light => (
                models::light()?,
                Box::new(VirtualLight::new(device.serial.clone())) as Box<dyn Driver>,
            ),
            VirtualKind::Sensor => (
                models::temperature_sensor()?,
                Box::new(VirtualSensor::new(device.serial.clone())) as Box<dyn Driver>,
            ),
        };
        let handle = spawn_bound(thing_type, driver, device.name.as_deref(), &store, &bus)
            .await
            .with_context(|| format!("binding virtual {:?} {}", device.kind, device.serial))?;
        handles.push(handle);
    }
    if handles.is_empty() {
        tracing::warn!("no device configured, nothing to do until shutdown");
    }

    tracing::info!(
        things = handles.len(),
        subscribers = bus.subscriber_count(),
        interval_secs = config.drivers.pull_interval_secs,
        "thinghubd running"
    );

    let mut ticker = tokio::time::interval(config.pull_interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => poll(&handles).await,
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for shutdown signal")?;
                break;
            }
        }
    }

    tracing::info!("shutting down");
    for handle in &handles {
        match handle.shutdown().await {
            Ok(Some(wait)) => tracing::debug!(
                thing = handle.thing_type().code(),
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "driver released"
            ),
            Ok(None) => {}
            Err(err) => tracing::warn!(thing = handle.thing_type().code(), error = %err, "shutdown failed"),
        }
    }
    logger.abort();
    db.close().await;

    Ok(())
}

/// Spawn a thing of `thing_type`, bind `driver` to it and give it
/// `default_name` unless a name was persisted before.
async fn spawn_bound(
    thing_type: ThingType,
    driver: Box<dyn Driver>,
    default_name: Option<&str>,
    store: &Store,
    bus: &Bus,
) -> anyhow::Result<ThingHandle> {
    let handle = ThingHandle::spawn(
        thing_type.instantiate(),
        Arc::clone(store),
        Arc::clone(bus),
    );
    let identity = handle.bind(driver).await?;

    if let Some(name) = default_name
        && !handle.meta().await?.contains_key(metadata::NAME)
    {
        handle
            .update_meta(
                vec![(metadata::NAME.to_string(), serde_json::json!(name))],
                MetaOptions::stamped(),
            )
            .await?;
    }

    tracing::info!(thing_id = %identity.thing_id, id = %identity.id, "thing bound");
    Ok(handle)
}

/// Probe every driver and ask the reachable ones for fresh data.
async fn poll(handles: &[ThingHandle]) {
    for handle in handles {
        let result = match handle.check_reachable().await {
            Ok(true) => handle.pull().await,
            Ok(false) => {
                tracing::debug!(thing = handle.thing_type().code(), "skipping pull, driver not bound");
                Ok(())
            }
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            tracing::warn!(thing = handle.thing_type().code(), error = %err, "pull failed");
        }
    }
}

async fn log_events(mut events: BroadcastStream<Event>) {
    while let Some(item) = events.next().await {
        match item {
            Ok(event) => tracing::info!(
                kind = ?event.kind,
                thing = %event.thing,
                thing_id = event.thing_id.as_deref().unwrap_or("-"),
                changes = %serde_json::to_string(&event.changes).unwrap_or_default(),
                "event"
            ),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log lagging behind");
            }
        }
    }
}
