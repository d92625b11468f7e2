//! End-to-end smoke tests for the full thinghubd stack.
//!
//! Each test wires the complete application (in-memory `SQLite`, real
//! metadata store, in-process event bus, thing runtime and virtual drivers)
//! and drives it through [`ThingHandle`] the way the daemon does.

use std::sync::Arc;

use tokio::sync::broadcast;

use thinghub_adapter_storage_sqlite_sqlx::{Config, SqliteMetadataStore};
use thinghub_adapter_virtual::{VirtualLight, VirtualSensor, models};
use thinghub_app::event_bus::InProcessEventBus;
use thinghub_app::runtime::ThingHandle;
use thinghub_domain::attribute::AttributeValue;
use thinghub_domain::error::ThingError;
use thinghub_domain::event::Event;
use thinghub_domain::metadata::{self, MetaOptions};
use thinghub_domain::thing::{EventKind, ReadMode, TransactionOptions};

struct Stack {
    store: Arc<SqliteMetadataStore>,
    bus: Arc<InProcessEventBus>,
}

impl Stack {
    async fn new() -> Self {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .expect("in-memory database should initialise");

        Self {
            store: Arc::new(SqliteMetadataStore::new(db.pool().clone())),
            bus: Arc::new(InProcessEventBus::new(64)),
        }
    }

    fn light(&self) -> ThingHandle {
        ThingHandle::spawn(
            models::light().unwrap().instantiate(),
            Arc::clone(&self.store),
            Arc::clone(&self.bus),
        )
    }

    fn sensor(&self) -> ThingHandle {
        ThingHandle::spawn(
            models::temperature_sensor().unwrap().instantiate(),
            Arc::clone(&self.store),
            Arc::clone(&self.bus),
        )
    }
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

// ---------------------------------------------------------------------------
// Light
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_switch_light_and_read_back_device_state() {
    let stack = Stack::new().await;
    let handle = stack.light();
    let light = VirtualLight::new("lamp-1");
    let panel = light.panel();
    handle.bind(Box::new(light)).await.unwrap();

    assert!(handle.set(":on", true).await.unwrap());
    let input = handle.state_with(ReadMode::Input).await.unwrap();

    assert!(panel.is_on());
    assert_eq!(input.get("on"), Some(&AttributeValue::Bool(true)));
    assert_eq!(input.get("brightness"), Some(&AttributeValue::Float(100.0)));
}

#[tokio::test]
async fn should_publish_output_then_input_events() {
    let stack = Stack::new().await;
    let mut rx = stack.bus.subscribe();
    let handle = stack.light();
    let identity = handle.bind(Box::new(VirtualLight::new("lamp-1"))).await.unwrap();

    handle
        .update(
            vec![("brightness".to_string(), AttributeValue::Float(40.0))],
            TransactionOptions::default(),
        )
        .await
        .unwrap();
    handle.state().await.unwrap();

    let events = drain(&mut rx);
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    let output = kinds
        .iter()
        .position(|k| *k == EventKind::OutputStateChanged)
        .unwrap();
    let input = kinds
        .iter()
        .position(|k| *k == EventKind::InputStateChanged)
        .unwrap();
    assert!(output < input);
    assert_eq!(events[output].changes.len(), 2, "dimming also switches on");
    assert!(
        events
            .iter()
            .all(|e| e.thing_id.as_deref() == Some(identity.thing_id.as_str()))
    );
}

#[tokio::test]
async fn should_pick_up_manual_toggle() {
    let stack = Stack::new().await;
    let handle = stack.light();
    let light = VirtualLight::new("lamp-1");
    let panel = light.panel();
    handle.bind(Box::new(light)).await.unwrap();

    panel.toggle();

    assert_eq!(
        handle.get(":on").await.unwrap(),
        Some(AttributeValue::Bool(true))
    );
}

#[tokio::test]
async fn should_reject_out_of_range_brightness() {
    let stack = Stack::new().await;
    let handle = stack.light();
    let light = VirtualLight::new("lamp-1");
    let panel = light.panel();
    handle.bind(Box::new(light)).await.unwrap();

    let result = handle.set("brightness", 140).await;

    assert!(matches!(result, Err(ThingError::Validation(_))));
    assert!((panel.brightness() - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn should_disconnect_unreachable_light() {
    let stack = Stack::new().await;
    let handle = stack.light();
    let light = VirtualLight::new("lamp-1");
    let panel = light.panel();
    handle.bind(Box::new(light)).await.unwrap();

    panel.set_reachable(false);

    assert!(!handle.check_reachable().await.unwrap());
    assert_eq!(handle.unbind().await.unwrap(), None);
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_read_temperature_on_pull() {
    let stack = Stack::new().await;
    let handle = stack.sensor();
    handle
        .bind(Box::new(VirtualSensor::new("thermo-1")))
        .await
        .unwrap();

    handle.pull().await.unwrap();

    assert_eq!(
        handle.get(":temperature").await.unwrap(),
        Some(AttributeValue::Float(21.5))
    );
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_keep_metadata_across_restarts() {
    let stack = Stack::new().await;

    let first = stack.light();
    first
        .bind(Box::new(VirtualLight::new("lamp-1")))
        .await
        .unwrap();
    first
        .update_meta(
            vec![(metadata::LOCATION.to_string(), serde_json::json!("hallway"))],
            MetaOptions::stamped(),
        )
        .await
        .unwrap();
    first.shutdown().await.unwrap();

    let second = stack.light();
    second
        .bind(Box::new(VirtualLight::new("lamp-1")))
        .await
        .unwrap();
    let meta = second.meta().await.unwrap();

    assert_eq!(meta[metadata::LOCATION].value, serde_json::json!("hallway"));
}

#[tokio::test]
async fn should_not_share_metadata_between_devices() {
    let stack = Stack::new().await;

    let lamp = stack.light();
    lamp.bind(Box::new(VirtualLight::new("lamp-1")))
        .await
        .unwrap();
    lamp.update_meta(
        vec![(metadata::NAME.to_string(), serde_json::json!("Lamp"))],
        MetaOptions::stamped(),
    )
    .await
    .unwrap();

    let other = stack.light();
    other
        .bind(Box::new(VirtualLight::new("lamp-2")))
        .await
        .unwrap();

    assert!(other.meta().await.unwrap().is_empty());
}

#[tokio::test]
async fn should_refuse_commands_after_shutdown() {
    let stack = Stack::new().await;
    let handle = stack.sensor();

    assert_eq!(handle.shutdown().await.unwrap(), None);
    assert!(matches!(handle.pull().await, Err(ThingError::Invariant(_))));
}
