//! Thing runtime: a single task owns each [`Thing`].
//!
//! [`ThingHandle::spawn`] moves a thing into a tokio task. Every operation
//! travels over an `mpsc` channel and is answered through a `oneshot`, so
//! the thing is only ever touched by one task and needs no locking.
//!
//! Drivers deliver readings through a [`PulledCallback`] that feeds a
//! separate unbounded channel; the task drains it before the next command,
//! so a reading a driver produced while handling a command is visible to
//! the command that follows. Events raised by the thing's listeners are
//! collected during a command and published once the command is done.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use thinghub_domain::attribute::{AttributeValue, Changes};
use thinghub_domain::driver::{Driver, PulledCallback};
use thinghub_domain::error::{InvariantError, ThingError};
use thinghub_domain::event::Event;
use thinghub_domain::identity::Identity;
use thinghub_domain::metadata::MetaOptions;
use thinghub_domain::model::ThingType;
use thinghub_domain::thing::{
    AttributeChange, EventKind, ReadMode, StateSnapshot, Thing, TransactionOptions,
};

use crate::ports::{EventPublisher, MetaDocument, MetadataStore};
use crate::services::MetadataService;

const COMMAND_CAPACITY: usize = 32;

type Outbox = Arc<Mutex<Vec<(EventKind, Vec<AttributeChange>)>>>;

enum Command {
    Get {
        key: String,
        reply: oneshot::Sender<Option<AttributeValue>>,
    },
    Set {
        key: String,
        value: AttributeValue,
        options: Option<TransactionOptions>,
        reply: oneshot::Sender<Result<bool, ThingError>>,
    },
    Update {
        changes: Changes,
        options: TransactionOptions,
        reply: oneshot::Sender<Result<(), ThingError>>,
    },
    State {
        mode: ReadMode,
        reply: oneshot::Sender<StateSnapshot>,
    },
    Pulled(Option<Changes>),
    Pull,
    UpdateMeta {
        values: Vec<(String, serde_json::Value)>,
        options: MetaOptions,
        reply: oneshot::Sender<Vec<String>>,
    },
    Meta {
        reply: oneshot::Sender<MetaDocument>,
    },
    Bind {
        driver: Box<dyn Driver>,
        reply: oneshot::Sender<Identity>,
    },
    Unbind {
        reply: oneshot::Sender<Option<Duration>>,
    },
    CheckReachable {
        reply: oneshot::Sender<bool>,
    },
    Identity {
        reply: oneshot::Sender<Option<Identity>>,
    },
    Shutdown {
        reply: oneshot::Sender<Option<Duration>>,
    },
}

/// Cloneable handle onto a thing owned by a runtime task.
///
/// Every method fails with [`ThingError::Invariant`] once the task has
/// stopped.
#[derive(Clone)]
pub struct ThingHandle {
    commands: mpsc::Sender<Command>,
    thing_type: ThingType,
}

impl ThingHandle {
    /// Move `thing` into a new task on the current tokio runtime.
    ///
    /// Metadata is restored from `store` whenever a driver is bound and
    /// saved back after every metadata change; every event the thing
    /// raises is handed to `publisher`.
    pub fn spawn<S, P>(thing: Thing, store: S, publisher: P) -> Self
    where
        S: MetadataStore + Send + Sync + 'static,
        P: EventPublisher + Send + Sync + 'static,
    {
        let thing_type = thing.thing_type().clone();
        let (commands, receiver) = mpsc::channel(COMMAND_CAPACITY);
        let (pulled_tx, pulled_rx) = mpsc::unbounded_channel();

        let task = ThingTask::new(thing, MetadataService::new(store), publisher, pulled_tx);
        tokio::spawn(task.run(receiver, pulled_rx));

        Self {
            commands,
            thing_type,
        }
    }

    /// Type of the owned thing.
    #[must_use]
    pub fn thing_type(&self) -> &ThingType {
        &self.thing_type
    }

    /// Whether the runtime task is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ThingError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| stopped())?;
        response.await.map_err(|_| stopped())
    }

    async fn notify(&self, command: Command) -> Result<(), ThingError> {
        self.commands.send(command).await.map_err(|_| stopped())
    }

    /// Read one attribute value (see [`Thing::get`]).
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn get(&self, key: impl Into<String>) -> Result<Option<AttributeValue>, ThingError> {
        let key = key.into();
        self.request(|reply| Command::Get { key, reply }).await
    }

    /// Write one attribute value immediately (see [`Thing::set`]).
    ///
    /// # Errors
    ///
    /// Returns the validation error raised by the thing, or
    /// [`ThingError::Invariant`] if the task has stopped.
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<bool, ThingError> {
        let (key, value) = (key.into(), value.into());
        self.request(|reply| Command::Set {
            key,
            value,
            options: None,
            reply,
        })
        .await?
    }

    /// Write one attribute value in its own transaction frame.
    ///
    /// # Errors
    ///
    /// Same as [`ThingHandle::set`].
    pub async fn set_with(
        &self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
        options: TransactionOptions,
    ) -> Result<bool, ThingError> {
        let (key, value) = (key.into(), value.into());
        self.request(|reply| Command::Set {
            key,
            value,
            options: Some(options),
            reply,
        })
        .await?
    }

    /// Apply a batch atomically (see [`Thing::update`]).
    ///
    /// # Errors
    ///
    /// Returns the validation error that rejected the batch, or
    /// [`ThingError::Invariant`] if the task has stopped.
    pub async fn update(
        &self,
        changes: Changes,
        options: TransactionOptions,
    ) -> Result<(), ThingError> {
        self.request(|reply| Command::Update {
            changes,
            options,
            reply,
        })
        .await?
    }

    /// Snapshot of the preferred values.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn state(&self) -> Result<StateSnapshot, ThingError> {
        self.state_with(ReadMode::Preferred).await
    }

    /// Snapshot of the values read in `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn state_with(&self, mode: ReadMode) -> Result<StateSnapshot, ThingError> {
        self.request(|reply| Command::State { mode, reply }).await
    }

    /// Feed device data as if the bound driver had delivered it.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn pulled(&self, changes: Option<Changes>) -> Result<(), ThingError> {
        self.notify(Command::Pulled(changes)).await
    }

    /// Ask the bound driver for fresh data.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn pull(&self) -> Result<(), ThingError> {
        self.notify(Command::Pull).await
    }

    /// Merge metadata values; changes are persisted and published.
    /// Returns the changed keys.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn update_meta(
        &self,
        values: Vec<(String, serde_json::Value)>,
        options: MetaOptions,
    ) -> Result<Vec<String>, ThingError> {
        self.request(|reply| Command::UpdateMeta {
            values,
            options,
            reply,
        })
        .await
    }

    /// Applied metadata entries.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn meta(&self) -> Result<MetaDocument, ThingError> {
        self.request(|reply| Command::Meta { reply }).await
    }

    /// Bind `driver`, replacing the current one, and restore metadata
    /// persisted for the resulting identity.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn bind(&self, driver: Box<dyn Driver>) -> Result<Identity, ThingError> {
        self.request(|reply| Command::Bind { driver, reply }).await
    }

    /// Detach the bound driver (see [`Thing::unbind`]).
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn unbind(&self) -> Result<Option<Duration>, ThingError> {
        self.request(|reply| Command::Unbind { reply }).await
    }

    /// Probe the bound driver (see [`Thing::check_reachable`]).
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn check_reachable(&self) -> Result<bool, ThingError> {
        self.request(|reply| Command::CheckReachable { reply }).await
    }

    /// Identity resolved by the first bind.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task has stopped.
    pub async fn identity(&self) -> Result<Option<Identity>, ThingError> {
        self.request(|reply| Command::Identity { reply }).await
    }

    /// Unbind the driver and stop the task. Returns the driver's
    /// requested wait time, if one was bound.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the task had already stopped.
    pub async fn shutdown(&self) -> Result<Option<Duration>, ThingError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

impl std::fmt::Debug for ThingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThingHandle")
            .field("thing", &self.thing_type.code())
            .field("running", &self.is_running())
            .finish()
    }
}

fn stopped() -> ThingError {
    InvariantError("thing task has stopped".to_string()).into()
}

struct ThingTask<S, P> {
    thing: Thing,
    metadata: MetadataService<S>,
    publisher: P,
    pulled: mpsc::UnboundedSender<Option<Changes>>,
    outbox: Outbox,
}

impl<S, P> ThingTask<S, P>
where
    S: MetadataStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    fn new(
        mut thing: Thing,
        metadata: MetadataService<S>,
        publisher: P,
        pulled: mpsc::UnboundedSender<Option<Changes>>,
    ) -> Self {
        let outbox = Outbox::default();

        let sink = Arc::clone(&outbox);
        thing.on(None, move |change| {
            collect(&sink, EventKind::AttributeChanged, vec![change.clone()]);
        });
        let sink = Arc::clone(&outbox);
        thing.on_change(move |change| collect(&sink, change.kind(), change.changes.clone()));
        let sink = Arc::clone(&outbox);
        thing.on_meta(move |_| collect(&sink, EventKind::MetaChanged, Vec::new()));

        Self {
            thing,
            metadata,
            publisher,
            pulled,
            outbox,
        }
    }

    fn callback(&self) -> PulledCallback {
        let sender = self.pulled.clone();
        Arc::new(move |changes| {
            if sender.send(changes).is_err() {
                tracing::debug!("pulled data dropped, thing task has stopped");
            }
        })
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut pulled: mpsc::UnboundedReceiver<Option<Changes>>,
    ) {
        tracing::debug!(thing = %self.thing.code(), "thing task started");
        let mut shutdown = None;

        loop {
            tokio::select! {
                biased;
                Some(changes) = pulled.recv() => self.thing.pulled(changes),
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        shutdown = Some(reply);
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
            self.flush().await;
        }

        drop(commands);
        let wait = self.thing.unbind();
        self.flush().await;
        tracing::debug!(thing = %self.thing.code(), "thing task stopped");
        if let Some(reply) = shutdown {
            let _ = reply.send(wait);
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Get { key, reply } => {
                let _ = reply.send(self.thing.get(&key));
            }
            Command::Set {
                key,
                value,
                options,
                reply,
            } => {
                let result = match options {
                    Some(options) => self.thing.set_with(&key, value, options),
                    None => self.thing.set(&key, value),
                };
                let _ = reply.send(result);
            }
            Command::Update {
                changes,
                options,
                reply,
            } => {
                let _ = reply.send(self.thing.update(changes, options));
            }
            Command::State { mode, reply } => {
                let _ = reply.send(self.thing.state_with(mode));
            }
            Command::Pulled(changes) => self.thing.pulled(changes),
            Command::Pull => self.thing.pull(),
            Command::UpdateMeta {
                values,
                options,
                reply,
            } => {
                let changed = self.thing.update_meta(values, options);
                if !changed.is_empty() {
                    self.persist_meta().await;
                }
                let _ = reply.send(changed);
            }
            Command::Meta { reply } => {
                let _ = reply.send(self.thing.meta().entries().clone());
            }
            Command::Bind { driver, reply } => {
                let identity = self.thing.bind(driver, self.callback());
                if let Err(err) = self.metadata.restore(&mut self.thing).await {
                    tracing::warn!(thing_id = %identity.thing_id, error = %err, "failed to restore metadata");
                }
                let _ = reply.send(identity);
            }
            Command::Unbind { reply } => {
                let _ = reply.send(self.thing.unbind());
            }
            Command::CheckReachable { reply } => {
                let _ = reply.send(self.thing.check_reachable());
            }
            Command::Identity { reply } => {
                let _ = reply.send(self.thing.identity().cloned());
            }
            Command::Shutdown { .. } => {}
        }
    }

    async fn persist_meta(&mut self) {
        let Some(id) = self.thing.identity().map(|identity| identity.id) else {
            tracing::debug!(thing = %self.thing.code(), "metadata not persisted, thing is not bound");
            return;
        };
        let metadata = self.thing.meta();
        if let Err(err) = self.metadata.persist(id, metadata).await {
            tracing::warn!(%id, error = %err, "failed to persist metadata");
        }
    }

    async fn flush(&mut self) {
        let pending = std::mem::take(
            &mut *self
                .outbox
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if pending.is_empty() {
            return;
        }

        let thing_id = self
            .thing
            .identity()
            .map(|identity| identity.thing_id.clone());
        for (kind, changes) in pending {
            let event = Event::new(kind, self.thing.code(), thing_id.clone(), changes);
            if let Err(err) = self.publisher.publish(event).await {
                tracing::warn!(thing = %self.thing.code(), error = %err, "failed to publish event");
            }
        }
    }
}

fn collect(outbox: &Outbox, kind: EventKind, changes: Vec<AttributeChange>) {
    outbox
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((kind, changes));
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use thinghub_domain::attribute::{Attribute, Change, Kind};
    use thinghub_domain::id::ThingId;
    use thinghub_domain::identity::DriverIdentity;
    use thinghub_domain::metadata::{self, MetaEntry};
    use thinghub_domain::thing::Direction;
    use thinghub_domain::time::now;

    use super::*;

    #[derive(Default)]
    struct InMemoryStore(Mutex<HashMap<ThingId, MetaDocument>>);

    impl MetadataStore for InMemoryStore {
        async fn load(&self, id: ThingId) -> Result<Option<MetaDocument>, ThingError> {
            Ok(self.0.lock().unwrap().get(&id).cloned())
        }

        async fn save(&self, id: ThingId, document: MetaDocument) -> Result<(), ThingError> {
            self.0.lock().unwrap().insert(id, document);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher(Mutex<Vec<Event>>);

    impl RecordingPublisher {
        fn kinds(&self) -> Vec<EventKind> {
            self.0.lock().unwrap().iter().map(|e| e.kind).collect()
        }

        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }
    }

    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, event: Event) -> Result<(), ThingError> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    /// Driver echoing every push back as a reading; pulls report brightness 42.
    #[derive(Default)]
    struct EchoDriver {
        callback: Option<PulledCallback>,
        pushes: Arc<Mutex<Vec<Changes>>>,
        reachable: bool,
    }

    impl EchoDriver {
        fn boxed(pushes: &Arc<Mutex<Vec<Changes>>>) -> Box<dyn Driver> {
            Box::new(Self {
                pushes: Arc::clone(pushes),
                reachable: true,
                ..Self::default()
            })
        }
    }

    impl Driver for EchoDriver {
        fn identity(&self) -> DriverIdentity {
            DriverIdentity::new("echo").field("serial", "e-1")
        }

        fn connect(&mut self, pulled: PulledCallback) {
            self.callback = Some(pulled);
        }

        fn push(&mut self, changes: &[Change]) {
            self.pushes.lock().unwrap().push(changes.to_vec());
            if let Some(callback) = &self.callback {
                callback(Some(changes.to_vec()));
            }
        }

        fn pull(&mut self) {
            if let Some(callback) = &self.callback {
                callback(Some(vec![("brightness".to_string(), AttributeValue::Int(42))]));
            }
        }

        fn disconnect(&mut self) -> Duration {
            Duration::from_millis(10)
        }

        fn reachable(&self) -> bool {
            self.reachable
        }
    }

    fn light() -> Thing {
        ThingType::builder("light")
            .with_attribute(Attribute::builder("on", Kind::Boolean).purpose(":on"))
            .with_attribute(
                Attribute::builder("brightness", Kind::Integer)
                    .purpose(":brightness")
                    .minimum(0.0)
                    .maximum(100.0),
            )
            .build()
            .unwrap()
            .instantiate()
    }

    fn spawn() -> (ThingHandle, Arc<InMemoryStore>, Arc<RecordingPublisher>) {
        let store = Arc::new(InMemoryStore::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let handle = ThingHandle::spawn(light(), Arc::clone(&store), Arc::clone(&publisher));
        (handle, store, publisher)
    }

    #[tokio::test]
    async fn should_push_set_value_and_read_back_echo() {
        let (handle, _, publisher) = spawn();
        let pushes = Arc::new(Mutex::new(Vec::new()));
        handle.bind(EchoDriver::boxed(&pushes)).await.unwrap();

        assert!(handle.set(":on", true).await.unwrap());
        let input = handle.state_with(ReadMode::Input).await.unwrap();

        assert_eq!(input.get("on"), Some(&AttributeValue::Bool(true)));
        assert_eq!(
            *pushes.lock().unwrap(),
            vec![vec![("on".to_string(), AttributeValue::Bool(true))]]
        );
        assert_eq!(
            publisher.kinds(),
            vec![
                EventKind::AttributeChanged,
                EventKind::OutputStateChanged,
                EventKind::AttributeChanged,
                EventKind::InputStateChanged,
            ]
        );
    }

    #[tokio::test]
    async fn should_stamp_events_with_thing_identity() {
        let (handle, _, publisher) = spawn();
        let pushes = Arc::new(Mutex::new(Vec::new()));
        let identity = handle.bind(EchoDriver::boxed(&pushes)).await.unwrap();

        handle.set("brightness", 30).await.unwrap();
        handle.state().await.unwrap();

        let events = publisher.events();
        assert!(!events.is_empty());
        assert!(
            events
                .iter()
                .all(|e| e.thing_id.as_deref() == Some(identity.thing_id.as_str()))
        );
        let output = events
            .iter()
            .find(|e| e.kind == EventKind::OutputStateChanged)
            .unwrap();
        assert_eq!(output.changes[0].direction, Direction::Output);
        assert_eq!(output.changes[0].value, Some(AttributeValue::Int(30)));
    }

    #[tokio::test]
    async fn should_report_validation_errors() {
        let (handle, _, _) = spawn();

        let result = handle.set("brightness", 150).await;

        assert!(matches!(result, Err(ThingError::Validation(_))));
        assert_eq!(handle.get("brightness").await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_apply_update_as_one_push() {
        let (handle, _, _) = spawn();
        let pushes = Arc::new(Mutex::new(Vec::new()));
        handle.bind(EchoDriver::boxed(&pushes)).await.unwrap();

        handle
            .update(
                vec![
                    ("on".to_string(), AttributeValue::Bool(true)),
                    ("brightness".to_string(), AttributeValue::Int(80)),
                ],
                TransactionOptions::default(),
            )
            .await
            .unwrap();
        handle.state().await.unwrap();

        assert_eq!(pushes.lock().unwrap().len(), 1);
        assert_eq!(pushes.lock().unwrap()[0].len(), 2);
    }

    #[tokio::test]
    async fn should_deliver_pulled_readings() {
        let (handle, _, _) = spawn();
        let pushes = Arc::new(Mutex::new(Vec::new()));
        handle.bind(EchoDriver::boxed(&pushes)).await.unwrap();

        handle.pull().await.unwrap();

        assert_eq!(
            handle.get(":brightness").await.unwrap(),
            Some(AttributeValue::Int(42))
        );
        assert!(pushes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_accept_pulled_data_without_driver() {
        let (handle, _, publisher) = spawn();

        handle
            .pulled(Some(vec![("on".to_string(), AttributeValue::Bool(true))]))
            .await
            .unwrap();
        handle.pulled(None).await.unwrap();

        let input = handle.state_with(ReadMode::Input).await.unwrap();
        assert_eq!(input.get("on"), Some(&AttributeValue::Bool(true)));
        assert_eq!(publisher.kinds().last(), Some(&EventKind::MetaChanged));
    }

    #[tokio::test]
    async fn should_persist_and_publish_metadata_changes() {
        let (handle, store, publisher) = spawn();
        let pushes = Arc::new(Mutex::new(Vec::new()));
        let identity = handle.bind(EchoDriver::boxed(&pushes)).await.unwrap();

        let changed = handle
            .update_meta(
                vec![(metadata::NAME.to_string(), serde_json::json!("Desk lamp"))],
                MetaOptions::stamped(),
            )
            .await
            .unwrap();

        assert_eq!(changed, vec![metadata::NAME.to_string()]);
        let saved = store.load(identity.id).await.unwrap().unwrap();
        assert_eq!(saved[metadata::NAME].value, serde_json::json!("Desk lamp"));
        assert!(publisher.kinds().contains(&EventKind::MetaChanged));
    }

    #[tokio::test]
    async fn should_restore_metadata_on_bind() {
        let (handle, store, _) = spawn();
        let pushes = Arc::new(Mutex::new(Vec::new()));
        let id = ThingId::from_urn("urn:thing:echo:e-1:light");
        let mut document = MetaDocument::new();
        document.insert(
            metadata::LOCATION.to_string(),
            MetaEntry {
                value: serde_json::json!("office"),
                timestamp: Some(now()),
            },
        );
        store.save(id, document).await.unwrap();

        let identity = handle.bind(EchoDriver::boxed(&pushes)).await.unwrap();
        let meta = handle.meta().await.unwrap();

        assert_eq!(identity.id, id);
        assert_eq!(meta[metadata::LOCATION].value, serde_json::json!("office"));
    }

    #[tokio::test]
    async fn should_return_driver_wait_on_unbind() {
        let (handle, _, _) = spawn();
        let pushes = Arc::new(Mutex::new(Vec::new()));
        handle.bind(EchoDriver::boxed(&pushes)).await.unwrap();

        assert_eq!(
            handle.unbind().await.unwrap(),
            Some(Duration::from_millis(10))
        );
        assert_eq!(handle.unbind().await.unwrap(), None);
        assert!(!handle.check_reachable().await.unwrap());
    }

    #[tokio::test]
    async fn should_fail_with_invariant_error_after_shutdown() {
        let (handle, _, _) = spawn();
        let pushes = Arc::new(Mutex::new(Vec::new()));
        handle.bind(EchoDriver::boxed(&pushes)).await.unwrap();

        let wait = handle.shutdown().await.unwrap();

        assert_eq!(wait, Some(Duration::from_millis(10)));
        assert!(matches!(
            handle.get("on").await,
            Err(ThingError::Invariant(_))
        ));
        assert!(!handle.is_running());
    }
}
