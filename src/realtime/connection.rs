//! Client handles and per-connection subscription records.
//!
//! # Responsibilities
//! - Identify connections (UUID v4)
//! - Queue outbound events for the transport writer
//! - Own the periodic update timer of a subscription
//!
//! # Design Decisions
//! - Outbound queue is unbounded; emitting never blocks the caller
//! - A dropped transport turns emits into no-ops
//! - Dropping a Connection cancels its timer

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::realtime::protocol::ServerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Instruction for the transport writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Event(ServerEvent),
    /// Close the transport.
    Close,
}

/// Sending half of a client transport.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ClientHandle {
    pub fn new(id: ConnectionId, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { id, tx }
    }

    /// A handle with a fresh id and the receiver its transport drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(ConnectionId::new(), tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue `event`; false if the transport is gone.
    pub fn emit(&self, event: ServerEvent) -> bool {
        self.tx.send(Outbound::Event(event)).is_ok()
    }

    /// Ask the transport to close.
    pub fn disconnect(&self) {
        let _ = self.tx.send(Outbound::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// One client's subscription to a topic.
pub struct Connection {
    handle: ClientHandle,
    topic: Arc<Mutex<String>>,
    timer: Option<JoinHandle<()>>,
}

impl Connection {
    pub fn new(handle: ClientHandle, topic: impl Into<String>) -> Self {
        Self {
            handle,
            topic: Arc::new(Mutex::new(topic.into())),
            timer: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &ClientHandle {
        &self.handle
    }

    pub fn topic(&self) -> String {
        lock(&self.topic).clone()
    }

    /// Rebind the topic used by subsequent updates of this connection.
    pub fn set_topic(&self, topic: &str) {
        *lock(&self.topic) = topic.to_string();
    }

    /// Start calling `tick` every `period`, first call one period from now.
    ///
    /// Must be called inside a Tokio runtime. Replaces a running timer.
    pub fn start_timer<F>(&mut self, period: Duration, tick: F)
    where
        F: Fn(&ClientHandle, &str) + Send + Sync + 'static,
    {
        self.cancel_timer();

        let handle = self.handle.clone();
        let topic = Arc::clone(&self.topic);
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if handle.is_closed() {
                    break;
                }
                let current = lock(&topic).clone();
                tick(&handle, &current);
            }
        }));
    }

    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id())
            .field("topic", &self.topic())
            .field("timer", &self.has_timer())
            .finish()
    }
}

/// Connections held by one topic controller.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, connection: Connection) {
        lock(&self.connections).insert(connection.id(), connection);
    }

    pub fn remove(&self, id: ConnectionId) -> Option<Connection> {
        lock(&self.connections).remove(&id)
    }

    /// Run `f` on the connection `id`, if present.
    pub fn with<R>(&self, id: ConnectionId, f: impl FnOnce(&Connection) -> R) -> Option<R> {
        lock(&self.connections).get(&id).map(f)
    }

    /// Remove and return every connection.
    pub fn drain(&self) -> Vec<Connection> {
        lock(&self.connections).drain().map(|(_, c)| c).collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        lock(&self.connections).contains_key(&id)
    }

    pub fn len(&self) -> usize {
        lock(&self.connections).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.connections).is_empty()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
