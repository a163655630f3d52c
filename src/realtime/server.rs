//! Subscription server.
//!
//! # Responsibilities
//! - Track connected transports and their room membership
//! - Bind subscriptions to shared topic-controller instances
//! - Forward connection-scoped events to the bound instance
//! - Tear everything down at shutdown

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::context::AppContext;
use crate::lifecycle::shutdown::{Shutdown, ShutdownSignal};
use crate::observability::metrics;
use crate::realtime::connection::{ClientHandle, Connection, ConnectionId};
use crate::realtime::controller::TopicController;
use crate::realtime::protocol::{ClientEvent, ServerEvent};
use crate::registry::{resolve_arguments, Captures, ControllerKey, ParamKind, TopicRoute};
use crate::routing::PathPattern;
use crate::services::ConstructionError;

/// Errors surfaced to the transport while handling client events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("Unknown connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("No topic route accepts topic {0:?}")]
    NoRoute(String),

    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

/// Broadcast room of a topic value.
pub fn room_name(topic: &str) -> String {
    format!("topic-{topic}")
}

type InstanceKey = (ControllerKey, String);

struct ClientState {
    handle: ClientHandle,
    room: Option<String>,
    controller: Option<Arc<dyn TopicController>>,
}

/// Multiplexes client sessions over per-topic controller instances.
pub struct SubscriptionServer {
    context: Arc<AppContext>,
    clients: Mutex<HashMap<ConnectionId, ClientState>>,
    rooms: Mutex<HashMap<String, HashSet<ConnectionId>>>,
    instances: DashMap<InstanceKey, Arc<dyn TopicController>>,
    shutdown: Shutdown,
}

impl SubscriptionServer {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            context,
            clients: Mutex::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
            instances: DashMap::new(),
            shutdown: Shutdown::new(),
        }
    }

    /// Declare the topic route of `C`.
    pub fn register_topic_controller<C: TopicController>(&self) -> &Self {
        C::declare(self.context.registry());
        self
    }

    /// Resolves when the server has been shut down.
    pub fn closed(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Register a freshly accepted transport.
    pub fn connect(&self, handle: ClientHandle) {
        let id = handle.id();
        if self.shutdown.is_triggered() {
            handle.disconnect();
            return;
        }
        lock(&self.clients).insert(
            id,
            ClientState {
                handle,
                room: None,
                controller: None,
            },
        );
        metrics::record_connections(self.connection_count());
        tracing::info!(connection_id = %id, "Client connected");
    }

    /// Dispatch one client event.
    pub fn handle_event(&self, id: ConnectionId, event: ClientEvent) -> Result<(), SubscribeError> {
        match event {
            ClientEvent::SubscribeTopic { topic } => self.subscribe(id, &topic),
            ClientEvent::GetTime => {
                match self.bound_controller(id)? {
                    Some(controller) => controller.request_update(id),
                    None => tracing::debug!(connection_id = %id, "get-time before subscribe ignored"),
                }
                Ok(())
            }
            ClientEvent::ChangeTopic { topic } => {
                match self.bound_controller(id)? {
                    Some(controller) => controller.change_topic(id, &topic),
                    None => tracing::debug!(connection_id = %id, "change-topic before subscribe ignored"),
                }
                Ok(())
            }
        }
    }

    /// Subscribe connection `id` to `topic`.
    pub fn subscribe(&self, id: ConnectionId, topic: &str) -> Result<(), SubscribeError> {
        let (handle, previous) = {
            let mut clients = lock(&self.clients);
            let state = clients
                .get_mut(&id)
                .ok_or(SubscribeError::UnknownConnection(id))?;
            let previous = (state.controller.take(), state.room.take());
            (state.handle.clone(), previous)
        };
        self.release(id, previous.0, previous.1);

        let room = room_name(topic);
        self.join(&room, id);
        if let Some(state) = lock(&self.clients).get_mut(&id) {
            state.room = Some(room);
        }

        let Some(route) = self
            .context
            .registry()
            .topic_routes()
            .into_iter()
            .find(TopicRoute::accepts_topic)
        else {
            tracing::warn!(connection_id = %id, topic = %topic, "No topic route matched");
            handle.emit(ServerEvent::error(topic, format!("No handler found for topic: {topic}")));
            return Err(SubscribeError::NoRoute(topic.to_string()));
        };

        let controller = match self.instance_for(&route, topic) {
            Ok(controller) => controller,
            Err(e) => {
                tracing::error!(
                    connection_id = %id,
                    topic = %topic,
                    controller = %route.controller,
                    error = %e,
                    "Topic controller construction failed"
                );
                handle.emit(ServerEvent::error(topic, "Failed to initialise topic handler"));
                return Err(e.into());
            }
        };

        if let Some(state) = lock(&self.clients).get_mut(&id) {
            state.controller = Some(Arc::clone(&controller));
        }
        tracing::info!(connection_id = %id, topic = %topic, controller = %route.controller, "Subscribed");
        controller.on_connect(Connection::new(handle, topic));
        Ok(())
    }

    /// Forget connection `id`, stopping its updates.
    pub fn disconnect(&self, id: ConnectionId) {
        let Some(state) = lock(&self.clients).remove(&id) else {
            return;
        };
        self.release(id, state.controller, state.room);
        metrics::record_connections(self.connection_count());
        tracing::info!(connection_id = %id, "Client disconnected");
    }

    /// Transport-level failure on `id`; the transport decides whether to close.
    pub fn transport_error(&self, id: ConnectionId, error: &dyn std::error::Error) {
        tracing::warn!(connection_id = %id, error = %error, "Transport error");
    }

    /// Emit `event` to every member of `topic`'s room.
    pub fn broadcast(&self, topic: &str, event: &ServerEvent) -> usize {
        let members: Vec<ConnectionId> = lock(&self.rooms)
            .get(&room_name(topic))
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();

        let clients = lock(&self.clients);
        members
            .iter()
            .filter_map(|id| clients.get(id))
            .filter(|state| state.handle.emit(event.clone()))
            .count()
    }

    pub fn room_size(&self, topic: &str) -> usize {
        lock(&self.rooms)
            .get(&room_name(topic))
            .map(HashSet::len)
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        lock(&self.clients).len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// The cached instance of `controller` for `topic`, if one exists.
    pub fn instance(&self, controller: ControllerKey, topic: &str) -> Option<Arc<dyn TopicController>> {
        self.instances
            .get(&(controller, topic.to_string()))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Clean up every controller instance, then close the transport.
    ///
    /// A failing cleanup is logged and does not stop the others.
    pub fn shutdown(&self) {
        let instances: Vec<(InstanceKey, Arc<dyn TopicController>)> = self
            .instances
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        tracing::info!(instances = instances.len(), "Cleaning up topic controllers");
        for ((controller, topic), instance) in instances {
            if let Err(e) = instance.cleanup() {
                tracing::error!(controller = %controller, topic = %topic, error = %e, "Cleanup failed");
                continue;
            }
        }
        self.instances.clear();
        metrics::record_topic_instances(0);

        let clients: Vec<ClientState> = lock(&self.clients).drain().map(|(_, s)| s).collect();
        for state in &clients {
            state.handle.disconnect();
        }
        lock(&self.rooms).clear();
        metrics::record_connections(0);

        self.shutdown.trigger();
        tracing::info!("Subscription server closed");
    }

    fn bound_controller(&self, id: ConnectionId) -> Result<Option<Arc<dyn TopicController>>, SubscribeError> {
        lock(&self.clients)
            .get(&id)
            .map(|state| state.controller.clone())
            .ok_or(SubscribeError::UnknownConnection(id))
    }

    fn instance_for(&self, route: &TopicRoute, topic: &str) -> Result<Arc<dyn TopicController>, ConstructionError> {
        let key = (route.controller, topic.to_string());
        if let Some(existing) = self.instances.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }

        // Every path parameter of a topic controller receives the topic,
        // whether or not its name appears in the pattern.
        let mut captures = Captures::new();
        for name in PathPattern::parse(&route.pattern).param_names() {
            captures.push(name, topic);
        }
        for spec in &route.parameters {
            if let (ParamKind::PathParam, Some(name)) = (spec.kind, spec.literal_name.as_deref()) {
                if captures.get(name).is_none() {
                    captures.push(name, topic);
                }
            }
        }
        let args = resolve_arguments(&route.parameters, &captures, self.context.services())?;

        let entry = self.instances.entry(key).or_try_insert_with(|| {
            tracing::debug!(controller = %route.controller, topic = %topic, "Creating topic controller");
            (route.factory)(&args)
        })?;
        let instance = Arc::clone(entry.value());
        drop(entry);

        metrics::record_topic_instances(self.instances.len());
        Ok(instance)
    }

    fn join(&self, room: &str, id: ConnectionId) {
        lock(&self.rooms).entry(room.to_string()).or_default().insert(id);
    }

    fn release(&self, id: ConnectionId, controller: Option<Arc<dyn TopicController>>, room: Option<String>) {
        if let Some(controller) = controller {
            controller.on_disconnect(id);
        }
        if let Some(room) = room {
            let mut rooms = lock(&self.rooms);
            if let Some(members) = rooms.get_mut(&room) {
                members.remove(&id);
                if members.is_empty() {
                    rooms.remove(&room);
                }
            }
        }
    }
}

impl std::fmt::Debug for SubscriptionServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionServer")
            .field("connections", &self.connection_count())
            .field("instances", &self.instance_count())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::TimeTopicController;
    use crate::realtime::connection::Outbound;
    use crate::realtime::controller::CleanupError;
    use crate::registry::{Arguments, MetadataRegistry, Param};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    fn server() -> SubscriptionServer {
        let server = SubscriptionServer::new(AppContext::shared());
        server.register_topic_controller::<TimeTopicController>();
        server
    }

    fn client(server: &SubscriptionServer) -> (ConnectionId, UnboundedReceiver<Outbound>) {
        let (handle, rx) = ClientHandle::channel();
        let id = handle.id();
        server.connect(handle);
        (id, rx)
    }

    async fn next_event(rx: &mut UnboundedReceiver<Outbound>) -> ServerEvent {
        match timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(Outbound::Event(event))) => event,
            other => panic!("expected an event, got {other:?}"),
        }
    }

    struct Unbuildable;

    impl TopicController for Unbuildable {
        fn declare(registry: &MetadataRegistry) {
            registry.register_topic_route::<Self>("/broken/:id", vec![Param::path("id")]);
        }

        fn construct(_args: &Arguments) -> Result<Self, ConstructionError> {
            Err(ConstructionError::Failed {
                target: "Unbuildable".into(),
                reason: "boom".into(),
            })
        }

        fn on_connect(&self, _connection: Connection) {}
        fn on_disconnect(&self, _id: ConnectionId) {}
        fn request_update(&self, _id: ConnectionId) {}
        fn change_topic(&self, _id: ConnectionId, _topic: &str) {}

        fn connected_count(&self) -> usize {
            0
        }
    }

    /// Manifest names its path parameter differently from the pattern.
    struct Renamed {
        timezone: String,
    }

    impl TopicController for Renamed {
        fn declare(registry: &MetadataRegistry) {
            registry.register_topic_route::<Self>("/clock/:zone", vec![Param::path("timezone")]);
        }

        fn construct(args: &Arguments) -> Result<Self, ConstructionError> {
            let timezone = args.path(0).ok_or_else(|| ConstructionError::MissingArgument {
                target: "Renamed".into(),
                index: 0,
            })?;
            Ok(Self {
                timezone: timezone.to_string(),
            })
        }

        fn on_connect(&self, connection: Connection) {
            connection
                .handle()
                .emit(ServerEvent::time_update(&self.timezone, "bound".into()));
        }

        fn on_disconnect(&self, _id: ConnectionId) {}
        fn request_update(&self, _id: ConnectionId) {}
        fn change_topic(&self, _id: ConnectionId, _topic: &str) {}

        fn connected_count(&self) -> usize {
            0
        }
    }

    static CLEANUPS: AtomicUsize = AtomicUsize::new(0);

    /// Fails cleanup for topic "bad", counts every attempt.
    struct Flaky {
        topic: String,
    }

    impl TopicController for Flaky {
        fn declare(registry: &MetadataRegistry) {
            registry.register_topic_route::<Self>("/flaky/:topic", vec![Param::path("topic")]);
        }

        fn construct(args: &Arguments) -> Result<Self, ConstructionError> {
            Ok(Self {
                topic: args.path(0).unwrap_or_default().to_string(),
            })
        }

        fn on_connect(&self, _connection: Connection) {}
        fn on_disconnect(&self, _id: ConnectionId) {}
        fn request_update(&self, _id: ConnectionId) {}
        fn change_topic(&self, _id: ConnectionId, _topic: &str) {}

        fn connected_count(&self) -> usize {
            0
        }

        fn cleanup(&self) -> Result<(), CleanupError> {
            CLEANUPS.fetch_add(1, Ordering::SeqCst);
            if self.topic == "bad" {
                return Err(CleanupError {
                    controller: "Flaky".into(),
                    reason: "stuck".into(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_pushes_immediately_then_every_second() {
        let server = server();
        let (id, mut rx) = client(&server);

        server.subscribe(id, "Asia/Tokyo").unwrap();
        let first = next_event(&mut rx).await;
        assert_eq!(first.topic(), "Asia/Tokyo");
        assert!(rx.try_recv().is_err());

        for _ in 0..3 {
            tokio::time::advance(Duration::from_millis(1000)).await;
            assert!(matches!(next_event(&mut rx).await, ServerEvent::TimeUpdate(_)));
        }
        assert_eq!(server.room_size("Asia/Tokyo"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_events_after_disconnect() {
        let server = server();
        let (id, mut rx) = client(&server);
        server.subscribe(id, "UTC").unwrap();
        next_event(&mut rx).await;

        server.disconnect(id);
        assert_eq!(server.connection_count(), 0);
        assert_eq!(server.room_size("UTC"), 0);

        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_topic_shares_instance() {
        let server = server();
        let (a, mut rx_a) = client(&server);
        let (b, mut rx_b) = client(&server);

        server.subscribe(a, "Europe/London").unwrap();
        server.subscribe(b, "Europe/London").unwrap();
        next_event(&mut rx_a).await;
        next_event(&mut rx_b).await;

        assert_eq!(server.instance_count(), 1);
        let instance = server
            .instance(ControllerKey::of::<TimeTopicController>(), "Europe/London")
            .unwrap();
        assert_eq!(instance.connected_count(), 2);
        assert_eq!(server.room_size("Europe/London"), 2);

        let (c, mut rx_c) = client(&server);
        server.subscribe(c, "America/New_York").unwrap();
        next_event(&mut rx_c).await;
        assert_eq!(server.instance_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_releases_previous_binding() {
        let server = server();
        let (id, mut rx) = client(&server);
        server.subscribe(id, "UTC").unwrap();
        next_event(&mut rx).await;

        server.subscribe(id, "Asia/Tokyo").unwrap();
        assert_eq!(next_event(&mut rx).await.topic(), "Asia/Tokyo");
        assert_eq!(server.room_size("UTC"), 0);

        let old = server
            .instance(ControllerKey::of::<TimeTopicController>(), "UTC")
            .unwrap();
        assert_eq!(old.connected_count(), 0);

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(next_event(&mut rx).await.topic(), "Asia/Tokyo");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_route_emits_error() {
        let server = SubscriptionServer::new(AppContext::shared());
        let (id, mut rx) = client(&server);

        let err = server.subscribe(id, "UTC").unwrap_err();
        assert_eq!(err, SubscribeError::NoRoute("UTC".into()));

        match next_event(&mut rx).await {
            ServerEvent::Error(error) => assert_eq!(error.error, "No handler found for topic: UTC"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(server.room_size("UTC"), 1);
    }

    #[tokio::test]
    async fn test_construction_failure_emits_error() {
        let server = SubscriptionServer::new(AppContext::shared());
        server.register_topic_controller::<Unbuildable>();
        let (id, mut rx) = client(&server);

        let err = server.subscribe(id, "x").unwrap_err();
        assert!(matches!(err, SubscribeError::Construction(ConstructionError::Failed { .. })));
        assert!(next_event(&mut rx).await.is_error());
        assert_eq!(server.instance_count(), 0);
    }

    #[tokio::test]
    async fn test_path_param_bound_to_topic_regardless_of_name() {
        let server = SubscriptionServer::new(AppContext::shared());
        server.register_topic_controller::<Renamed>();
        let (id, mut rx) = client(&server);

        server.subscribe(id, "UTC").unwrap();
        assert_eq!(next_event(&mut rx).await.topic(), "UTC");
        assert_eq!(server.instance_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_connection() {
        let server = server();
        let id = ConnectionId::new();
        assert_eq!(
            server.handle_event(id, ClientEvent::GetTime),
            Err(SubscribeError::UnknownConnection(id))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_before_subscribe_are_ignored() {
        let server = server();
        let (id, mut rx) = client(&server);

        server.handle_event(id, ClientEvent::GetTime).unwrap();
        server
            .handle_event(id, ClientEvent::ChangeTopic { topic: "UTC".into() })
            .unwrap();
        assert!(rx.try_recv().is_err());

        server
            .handle_event(id, ClientEvent::SubscribeTopic { topic: "UTC".into() })
            .unwrap();
        next_event(&mut rx).await;
        server.handle_event(id, ClientEvent::GetTime).unwrap();
        assert_eq!(next_event(&mut rx).await.topic(), "UTC");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_room_members_only() {
        let server = SubscriptionServer::new(AppContext::shared());
        let (a, mut rx_a) = client(&server);
        let (b, mut rx_b) = client(&server);
        // No routes: both stay in their rooms after the error event.
        let _ = server.subscribe(a, "UTC");
        let _ = server.subscribe(b, "Asia/Tokyo");
        next_event(&mut rx_a).await;
        next_event(&mut rx_b).await;

        let sent = server.broadcast("UTC", &ServerEvent::time_update("UTC", "now".into()));
        assert_eq!(sent, 1);
        assert_eq!(next_event(&mut rx_a).await.topic(), "UTC");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_continues_past_failing_cleanup() {
        CLEANUPS.store(0, Ordering::SeqCst);
        let server = SubscriptionServer::new(AppContext::shared());
        server.register_topic_controller::<Flaky>();

        let mut receivers = Vec::new();
        for topic in ["bad", "good"] {
            let (id, rx) = client(&server);
            server.subscribe(id, topic).unwrap();
            receivers.push(rx);
        }
        assert_eq!(server.instance_count(), 2);

        let mut closed = server.closed();
        server.shutdown();

        assert_eq!(CLEANUPS.load(Ordering::SeqCst), 2);
        assert_eq!(server.instance_count(), 0);
        assert_eq!(server.connection_count(), 0);
        assert!(server.is_shut_down());
        closed.recv().await;

        for rx in &mut receivers {
            assert_eq!(rx.recv().await, Some(Outbound::Close));
        }
    }

    #[tokio::test]
    async fn test_connect_after_shutdown_closes() {
        let server = server();
        server.shutdown();

        let (id, mut rx) = client(&server);
        assert_eq!(server.connection_count(), 0);
        assert_eq!(rx.recv().await, Some(Outbound::Close));
        assert!(server.handle_event(id, ClientEvent::GetTime).is_err());
    }
}
