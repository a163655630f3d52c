//! Metadata store.

use axum::http::Method;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::realtime::controller::{construct_topic_controller, TopicController, TopicFactory};
use crate::services::service::short_type_name;
use crate::services::ServiceId;

/// Identity of a controller type.
#[derive(Clone, Copy)]
pub struct ControllerKey {
    type_id: TypeId,
    name: &'static str,
}

impl ControllerKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ControllerKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ControllerKey {}

impl Hash for ControllerKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ControllerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ControllerKey").field(&self.name).finish()
    }
}

impl fmt::Display for ControllerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// How a positional argument is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Captured from the request path (or bound to the topic value).
    PathParam,
    /// Resolved from the service locator.
    InjectedService,
}

/// Declaration of one positional handler/constructor argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub index: usize,
    pub kind: ParamKind,
    pub literal_name: Option<String>,
    pub service: Option<ServiceId>,
}

impl ParameterSpec {
    pub fn path(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            kind: ParamKind::PathParam,
            literal_name: Some(name.into()),
            service: None,
        }
    }

    pub fn service(index: usize, service: ServiceId) -> Self {
        Self {
            index,
            kind: ParamKind::InjectedService,
            literal_name: None,
            service: Some(service),
        }
    }
}

/// Element of an ordered parameter manifest; the position is the index.
#[derive(Debug, Clone)]
pub enum Param {
    Path(String),
    Service(ServiceId),
}

impl Param {
    pub fn path(name: impl Into<String>) -> Self {
        Param::Path(name.into())
    }

    pub fn service(id: ServiceId) -> Self {
        Param::Service(id)
    }

    fn into_spec(self, index: usize) -> ParameterSpec {
        match self {
            Param::Path(name) => ParameterSpec::path(index, name),
            Param::Service(id) => ParameterSpec::service(index, id),
        }
    }
}

/// A handler's route metadata.
///
/// `method` and `path_pattern` stay `None` while only parameter
/// declarations have been seen; such entries never match a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub handler: String,
    pub method: Option<Method>,
    pub path_pattern: Option<String>,
    /// Sorted by index, one spec per index.
    pub parameters: Vec<ParameterSpec>,
}

impl RouteEntry {
    fn unbound(handler: &str) -> Self {
        Self {
            handler: handler.to_string(),
            method: None,
            path_pattern: None,
            parameters: Vec::new(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.method.is_some() && self.path_pattern.is_some()
    }

    fn upsert_parameter(&mut self, index: usize) -> &mut ParameterSpec {
        let pos = match self.parameters.binary_search_by_key(&index, |p| p.index) {
            Ok(pos) => pos,
            Err(pos) => {
                self.parameters.insert(
                    pos,
                    ParameterSpec {
                        index,
                        kind: ParamKind::PathParam,
                        literal_name: None,
                        service: None,
                    },
                );
                pos
            }
        };
        &mut self.parameters[pos]
    }
}

/// Subscription route of a topic controller type.
#[derive(Clone)]
pub struct TopicRoute {
    pub pattern: String,
    pub controller: ControllerKey,
    pub parameters: Vec<ParameterSpec>,
    pub(crate) factory: TopicFactory,
}

impl TopicRoute {
    /// True when the pattern has a `:param` segment able to carry a topic.
    pub fn accepts_topic(&self) -> bool {
        self.pattern
            .split('/')
            .any(|segment| segment.len() > 1 && segment.starts_with(':'))
    }
}

impl fmt::Debug for TopicRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicRoute")
            .field("pattern", &self.pattern)
            .field("controller", &self.controller)
            .field("parameters", &self.parameters)
            .finish()
    }
}

#[derive(Debug)]
struct ControllerRoutes {
    controller: ControllerKey,
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Default)]
struct Inner {
    controllers: Vec<ControllerRoutes>,
    topics: Vec<TopicRoute>,
}

impl Inner {
    fn entry(&mut self, controller: ControllerKey, handler: &str) -> &mut RouteEntry {
        let idx = match self
            .controllers
            .iter()
            .position(|c| c.controller == controller)
        {
            Some(idx) => idx,
            None => {
                self.controllers.push(ControllerRoutes {
                    controller,
                    routes: Vec::new(),
                });
                self.controllers.len() - 1
            }
        };

        let routes = &mut self.controllers[idx].routes;
        let pos = match routes.iter().position(|r| r.handler == handler) {
            Some(pos) => pos,
            None => {
                routes.push(RouteEntry::unbound(handler));
                routes.len() - 1
            }
        };
        &mut routes[pos]
    }
}

/// Store of route, parameter and topic metadata.
///
/// Shared through the application context; writes happen during
/// controller declaration, reads on every request.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    inner: RwLock<Inner>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `handler` of `controller` to `method` + `path_pattern`.
    ///
    /// Re-registration overwrites the method and path and keeps any
    /// parameter specs already declared for the handler.
    pub fn register_route(
        &self,
        controller: ControllerKey,
        method: Method,
        path_pattern: &str,
        handler: &str,
    ) {
        tracing::debug!(
            controller = %controller,
            method = %method,
            path = %path_pattern,
            handler = %handler,
            "Registering route"
        );
        let mut inner = self.write();
        let entry = inner.entry(controller, handler);
        entry.method = Some(method);
        entry.path_pattern = Some(path_pattern.to_string());
    }

    /// Declare argument `index` of `handler` as the path parameter `name`.
    pub fn register_path_param(
        &self,
        controller: ControllerKey,
        handler: &str,
        name: &str,
        index: usize,
    ) {
        let mut inner = self.write();
        let spec = inner.entry(controller, handler).upsert_parameter(index);
        spec.kind = ParamKind::PathParam;
        spec.literal_name = Some(name.to_string());
        spec.service = None;
    }

    /// Declare argument `index` of `handler` as an injected `service`.
    pub fn register_injected_service(
        &self,
        controller: ControllerKey,
        handler: &str,
        index: usize,
        service: ServiceId,
    ) {
        let mut inner = self.write();
        let spec = inner.entry(controller, handler).upsert_parameter(index);
        spec.kind = ParamKind::InjectedService;
        spec.service = Some(service);
        spec.literal_name = None;
    }

    /// Create or replace the topic route of the controller type `C`.
    ///
    /// `manifest` lists the constructor arguments in order.
    pub fn register_topic_route<C: TopicController>(&self, pattern: &str, manifest: Vec<Param>) {
        let controller = ControllerKey::of::<C>();
        let route = TopicRoute {
            pattern: pattern.to_string(),
            controller,
            parameters: manifest
                .into_iter()
                .enumerate()
                .map(|(index, param)| param.into_spec(index))
                .collect(),
            factory: construct_topic_controller::<C>,
        };

        tracing::debug!(controller = %controller, pattern = %pattern, "Registering topic route");
        let mut inner = self.write();
        match inner.topics.iter().position(|t| t.controller == controller) {
            Some(pos) => inner.topics[pos] = route,
            None => inner.topics.push(route),
        }
    }

    pub fn route(&self, controller: ControllerKey, handler: &str) -> Option<RouteEntry> {
        self.read()
            .controllers
            .iter()
            .find(|c| c.controller == controller)
            .and_then(|c| c.routes.iter().find(|r| r.handler == handler))
            .cloned()
    }

    /// Routes of `controller` in registration order.
    pub fn routes(&self, controller: ControllerKey) -> Vec<RouteEntry> {
        self.read()
            .controllers
            .iter()
            .find(|c| c.controller == controller)
            .map(|c| c.routes.clone())
            .unwrap_or_default()
    }

    pub fn controllers(&self) -> Vec<ControllerKey> {
        self.read().controllers.iter().map(|c| c.controller).collect()
    }

    pub fn topic_route(&self, controller: ControllerKey) -> Option<TopicRoute> {
        self.read()
            .topics
            .iter()
            .find(|t| t.controller == controller)
            .cloned()
    }

    /// Topic routes in registration order.
    pub fn topic_routes(&self) -> Vec<TopicRoute> {
        self.read().topics.clone()
    }

    pub fn clear(&self) {
        *self.write() = Inner::default();
    }
}
