//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Hold mounted controllers in mount order
//! - Find the first route matching method + path
//! - Resolve arguments and invoke the handler
//! - Turn handler results into an ApiResponse
//!
//! # Design Decisions
//! - Route metadata lives in the shared registry; the router only keeps
//!   controller instances
//! - Argument construction failures are internal errors (500)
//! - Explicit NotMatched; the transport owns the 404 payload

use axum::http::Method;
use std::fmt;
use std::sync::Arc;

use crate::context::AppContext;
use crate::http::response::ApiResponse;
use crate::registry::{resolve_arguments, Captures, ControllerKey, RouteEntry};
use crate::routing::handler::{Controller, HandlerError};
use crate::routing::matcher::PathPattern;

/// Path parameter echoed back on validation errors.
const TIMEZONE_PARAM: &str = "timezone";

/// Result of routing one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Matched(ApiResponse),
    NotMatched,
}

struct MountedController {
    key: ControllerKey,
    instance: Arc<dyn Controller>,
}

/// HTTP router over declaratively registered controllers.
pub struct Router {
    context: Arc<AppContext>,
    controllers: Vec<MountedController>,
}

impl Router {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            context,
            controllers: Vec::new(),
        }
    }

    /// Declare `controller`'s routes and mount the instance.
    pub fn mount<C: Controller>(&mut self, controller: C) -> &mut Self {
        C::declare(self.context.registry());
        let key = ControllerKey::of::<C>();
        tracing::info!(controller = %key, "Controller mounted");
        self.controllers.push(MountedController {
            key,
            instance: Arc::new(controller),
        });
        self
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// Route a request by method and raw (still percent-encoded) path.
    pub fn handle_request(&self, method: &Method, path: &str) -> RouteOutcome {
        let registry = self.context.registry();

        for mounted in &self.controllers {
            for route in registry.routes(mounted.key) {
                let (Some(route_method), Some(pattern)) = (&route.method, &route.path_pattern) else {
                    continue;
                };
                if route_method != method {
                    continue;
                }
                let Some(captures) = PathPattern::parse(pattern).matches(path) else {
                    continue;
                };

                tracing::debug!(
                    controller = %mounted.key,
                    handler = %route.handler,
                    pattern = %pattern,
                    "Route matched"
                );
                return RouteOutcome::Matched(self.invoke(mounted, &route, &captures));
            }
        }

        RouteOutcome::NotMatched
    }

    fn invoke(&self, mounted: &MountedController, route: &RouteEntry, captures: &Captures) -> ApiResponse {
        let args = match resolve_arguments(&route.parameters, captures, self.context.services()) {
            Ok(args) => args,
            Err(e) => {
                tracing::error!(handler = %route.handler, error = %e, "Argument resolution failed");
                return ApiResponse::internal(&e.to_string());
            }
        };

        match mounted.instance.invoke(&route.handler, &args) {
            Ok(Some(body)) => ApiResponse::ok(body),
            Ok(None) => ApiResponse::no_content(),
            Err(HandlerError::Validation { error, message }) => {
                tracing::debug!(handler = %route.handler, message = %message, "Validation error");
                ApiResponse::validation(&error, &message, captures.get(TIMEZONE_PARAM))
            }
            Err(e) => {
                tracing::error!(handler = %route.handler, error = %e, "Handler failed");
                ApiResponse::internal(&e.to_string())
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field(
                "controllers",
                &self.controllers.iter().map(|c| c.key).collect::<Vec<_>>(),
            )
            .finish()
    }
}
