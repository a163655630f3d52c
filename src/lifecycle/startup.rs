//! Startup orchestration.
//!
//! Builds the application graph from a validated [`ServiceConfig`]: the
//! shared context, the injectable services, the HTTP router with its
//! controllers, and the subscription server with its topic controllers.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::context::AppContext;
use crate::controllers::{IndexController, TimeController, TimeTopicController};
use crate::realtime::{SubscriptionServer, UpdateSchedule};
use crate::routing::Router;

/// Everything the transports need to serve traffic.
#[derive(Debug, Clone)]
pub struct Application {
    pub context: Arc<AppContext>,
    pub router: Arc<Router>,
    pub subscriptions: Arc<SubscriptionServer>,
}

impl Application {
    pub fn build(config: &ServiceConfig) -> Self {
        let context = AppContext::shared();
        context
            .services()
            .register(Arc::new(UpdateSchedule::every(config.realtime.update_interval())));

        let mut router = Router::new(Arc::clone(&context));
        router.mount(IndexController).mount(TimeController);

        let subscriptions = SubscriptionServer::new(Arc::clone(&context));
        subscriptions.register_topic_controller::<TimeTopicController>();

        tracing::info!(
            controllers = router.controller_count(),
            registered = context.registry().controllers().len(),
            topic_routes = context.registry().topic_routes().len(),
            "Application built"
        );

        Self {
            context,
            router: Arc::new(router),
            subscriptions: Arc::new(subscriptions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::schedule::DEFAULT_UPDATE_PERIOD;
    use crate::routing::RouteOutcome;
    use axum::http::{Method, StatusCode};
    use std::time::Duration;

    #[test]
    fn test_build_wires_routes() {
        let app = Application::build(&ServiceConfig::default());
        assert_eq!(app.router.controller_count(), 2);
        assert_eq!(app.context.registry().topic_routes().len(), 1);

        match app.router.handle_request(&Method::GET, "/healthcheck") {
            RouteOutcome::Matched(response) => assert_eq!(response.status, StatusCode::OK),
            RouteOutcome::NotMatched => panic!("healthcheck not routed"),
        }
    }

    #[test]
    fn test_update_interval_comes_from_config() {
        let mut config = ServiceConfig::default();
        config.realtime.update_interval_ms = 250;
        let app = Application::build(&config);

        let schedule = app.context.services().get::<UpdateSchedule>().unwrap();
        assert_eq!(schedule.period, Duration::from_millis(250));
        assert_ne!(schedule.period, DEFAULT_UPDATE_PERIOD);
    }
}
