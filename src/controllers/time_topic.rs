//! Real-time clock for one timezone topic.

use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;
use crate::realtime::{
    ClientHandle, CleanupError, Connection, ConnectionId, ConnectionSet, ServerEvent,
    TopicController, UpdateSchedule,
};
use crate::registry::{Arguments, MetadataRegistry, Param};
use crate::services::{ConstructionError, ServiceId};
use crate::timezone::TimezoneService;

/// Shared by every connection subscribed to the same timezone.
#[derive(Debug)]
pub struct TimeTopicController {
    timezone: String,
    service: Arc<TimezoneService>,
    period: Duration,
    connections: ConnectionSet,
}

impl TimeTopicController {
    pub fn new(timezone: impl Into<String>, service: Arc<TimezoneService>, schedule: UpdateSchedule) -> Self {
        Self {
            timezone: timezone.into(),
            service,
            period: schedule.period,
            connections: ConnectionSet::new(),
        }
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    fn push(service: &TimezoneService, handle: &ClientHandle, topic: &str) {
        let event = match service.get_time_in_timezone(topic) {
            Ok(current_time) => {
                metrics::record_update("time_update");
                ServerEvent::time_update(topic, current_time)
            }
            Err(e) => {
                metrics::record_update("error");
                tracing::debug!(topic = %topic, error = %e, "Time update failed");
                ServerEvent::error(topic, e.to_string())
            }
        };
        handle.emit(event);
    }
}

impl TopicController for TimeTopicController {
    fn declare(registry: &MetadataRegistry) {
        registry.register_topic_route::<Self>(
            "/time/:timezone",
            vec![
                Param::path("timezone"),
                Param::service(ServiceId::of::<TimezoneService>()),
                Param::service(ServiceId::of::<UpdateSchedule>()),
            ],
        );
    }

    fn construct(args: &Arguments) -> Result<Self, ConstructionError> {
        let missing = |index| ConstructionError::MissingArgument {
            target: "TimeTopicController".into(),
            index,
        };
        let timezone = args.path(0).ok_or_else(|| missing(0))?;
        let service = args.service::<TimezoneService>(1).ok_or_else(|| missing(1))?;
        let schedule = args.service::<UpdateSchedule>(2).ok_or_else(|| missing(2))?;
        Ok(Self::new(timezone, service, *schedule))
    }

    fn on_connect(&self, mut connection: Connection) {
        Self::push(&self.service, connection.handle(), &connection.topic());

        let service = Arc::clone(&self.service);
        connection.start_timer(self.period, move |handle, topic| {
            Self::push(&service, handle, topic);
        });
        self.connections.insert(connection);
    }

    fn on_disconnect(&self, id: ConnectionId) {
        // Dropping the connection aborts its timer.
        if self.connections.remove(id).is_some() {
            tracing::debug!(connection_id = %id, timezone = %self.timezone, "Timer stopped");
        }
    }

    fn request_update(&self, id: ConnectionId) {
        self.connections.with(id, |connection| {
            Self::push(&self.service, connection.handle(), &connection.topic());
        });
    }

    fn change_topic(&self, id: ConnectionId, topic: &str) {
        self.connections.with(id, |connection| {
            connection.set_topic(topic);
            Self::push(&self.service, connection.handle(), topic);
        });
    }

    fn connected_count(&self) -> usize {
        self.connections.len()
    }

    fn cleanup(&self) -> Result<(), CleanupError> {
        let drained = self.connections.drain();
        tracing::debug!(timezone = %self.timezone, connections = drained.len(), "Cleaning up");
        for mut connection in drained {
            connection.cancel_timer();
            connection.handle().disconnect();
        }
        Ok(())
    }
}
