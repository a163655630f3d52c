//! Topic controller contract.

use std::sync::Arc;
use thiserror::Error;

use crate::realtime::connection::{Connection, ConnectionId};
use crate::registry::{Arguments, MetadataRegistry};
use crate::services::ConstructionError;

/// Failure while tearing down a controller instance at shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cleanup of {controller} failed: {reason}")]
pub struct CleanupError {
    pub controller: String,
    pub reason: String,
}

/// Builds a shared controller instance from resolved constructor arguments.
pub type TopicFactory = fn(&Arguments) -> Result<Arc<dyn TopicController>, ConstructionError>;

/// Handler object serving every connection subscribed to one topic value.
///
/// The hooks after `on_connect` are the connection-scoped handlers: the
/// subscription server forwards a connection's events to the instance it
/// was bound to.
pub trait TopicController: Send + Sync + 'static {
    /// Register the topic route and constructor manifest.
    fn declare(registry: &MetadataRegistry)
    where
        Self: Sized;

    fn construct(args: &Arguments) -> Result<Self, ConstructionError>
    where
        Self: Sized;

    /// Take ownership of a new subscription: push once, start its timer.
    fn on_connect(&self, connection: Connection);

    /// Stop the connection's timer and forget it.
    fn on_disconnect(&self, id: ConnectionId);

    /// Push one update to `id` now.
    fn request_update(&self, id: ConnectionId);

    /// Rebind `id` to `topic` locally and push one update.
    fn change_topic(&self, id: ConnectionId, topic: &str);

    fn connected_count(&self) -> usize;

    /// Cancel timers and force-disconnect every connection.
    fn cleanup(&self) -> Result<(), CleanupError> {
        Ok(())
    }
}

pub(crate) fn construct_topic_controller<C: TopicController>(
    args: &Arguments,
) -> Result<Arc<dyn TopicController>, ConstructionError> {
    let controller: Arc<dyn TopicController> = Arc::new(C::construct(args)?);
    Ok(controller)
}
