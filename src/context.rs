//! Application context.
//!
//! Owns the metadata registry and the service locator. One context is
//! built at startup and shared (via `Arc`) by the HTTP router and the
//! subscription server; tests build a fresh one per case.

use std::sync::Arc;

use crate::registry::MetadataRegistry;
use crate::services::ServiceLocator;

#[derive(Debug, Default)]
pub struct AppContext {
    registry: MetadataRegistry,
    services: ServiceLocator,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for the common `Arc<AppContext>` case.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    pub fn services(&self) -> &ServiceLocator {
        &self.services
    }

    /// Drop all metadata and every cached service instance.
    pub fn reset(&self) {
        self.registry.clear();
        self.services.clear();
    }
}
