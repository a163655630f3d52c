//! Lazy singleton cache.
//!
//! # Responsibilities
//! - Return the cached instance for a ServiceId
//! - Construct, cache and return it on first request
//! - Accept explicit overrides and full resets
//!
//! # Design Decisions
//! - Read-then-create is atomic (DashMap entry API), so concurrent first
//!   requests observe a single instance
//! - Constructors run under the shard lock and must not call back into
//!   the locator

use dashmap::DashMap;
use std::sync::Arc;

use crate::services::service::{ConstructionError, Service, ServiceId, SharedService};

/// Process-wide service cache, owned by the application context.
#[derive(Debug, Default)]
pub struct ServiceLocator {
    instances: DashMap<ServiceId, SharedService>,
}

impl ServiceLocator {
    /// Create an empty locator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `id`, constructing it on first use.
    pub fn get_or_create(&self, id: ServiceId) -> Result<SharedService, ConstructionError> {
        if let Some(existing) = self.instances.get(&id) {
            return Ok(existing.value().clone());
        }

        let entry = self.instances.entry(id).or_try_insert_with(|| {
            tracing::debug!(service = %id, "Constructing service");
            id.construct()
        })?;
        Ok(entry.value().clone())
    }

    /// Typed variant of [`get_or_create`](Self::get_or_create).
    pub fn get<T: Service>(&self) -> Result<Arc<T>, ConstructionError> {
        let id = ServiceId::of::<T>();
        self.get_or_create(id)?
            .downcast::<T>()
            .map_err(|_| ConstructionError::TypeMismatch {
                target: id.name().to_string(),
            })
    }

    /// Install `instance` for `T`, replacing any cached value.
    pub fn register<T: Service>(&self, instance: Arc<T>) {
        let id = ServiceId::of::<T>();
        tracing::debug!(service = %id, "Registering service instance");
        self.instances.insert(id, instance);
    }

    /// Drop every cached instance.
    pub fn clear(&self) {
        self.instances.clear();
    }

    pub fn contains(&self, id: &ServiceId) -> bool {
        self.instances.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
