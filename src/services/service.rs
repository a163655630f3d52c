//! Service identity and construction.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// Type-erased shared service instance.
pub type SharedService = Arc<dyn Any + Send + Sync>;

type Constructor = fn() -> Result<SharedService, ConstructionError>;

/// Errors raised while instantiating a service or controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// The constructor itself failed.
    #[error("Failed to construct {target}: {reason}")]
    Failed { target: String, reason: String },

    /// A cached instance does not have the requested type.
    #[error("Instance registered for {target} has an unexpected type")]
    TypeMismatch { target: String },

    /// A constructor argument was not supplied by the parameter manifest.
    #[error("Missing argument {index} for {target}")]
    MissingArgument { target: String, index: usize },
}

/// A shared dependency constructible without arguments.
pub trait Service: Sized + Send + Sync + 'static {
    /// Build a fresh instance.
    fn construct() -> Result<Self, ConstructionError>;
}

/// Identifier of an injectable service.
///
/// Two ids are equal when they name the same Rust type. The id also
/// remembers how to build that type, which is what lets the locator
/// create instances on demand from nothing but the id.
#[derive(Clone, Copy)]
pub struct ServiceId {
    type_id: TypeId,
    name: &'static str,
    construct: Constructor,
}

impl ServiceId {
    /// Identifier for the service type `T`.
    pub fn of<T: Service>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
            construct: construct_shared::<T>,
        }
    }

    /// Short type name, used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn construct(&self) -> Result<SharedService, ConstructionError> {
        (self.construct)()
    }
}

fn construct_shared<T: Service>() -> Result<SharedService, ConstructionError> {
    let instance: SharedService = Arc::new(T::construct()?);
    Ok(instance)
}

/// Last path segment of a type name (`timezone_router::a::Foo` → `Foo`).
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

impl PartialEq for ServiceId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceId {}

impl Hash for ServiceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceId").field(&self.name).finish()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
