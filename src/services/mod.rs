//! Dependency injection.
//!
//! # Data Flow
//! ```text
//! ParameterSpec { kind: InjectedService, service: ServiceId }
//!     → locator.rs (cached instance?)
//!         yes → shared Arc
//!         no  → ServiceId's zero-argument constructor → cache → shared Arc
//! ```
//!
//! # Design Decisions
//! - A ServiceId carries its own constructor, so resolution needs no
//!   separate factory table
//! - One instance per ServiceId for the lifetime of the locator
//! - Explicit registration overrides lazy construction (used by tests)

pub mod locator;
pub mod service;

pub use locator::ServiceLocator;
pub use service::{ConstructionError, Service, ServiceId, SharedService};
