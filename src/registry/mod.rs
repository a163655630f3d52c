//! Route and topic metadata.
//!
//! # Data Flow
//! ```text
//! Controller::declare (startup)
//!     → metadata.rs (register_route / register_path_param /
//!                    register_injected_service / register_topic_route)
//!     → RouteEntry / TopicRoute, keyed by controller type
//!
//! Request or subscription (runtime):
//!     → metadata.rs lookup (read-only)
//!     → arguments.rs (specs + captures + service locator)
//!     → positional Arguments handed to the handler
//! ```
//!
//! # Design Decisions
//! - Parameter registration is an upsert by index, so method-level and
//!   parameter-level declarations can arrive in any order
//! - Lookups never fail; absence is `None` or an empty list
//! - Registration order is preserved and is the match order

pub mod arguments;
pub mod metadata;

pub use arguments::{resolve_arguments, Argument, Arguments, Captures};
pub use metadata::{
    ControllerKey, MetadataRegistry, Param, ParamKind, ParameterSpec, RouteEntry, TopicRoute,
};
