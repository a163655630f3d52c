//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path)
//!     → router.rs (controllers in mount order, routes in registration order)
//!     → matcher.rs (exact-arity, then trailing wildcard)
//!     → registry::resolve_arguments (path captures + injected services)
//!     → handler.rs (Controller::invoke)
//!     → Matched(ApiResponse) or NotMatched
//!
//! Route declaration (at startup):
//!     Router::mount(controller)
//!     → Controller::declare writes RouteEntry metadata
//! ```
//!
//! # Design Decisions
//! - First match wins; no specificity ranking
//! - No regex in the matcher (segment comparison only)
//! - Handler errors are typed; the status code follows the error kind
//! - Explicit NotMatched rather than a silent default

pub mod handler;
pub mod matcher;
pub mod router;

pub use handler::{Controller, HandlerError, HandlerResult};
pub use matcher::PathPattern;
pub use router::{RouteOutcome, Router};
