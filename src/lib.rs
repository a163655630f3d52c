//! Timezone request router.
//!
//! An HTTP service answering "what time is it in `<timezone>`" plus a
//! WebSocket channel pushing the time of a subscribed timezone every second.
//!
//! # Architecture Overview
//!
//! ```text
//!   HTTP request ──▶ http::server ──▶ routing::Router ──▶ controllers::{Index,Time}
//!                                          │
//!                                          ▼
//!                          registry (route + parameter metadata)
//!                          services (lazily constructed singletons)
//!                                          ▲
//!   WS frames ───▶ http::websocket ──▶ realtime::SubscriptionServer
//!                                          │
//!                                          ▼
//!                          controllers::TimeTopicController (one per topic)
//! ```
//!
//! Registry and locator live in an explicit [`AppContext`] built at startup.

pub mod config;
pub mod context;
pub mod controllers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod realtime;
pub mod registry;
pub mod routing;
pub mod services;
pub mod timezone;

pub use config::ServiceConfig;
pub use context::AppContext;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
