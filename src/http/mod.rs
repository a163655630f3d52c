//! HTTP transport.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum setup, request id, CORS headers, tracing)
//!     → GET {realtime.path} → websocket.rs → realtime::SubscriptionServer
//!     → anything else → routing::Router
//!     → response.rs (status + JSON body)
//!     → Send to client
//! ```

pub mod response;
pub mod server;
pub mod websocket;

pub use response::ApiResponse;
pub use server::{AppState, HttpServer};
