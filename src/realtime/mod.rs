//! Real-time subscription subsystem.
//!
//! # Data Flow
//! ```text
//! Client frame ("subscribe-topic" {topic})
//!     → server.rs (join room "topic-<topic>")
//!     → registry topic routes (first route with a :param segment)
//!     → instance cache keyed by (controller type, topic)
//!         miss → resolve constructor arguments → TopicController::construct
//!     → TopicController::on_connect(Connection)
//!         → immediate update + periodic timer (connection.rs)
//!
//! Updates:
//!     timer tick / "get-time" / "change-topic"
//!     → controller builds ServerEvent (protocol.rs)
//!     → ClientHandle (unbounded channel) → transport writer
//! ```
//!
//! # Design Decisions
//! - The core is transport-agnostic; http/websocket.rs adapts axum
//! - One controller instance per topic value, shared by its connections
//! - Locks are never held while calling controller hooks
//! - Instances live until shutdown (no idle eviction)

pub mod connection;
pub mod controller;
pub mod protocol;
pub mod schedule;
pub mod server;

pub use connection::{ClientHandle, Connection, ConnectionId, ConnectionSet, Outbound};
pub use controller::{CleanupError, TopicController};
pub use protocol::{ClientEvent, ServerEvent};
pub use schedule::UpdateSchedule;
pub use server::{room_name, SubscribeError, SubscriptionServer};
