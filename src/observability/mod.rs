//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (connection_id, topic, status) instead of formatted strings
//! - Request ID attached to every HTTP response
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
