//! Application controllers.
//!
//! # Routes
//! ```text
//! GET /                  → IndexController::index
//! GET /healthcheck       → IndexController::healthcheck
//! GET /time/:timezone    → TimeController::get_time
//! topic /time/:timezone  → TimeTopicController (one instance per timezone)
//! ```

pub mod index;
pub mod time;
pub mod time_topic;

pub use index::IndexController;
pub use time::TimeController;
pub use time_topic::TimeTopicController;

use chrono::{SecondsFormat, Utc};

/// ISO-8601 UTC instant with millisecond precision.
pub(crate) fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
