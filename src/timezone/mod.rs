//! Timezone computation.
//!
//! # Data Flow
//! ```text
//! identifier ("America/New_York")
//!     → engine.rs (validate against the IANA database, format "now")
//!     → service.rs (injectable wrapper used by controllers)
//!     → ISO-8601 string with offset, or TimezoneError
//! ```
//!
//! # Design Decisions
//! - The engine is a trait so tests can substitute a deterministic clock
//! - Output never carries fractional seconds
//! - Validation failures and engine failures are distinct error kinds

pub mod engine;
pub mod service;

pub use engine::{ChronoTzEngine, TimezoneEngine, TimezoneError};
pub use service::TimezoneService;
