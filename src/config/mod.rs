//! Service configuration.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → startup builds the application from it
//! ```
//!
//! Every field has a default, so an empty file (or no file) is valid.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, RealtimeConfig, ServiceConfig, ShutdownConfig,
    TlsConfig,
};
pub use validation::{validate_config, ValidationError};
