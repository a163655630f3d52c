//! Handler contract between controllers and the router.

use serde_json::Value;
use thiserror::Error;

use crate::registry::{Arguments, MetadataRegistry};
use crate::timezone::TimezoneError;

/// Outcome of a handler: a JSON body, nothing, or a typed failure.
pub type HandlerResult = Result<Option<Value>, HandlerError>;

/// Typed handler failure; the router maps the kind to a status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Bad client input (400).
    #[error("{message}")]
    Validation { error: String, message: String },

    /// Unexpected failure (500).
    #[error("{0}")]
    Internal(String),

    /// The controller has no handler by that name (500).
    #[error("Unknown handler: {0}")]
    UnknownHandler(String),
}

impl HandlerError {
    pub fn validation(error: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::Validation {
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        HandlerError::Internal(message.into())
    }

    /// A required positional argument was not resolved.
    pub fn missing_argument(index: usize) -> Self {
        HandlerError::Internal(format!("Missing handler argument at position {index}"))
    }
}

impl From<TimezoneError> for HandlerError {
    fn from(err: TimezoneError) -> Self {
        match err {
            TimezoneError::Invalid(_) => HandlerError::validation("Invalid timezone", err.to_string()),
            TimezoneError::Engine { .. } => HandlerError::Internal(err.to_string()),
        }
    }
}

/// A set of HTTP handlers mounted on the router.
pub trait Controller: Send + Sync + 'static {
    /// Write this controller's route and parameter metadata.
    fn declare(registry: &MetadataRegistry)
    where
        Self: Sized;

    /// Run `handler` with already-resolved positional arguments.
    fn invoke(&self, handler: &str, args: &Arguments) -> HandlerResult;
}
