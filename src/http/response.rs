//! Response shaping.
//!
//! # Responsibilities
//! - Carry a status code and an optional JSON body out of the router
//! - Build the fixed error payloads (400, 404, 500)
//! - Convert into an axum response
//!
//! # Design Decisions
//! - Every error body has `error` and `message`
//! - CORS headers are added by a layer in server.rs, not here

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Example path advertised by the 404 payload.
pub const EXAMPLE_PATH: &str = "/time/Etc/UTC";

/// JSON error payload.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<&'static str>,
}

/// Status plus optional JSON body produced by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }

    pub fn validation(error: &str, message: &str, requested_timezone: Option<&str>) -> Self {
        Self::error(
            StatusCode::BAD_REQUEST,
            ErrorBody {
                error: error.to_string(),
                message: message.to_string(),
                requested_timezone: requested_timezone.map(str::to_string),
                example: None,
            },
        )
    }

    pub fn internal(message: &str) -> Self {
        Self::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody {
                error: "Internal server error".to_string(),
                message: message.to_string(),
                requested_timezone: None,
                example: None,
            },
        )
    }

    pub fn not_found() -> Self {
        Self::error(
            StatusCode::NOT_FOUND,
            ErrorBody {
                error: "Not found".to_string(),
                message: "Use /time/{timezone} to get the current time in a timezone".to_string(),
                requested_timezone: None,
                example: Some(EXAMPLE_PATH),
            },
        )
    }

    fn error(status: StatusCode, body: ErrorBody) -> Self {
        let body = serde_json::to_value(body).unwrap_or_else(|_| Value::Null);
        Self {
            status,
            body: Some(body),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}
