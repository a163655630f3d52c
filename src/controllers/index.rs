//! Service description and liveness.

use axum::http::Method;
use serde_json::json;

use crate::controllers::timestamp_now;
use crate::http::response::EXAMPLE_PATH;
use crate::registry::{Arguments, ControllerKey, MetadataRegistry};
use crate::routing::{Controller, HandlerError, HandlerResult};

#[derive(Debug, Default)]
pub struct IndexController;

impl Controller for IndexController {
    fn declare(registry: &MetadataRegistry) {
        let key = ControllerKey::of::<Self>();
        registry.register_route(key, Method::GET, "/", "index");
        registry.register_route(key, Method::GET, "/healthcheck", "healthcheck");
    }

    fn invoke(&self, handler: &str, _args: &Arguments) -> HandlerResult {
        match handler {
            "index" => Ok(Some(json!({
                "message": "Timezone API. Request the current time for any IANA timezone.",
                "endpoints": {
                    "/time/{timezone}": "Current time in the given timezone",
                    "/healthcheck": "Service health status",
                },
                "example": EXAMPLE_PATH,
            }))),
            "healthcheck" => Ok(Some(json!({
                "status": "OK",
                "timestamp": timestamp_now(),
            }))),
            other => Err(HandlerError::UnknownHandler(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_payload() {
        let body = IndexController
            .invoke("index", &Arguments::default())
            .unwrap()
            .unwrap();
        assert!(body.get("message").is_some());
        assert!(body["endpoints"].is_object());
        assert_eq!(body["example"], EXAMPLE_PATH);
    }

    #[test]
    fn test_healthcheck_payload() {
        let body = IndexController
            .invoke("healthcheck", &Arguments::default())
            .unwrap()
            .unwrap();
        assert_eq!(body["status"], "OK");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }
}
