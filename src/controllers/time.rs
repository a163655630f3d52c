//! Current time in a timezone.

use axum::http::Method;
use serde_json::json;

use crate::controllers::timestamp_now;
use crate::registry::{Arguments, ControllerKey, MetadataRegistry};
use crate::routing::{Controller, HandlerError, HandlerResult};
use crate::services::ServiceId;
use crate::timezone::TimezoneService;

#[derive(Debug, Default)]
pub struct TimeController;

impl TimeController {
    fn get_time(&self, timezone: &str, service: &TimezoneService) -> HandlerResult {
        let current_time = service.get_time_in_timezone(timezone)?;
        Ok(Some(json!({
            "timezone": timezone,
            "current_time": current_time,
            "timestamp": timestamp_now(),
        })))
    }
}

impl Controller for TimeController {
    fn declare(registry: &MetadataRegistry) {
        let key = ControllerKey::of::<Self>();
        registry.register_route(key, Method::GET, "/time/:timezone", "get_time");
        registry.register_path_param(key, "get_time", "timezone", 0);
        registry.register_injected_service(key, "get_time", 1, ServiceId::of::<TimezoneService>());
    }

    fn invoke(&self, handler: &str, args: &Arguments) -> HandlerResult {
        match handler {
            "get_time" => {
                let timezone = args.path(0).ok_or_else(|| HandlerError::missing_argument(0))?;
                let service = args
                    .service::<TimezoneService>(1)
                    .ok_or_else(|| HandlerError::missing_argument(1))?;
                self.get_time(timezone, &service)
            }
            other => Err(HandlerError::UnknownHandler(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Argument;
    use crate::services::Service;
    use std::sync::Arc;

    fn args(timezone: &str) -> Arguments {
        let service: Arc<TimezoneService> = Arc::new(TimezoneService::construct().unwrap());
        Arguments::new(vec![Argument::Path(timezone.to_string()), Argument::Service(service)])
    }

    #[test]
    fn test_valid_timezone() {
        let body = TimeController
            .invoke("get_time", &args("Europe/Berlin"))
            .unwrap()
            .unwrap();
        assert_eq!(body["timezone"], "Europe/Berlin");
        let current = body["current_time"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(current).is_ok());
    }

    #[test]
    fn test_empty_timezone_is_validation_error() {
        let err = TimeController.invoke("get_time", &args("")).unwrap_err();
        assert!(matches!(err, HandlerError::Validation { ref error, .. } if error == "Invalid timezone"));
    }

    #[test]
    fn test_missing_service_is_internal() {
        let args = Arguments::new(vec![Argument::Path("UTC".into())]);
        let err = TimeController.invoke("get_time", &args).unwrap_err();
        assert!(matches!(err, HandlerError::Internal(_)));
    }

    #[test]
    fn test_declares_route_with_parameters() {
        let registry = MetadataRegistry::new();
        TimeController::declare(&registry);

        let entry = registry
            .route(ControllerKey::of::<TimeController>(), "get_time")
            .unwrap();
        assert_eq!(entry.path_pattern.as_deref(), Some("/time/:timezone"));
        assert_eq!(entry.parameters.len(), 2);
    }
}
