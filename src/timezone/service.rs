//! Injectable timezone service.

use std::sync::Arc;

use crate::services::{ConstructionError, Service};
use crate::timezone::engine::{ChronoTzEngine, TimezoneEngine, TimezoneError};

/// Shared entry point controllers use for timezone lookups.
#[derive(Debug, Clone)]
pub struct TimezoneService {
    engine: Arc<dyn TimezoneEngine>,
}

impl TimezoneService {
    pub fn new(engine: Arc<dyn TimezoneEngine>) -> Self {
        Self { engine }
    }

    pub fn is_valid_timezone(&self, id: &str) -> bool {
        self.engine.is_valid(id)
    }

    /// Current time in `id`, validated first.
    pub fn get_time_in_timezone(&self, id: &str) -> Result<String, TimezoneError> {
        if !self.engine.is_valid(id) {
            return Err(TimezoneError::Invalid(id.to_string()));
        }
        self.engine.format_now(id)
    }
}

impl Service for TimezoneService {
    fn construct() -> Result<Self, ConstructionError> {
        Ok(Self::new(Arc::new(ChronoTzEngine)))
    }
}
