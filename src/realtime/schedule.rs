//! Update cadence for topic controllers.

use std::time::Duration;

use crate::services::{ConstructionError, Service};

/// Default period between pushed updates.
pub const DEFAULT_UPDATE_PERIOD: Duration = Duration::from_secs(1);

/// Injectable update period; startup registers one built from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSchedule {
    pub period: Duration,
}

impl UpdateSchedule {
    pub fn every(period: Duration) -> Self {
        Self { period }
    }
}

impl Default for UpdateSchedule {
    fn default() -> Self {
        Self::every(DEFAULT_UPDATE_PERIOD)
    }
}

impl Service for UpdateSchedule {
    fn construct() -> Result<Self, ConstructionError> {
        Ok(Self::default())
    }
}
