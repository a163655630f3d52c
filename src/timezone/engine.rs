//! IANA timezone engine backed by `chrono-tz`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Format used for `current_time` values.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Errors produced by a timezone engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimezoneError {
    /// The identifier is not a known timezone.
    #[error("Invalid timezone: {0}")]
    Invalid(String),

    /// The engine failed to compute a time for a valid identifier.
    #[error("Failed to compute time for {timezone}: {reason}")]
    Engine { timezone: String, reason: String },
}

/// External collaborator answering timezone questions.
pub trait TimezoneEngine: Send + Sync + std::fmt::Debug {
    /// Returns true if `id` names a timezone this engine knows.
    fn is_valid(&self, id: &str) -> bool;

    /// Formats the current instant in the timezone `id`.
    fn format_now(&self, id: &str) -> Result<String, TimezoneError>;
}

/// Engine using the compiled-in IANA database.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoTzEngine;

impl ChronoTzEngine {
    /// Formats a fixed instant; split out so the formatting is testable.
    pub fn format_at(&self, id: &str, instant: DateTime<Utc>) -> Result<String, TimezoneError> {
        let tz: Tz = id
            .parse()
            .map_err(|_| TimezoneError::Invalid(id.to_string()))?;
        Ok(instant.with_timezone(&tz).format(TIME_FORMAT).to_string())
    }
}

impl TimezoneEngine for ChronoTzEngine {
    fn is_valid(&self, id: &str) -> bool {
        !id.is_empty() && id.parse::<Tz>().is_ok()
    }

    fn format_now(&self, id: &str) -> Result<String, TimezoneError> {
        self.format_at(id, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_known_identifiers_are_valid() {
        let engine = ChronoTzEngine;
        assert!(engine.is_valid("UTC"));
        assert!(engine.is_valid("Etc/UTC"));
        assert!(engine.is_valid("America/Argentina/Buenos_Aires"));
    }

    #[test]
    fn test_unknown_identifiers_are_invalid() {
        let engine = ChronoTzEngine;
        assert!(!engine.is_valid(""));
        assert!(!engine.is_valid("NotATimezone"));
        assert!(!engine.is_valid("Invalid/Timezone"));
    }

    #[test]
    fn test_format_applies_offset() {
        let engine = ChronoTzEngine;
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap();

        assert_eq!(
            engine.format_at("America/New_York", instant).unwrap(),
            "2024-01-15T07:30:45-05:00"
        );
        assert_eq!(
            engine.format_at("UTC", instant).unwrap(),
            "2024-01-15T12:30:45+00:00"
        );
    }

    #[test]
    fn test_format_rejects_unknown_zone() {
        let err = ChronoTzEngine.format_now("Mars/Olympus").unwrap_err();
        assert_eq!(err, TimezoneError::Invalid("Mars/Olympus".into()));
    }

    /// `YYYY-MM-DDTHH:MM:SS±HH:MM`, nothing more.
    fn is_time_shaped(value: &str) -> bool {
        let bytes = value.as_bytes();
        bytes.len() == 25
            && bytes.iter().enumerate().all(|(i, &b)| match i {
                4 | 7 => b == b'-',
                10 => b == b'T',
                13 | 16 | 22 => b == b':',
                19 => b == b'+' || b == b'-',
                _ => b.is_ascii_digit(),
            })
    }

    #[test]
    fn test_every_known_zone_formats_to_the_same_shape() {
        let engine = ChronoTzEngine;
        let instants = [
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 15, 23, 59, 59).unwrap(),
        ];

        for tz in chrono_tz::TZ_VARIANTS {
            let name = tz.name();
            assert!(engine.is_valid(name), "{name} should be valid");
            for instant in instants {
                let formatted = engine.format_at(name, instant).unwrap();
                assert!(is_time_shaped(&formatted), "{name} formatted as {formatted}");
            }
        }
    }
}
