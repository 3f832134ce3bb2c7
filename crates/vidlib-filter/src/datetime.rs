//! Flexible date/time parsing.
//!
//! The engine only depends on the [`DateParser`] trait. [`FlexibleDateParser`]
//! is the default implementation: it accepts RFC 3339, a set of common
//! date and date-time layouts, any extra chrono formats supplied by the
//! caller, and a few relative keywords.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::value::Instant;

/// Date-time layouts tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Date-only layouts, resolved to midnight UTC.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// The text could not be resolved to a point in time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized date/time '{text}'")]
pub struct DateParseError {
    /// The rejected text.
    pub text: String,
}

/// Resolves free-form text to an [`Instant`].
///
/// Implementations must consume the whole text; trailing input is a failure.
pub trait DateParser: Send + Sync {
    /// Parses `text` into an instant.
    fn parse(&self, text: &str) -> Result<Instant, DateParseError>;
}

/// Chrono-backed [`DateParser`].
#[derive(Debug, Clone, Default)]
pub struct FlexibleDateParser {
    extra_formats: Vec<String>,
    reference: Option<DateTime<Utc>>,
}

impl FlexibleDateParser {
    /// Creates a parser with the built-in layouts, resolving relative
    /// keywords against the current time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds chrono format strings tried after the built-in layouts.
    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_formats
            .extend(formats.into_iter().map(Into::into));
        self
    }

    /// Pins `now`, `today`, `yesterday` and `tomorrow` to a fixed reference.
    pub fn with_reference(mut self, reference: DateTime<Utc>) -> Self {
        self.reference = Some(reference);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference.unwrap_or_else(Utc::now)
    }

    fn parse_keyword(&self, text: &str) -> Option<DateTime<Utc>> {
        let now = self.now();
        let today = now.date_naive().and_hms_opt(0, 0, 0)?.and_utc();
        match text.to_ascii_lowercase().as_str() {
            "now" => Some(now),
            "today" => Some(today),
            "yesterday" => Some(today - Duration::days(1)),
            "tomorrow" => Some(today + Duration::days(1)),
            _ => None,
        }
    }

    fn parse_with(text: &str, format: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
        NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

impl DateParser for FlexibleDateParser {
    fn parse(&self, text: &str) -> Result<Instant, DateParseError> {
        let resolved = self
            .parse_keyword(text)
            .or_else(|| {
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            })
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .chain(DATE_FORMATS)
                    .copied()
                    .chain(self.extra_formats.iter().map(String::as_str))
                    .find_map(|format| Self::parse_with(text, format))
            });

        resolved.map(Instant::new).ok_or_else(|| DateParseError {
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_iso_date() {
        let instant = FlexibleDateParser::new().parse("2024-01-02").unwrap();
        let dt = instant.as_datetime();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 2));
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parse_rfc3339_converts_to_utc() {
        let instant = FlexibleDateParser::new()
            .parse("2024-01-02T10:00:00+02:00")
            .unwrap();
        assert_eq!(instant.as_datetime().hour(), 8);
    }

    #[test]
    fn test_parse_date_time_and_month_names() {
        let parser = FlexibleDateParser::new();
        assert!(parser.parse("2024-01-02 10:30").is_ok());
        assert!(parser.parse("2024/01/02 10:30:15").is_ok());
        assert!(parser.parse("Jan 2, 2024").is_ok());
        assert!(parser.parse("2 January 2024").is_ok());
    }

    #[test]
    fn test_parse_requires_full_consumption() {
        let parser = FlexibleDateParser::new();
        assert!(parser.parse("2024-01-02 and more").is_err());
        assert!(parser.parse("hello").is_err());
        assert!(parser.parse("42").is_err());
    }

    #[test]
    fn test_relative_keywords_use_reference() {
        let parser = FlexibleDateParser::new().with_reference(reference());
        assert_eq!(parser.parse("now").unwrap().as_datetime(), reference());

        let today = parser.parse("TODAY").unwrap().as_datetime();
        assert_eq!((today.day(), today.hour()), (15, 0));

        let yesterday = parser.parse("yesterday").unwrap().as_datetime();
        assert_eq!(yesterday.day(), 14);

        let tomorrow = parser.parse("tomorrow").unwrap().as_datetime();
        assert_eq!(tomorrow.day(), 16);
    }

    #[test]
    fn test_extra_formats() {
        let parser = FlexibleDateParser::new().with_formats(["%d.%m.%Y"]);
        let dt = parser.parse("24.12.2023").unwrap().as_datetime();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2023, 12, 24));
        assert!(FlexibleDateParser::new().parse("24.12.2023").is_err());
    }
}
