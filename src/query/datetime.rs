use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt;

/// Listed in parse precedence order; quoted back to the caller on failure.
pub const SUPPORTED_FORMATS: &str =
    "dd-MM-yyyy HH:mm:ss, dd-MM-yyyy HH:mm, dd-MM-yyyy, ddMMyyyy, dd/MM/yyyy, ddMMyy";

/// Half-open time range produced from one human-entered date string.
///
/// `exact` is true only when the input resolved to a single second; minute
/// and day inputs produce coarser buckets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    /// Exclusive.
    pub end: NaiveDateTime,
    pub exact: bool,
}

/// Date parsing failure. Always surfaced to the caller as a rejected
/// request — never coerced into an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum DateParseError {
    /// Input matched none of the supported shapes.
    UnrecognizedShape(String),
    /// Shape matched but the calendar rejected it (e.g. 31-02-2024).
    InvalidDate(String),
}

impl fmt::Display for DateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateParseError::UnrecognizedShape(s) => {
                write!(f, "unrecognized date format '{}'. Supported: {}", s, SUPPORTED_FORMATS)
            }
            DateParseError::InvalidDate(s) => {
                write!(f, "invalid calendar date '{}'. Supported: {}", s, SUPPORTED_FORMATS)
            }
        }
    }
}

impl std::error::Error for DateParseError {}

/// Parse a free-form date/time string into a half-open range.
///
/// Shapes are tried in precedence order; the first full-string match wins.
/// Partial matches are rejected — an unanchored shape must not swallow a
/// longer input. Empty input is the caller's concern ("no time filter" is
/// distinct from "invalid format").
///
/// 1. `dd-MM-yyyy HH:mm:ss` → `[t, t+1s)`, exact
/// 2. `dd-MM-yyyy HH:mm`    → `[t, t+1min)`
/// 3. `dd-MM-yyyy`          → `[midnight, +1 day)`
/// 4. `ddMMyyyy`            → day range
/// 5. `dd/MM/yyyy`          → day range
/// 6. `ddMMyy`              → day range, year = 2000 + yy
pub fn parse_date_time(input: &str) -> Result<TimeRange, DateParseError> {
    // 1. dd-MM-yyyy HH:mm:ss — exact second
    if matches_shape(input, "NN-NN-NNNN NN:NN:NN") {
        let t = parse_datetime_shape(input, "%d-%m-%Y %H:%M:%S")?;
        return Ok(TimeRange { start: t, end: t + Duration::seconds(1), exact: true });
    }

    // 2. dd-MM-yyyy HH:mm — within the minute
    if matches_shape(input, "NN-NN-NNNN NN:NN") {
        let t = parse_datetime_shape(input, "%d-%m-%Y %H:%M")?;
        return Ok(TimeRange { start: t, end: t + Duration::minutes(1), exact: false });
    }

    // 3. dd-MM-yyyy — within the day
    if matches_shape(input, "NN-NN-NNNN") {
        return day_range(input, "%d-%m-%Y");
    }

    // 4. ddMMyyyy
    if matches_shape(input, "NNNNNNNN") {
        return day_range(input, "%d%m%Y");
    }

    // 5. dd/MM/yyyy
    if matches_shape(input, "NN/NN/NNNN") {
        return day_range(input, "%d/%m/%Y");
    }

    // 6. ddMMyy — two-digit year expanded as 2000+yy
    if matches_shape(input, "NNNNNN") {
        let (day, month, yy) = (&input[0..2], &input[2..4], &input[4..6]);
        let expanded = format!("{}{}20{}", day, month, yy);
        return day_range(&expanded, "%d%m%Y")
            .map_err(|_| DateParseError::InvalidDate(input.to_string()));
    }

    Err(DateParseError::UnrecognizedShape(input.to_string()))
}

/// Full-string shape check: `N` matches one ASCII digit, any other
/// character matches itself.
fn matches_shape(input: &str, shape: &str) -> bool {
    input.len() == shape.len()
        && input.bytes().zip(shape.bytes()).all(|(c, s)| {
            if s == b'N' {
                c.is_ascii_digit()
            } else {
                c == s
            }
        })
}

fn parse_datetime_shape(input: &str, format: &str) -> Result<NaiveDateTime, DateParseError> {
    NaiveDateTime::parse_from_str(input, format)
        .map_err(|_| DateParseError::InvalidDate(input.to_string()))
}

fn day_range(input: &str, format: &str) -> Result<TimeRange, DateParseError> {
    let date = NaiveDate::parse_from_str(input, format)
        .map_err(|_| DateParseError::InvalidDate(input.to_string()))?;
    let start = date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| DateParseError::InvalidDate(input.to_string()))?;
    Ok(TimeRange { start, end: start + Duration::days(1), exact: false })
}
