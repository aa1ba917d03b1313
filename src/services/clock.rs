//! Clock string conversion. No timezone handling: "HH:MM" is taken as-is.

use chrono::{NaiveTime, Timelike};

use crate::error::ValidationError;

/// Minutes since midnight of the end-of-day form "24:00"
pub const END_OF_DAY_MINUTES: u32 = 24 * 60;

/// Convert "HH:MM" to minutes since midnight (`hours * 60 + minutes`).
/// Seconds, if present ("HH:MM:SS"), are dropped. "24:00" is accepted as the
/// end of the day (1440); any other hour past 23 is rejected.
pub fn parse_clock_minutes(value: &str) -> Result<u32, ValidationError> {
    let trimmed = value.trim();
    if matches!(trimmed, "24:00" | "24:00:00") {
        return Ok(END_OF_DAY_MINUTES);
    }

    let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidClock(value.to_string()))?;
    Ok(time_to_minutes(time))
}

pub fn time_to_minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Format minutes since midnight as "HH:MM". Fractions are truncated and
/// values past midnight keep counting hours ("25:10").
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0) as u32;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_minutes() {
        assert_eq!(parse_clock_minutes("00:00").unwrap(), 0);
        assert_eq!(parse_clock_minutes("09:40").unwrap(), 580);
        assert_eq!(parse_clock_minutes("9:40").unwrap(), 580);
        assert_eq!(parse_clock_minutes("23:59").unwrap(), 1439);
        assert_eq!(parse_clock_minutes(" 10:00 ").unwrap(), 600);
    }

    #[test]
    fn test_parse_clock_with_seconds() {
        assert_eq!(parse_clock_minutes("10:30:59").unwrap(), 630);
    }

    #[test]
    fn test_parse_clock_rejects_garbage() {
        for bad in ["", "noon", "24:01", "24:00:30", "25:00", "10:60", "10-30", "1030"] {
            assert_eq!(
                parse_clock_minutes(bad),
                Err(ValidationError::InvalidClock(bad.to_string())),
                "expected rejection for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_clock_end_of_day() {
        assert_eq!(parse_clock_minutes("24:00"), Ok(1440));
        assert_eq!(parse_clock_minutes(" 24:00:00"), Ok(1440));
        assert_eq!(format_minutes(1440.0), "24:00");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(580.0), "09:40");
        assert_eq!(format_minutes(675.7), "11:15");
        assert_eq!(format_minutes(1510.0), "25:10");
    }
}
