//! Cell-level parsing for incident rows.
//!
//! Timestamp and coordinate parsing shared by the CSV loader.

use chrono::{NaiveDate, NaiveDateTime};

/// Timestamp layouts accepted for the date column, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses an incident timestamp.
///
/// Accepts full datetimes (space or `T` separated, optional fractional
/// seconds) and bare `YYYY-MM-DD` dates, which map to midnight. Returns
/// `None` for empty or unrecognized values.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parses a latitude cell. Rejects non-finite values and values outside
/// `[-90, 90]`.
///
/// # Errors
///
/// Returns a description of the problem when the value is unusable.
pub fn parse_latitude(s: &str) -> Result<f64, String> {
    parse_coordinate(s, 90.0, "latitude")
}

/// Parses a longitude cell. Rejects non-finite values and values outside
/// `[-180, 180]`.
///
/// # Errors
///
/// Returns a description of the problem when the value is unusable.
pub fn parse_longitude(s: &str) -> Result<f64, String> {
    parse_coordinate(s, 180.0, "longitude")
}

fn parse_coordinate(s: &str, bound: f64, name: &str) -> Result<f64, String> {
    let value = s
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid {name} '{s}': {e}"))?;
    if !value.is_finite() || value.abs() > bound {
        return Err(format!("{name} {value} out of range"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_space_separated_datetime() {
        let dt = parse_timestamp("2023-04-05 18:30:00").unwrap();
        assert_eq!(dt.to_string(), "2023-04-05 18:30:00");
    }

    #[test]
    fn parses_iso_datetime_with_fraction() {
        let dt = parse_timestamp("2023-04-05T18:30:00.250").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "18:30:00");
    }

    #[test]
    fn bare_date_maps_to_midnight() {
        let dt = parse_timestamp("2021-12-31").unwrap();
        assert_eq!(dt.to_string(), "2021-12-31 00:00:00");
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn parses_coordinates() {
        assert!((parse_latitude(" 24.8607 ").unwrap() - 24.8607).abs() < f64::EPSILON);
        assert!((parse_longitude("67.0011").unwrap() - 67.0011).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(parse_latitude("91.0").is_err());
        assert!(parse_longitude("-180.5").is_err());
        assert!(parse_latitude("NaN").is_err());
        assert!(parse_latitude("north").is_err());
    }
}
