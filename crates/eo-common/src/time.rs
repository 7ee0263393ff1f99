use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{EoError, EoResult};

/// Parse an acquisition or request timestamp.
///
/// Accepts RFC 3339 with or without fractional seconds
/// (`2022-03-15T10:20:30.123Z`, `2022-03-15T10:20:30Z`), a naive
/// datetime, or a bare date.
pub fn parse_timestamp(s: &str) -> EoResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = nd
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| EoError::serialization(format!("Invalid date: {}", s)))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    Err(EoError::serialization(format!(
        "Unparseable timestamp: {}",
        s
    )))
}

/// Compact date form used in object keys, e.g. `20220315`.
pub fn compact_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}

/// Request timestamp form without fractional seconds, e.g.
/// `2022-03-15T00:00:00Z`.
pub fn format_request(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Seconds since the Unix epoch, as stored in time coordinates.
pub fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64
}

pub fn from_epoch_seconds(secs: f64) -> EoResult<DateTime<Utc>> {
    Utc.timestamp_opt(secs as i64, 0)
        .single()
        .ok_or_else(|| EoError::serialization(format!("Epoch out of range: {}", secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fractional() {
        let dt = parse_timestamp("2022-03-15T10:20:30.123456Z").unwrap();
        assert_eq!(compact_date(&dt), "20220315");
    }

    #[test]
    fn test_parse_whole_seconds() {
        let dt = parse_timestamp("2022-03-15T10:20:30Z").unwrap();
        assert_eq!(format_request(&dt), "2022-03-15T10:20:30Z");
    }

    #[test]
    fn test_parse_naive_and_date_only() {
        assert!(parse_timestamp("2022-03-15T10:20:30").is_ok());
        let dt = parse_timestamp("2022-03-15").unwrap();
        assert_eq!(format_request(&dt), "2022-03-15T00:00:00Z");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_timestamp("15/03/2022").is_err());
    }

    #[test]
    fn test_epoch_round_trip() {
        let dt = parse_timestamp("2022-03-15T10:20:30Z").unwrap();
        let back = from_epoch_seconds(epoch_seconds(&dt)).unwrap();
        assert_eq!(dt, back);
    }
}
