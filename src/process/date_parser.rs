use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Naive layouts tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a timestamp cell into a zone-less value stored at microsecond precision.
///
/// Bare dates land at midnight. Cells carrying a UTC offset or more than six
/// fractional digits are rejected so the column keeps them as text.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    // cheapest rejection first: every accepted layout starts with a 4-digit year
    if s.len() < 10 || !s.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return (naive.nanosecond() % 1_000 == 0).then_some(naive);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Microseconds since the Unix epoch, as stored in the Parquet output.
pub fn to_micros(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}
