use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a backend timestamp.
/// The backend emits naive ISO timestamps (`2024-03-01T09:00:00.123456`),
/// sometimes with an offset, sometimes date-only. Naive values are UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

/// Format a timestamp string to a more readable format
pub fn format_timestamp(value: &str) -> String {
    match parse_timestamp(value) {
        Some(dt) => dt.format("%b %d, %Y %H:%M").to_string(),
        None => value.to_string(),
    }
}

/// Format a date-only view of a timestamp string
pub fn format_date(value: &str) -> String {
    match parse_timestamp(value) {
        Some(dt) => dt.format("%b %d, %Y").to_string(),
        None if value.len() >= 10 => value.chars().take(10).collect(),
        None => value.to_string(),
    }
}

/// Hours as `7h 30m`
pub fn format_hours(hours: f64) -> String {
    if !hours.is_finite() || hours <= 0.0 {
        return "0h".to_string();
    }
    let total_minutes = (hours * 60.0).round() as i64;
    let (h, m) = (total_minutes / 60, total_minutes % 60);
    match (h, m) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Percentage with one decimal, `None` shown as a dash
pub fn format_percent(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_timestamp_variants() {
        let naive = parse_timestamp("2024-03-01T09:15:00").unwrap();
        assert_eq!((naive.hour(), naive.minute()), (9, 15));

        let fractional = parse_timestamp("2024-03-01T09:15:00.123456").unwrap();
        assert_eq!(fractional.minute(), 15);

        let offset = parse_timestamp("2024-03-01T09:15:00+02:00").unwrap();
        assert_eq!(offset.hour(), 7);

        let date_only = parse_timestamp("2024-03-01").unwrap();
        assert_eq!((date_only.month(), date_only.day()), (3, 1));

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_format_dates() {
        assert_eq!(format_date("2024-03-01T09:15:00"), "Mar 01, 2024");
        assert_eq!(format_timestamp("2024-03-01T09:15:00"), "Mar 01, 2024 09:15");
        assert_eq!(format_date("not a date"), "not a date");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(7.5), "7h 30m");
        assert_eq!(format_hours(8.0), "8h");
        assert_eq!(format_hours(0.25), "15m");
        assert_eq!(format_hours(0.0), "0h");
        assert_eq!(format_hours(f64::NAN), "0h");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(0.5)), "50.0%");
        assert_eq!(format_percent(None), "-");
    }
}
