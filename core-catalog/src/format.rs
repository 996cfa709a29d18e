//! Display formatting for counts and timestamps.

use chrono::{DateTime, NaiveDateTime};

pub const UNKNOWN_TIME: &str = "未知时间";

const DISPLAY_FORMAT: &str = "%Y/%-m/%-d %H:%M:%S";
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// `12345` → `"1.2万"`; below ten thousand the plain number.
pub fn format_count(count: u64) -> String {
    if count >= 10_000 {
        format!("{:.1}万", count as f64 / 10_000.0)
    } else {
        count.to_string()
    }
}

/// Renders an ISO (`2025-08-13T16:16:38.808406`) or SQL (`2025-08-13 08:16:38`)
/// timestamp as `2025/8/13 16:16:38`.
///
/// Blank input is `"未知时间"`; anything unparsable is returned unchanged.
pub fn format_date_time(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UNKNOWN_TIME.to_string();
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return with_offset.naive_local().format(DISPLAY_FORMAT).to_string();
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(9_999), "9999");
        assert_eq!(format_count(10_000), "1.0万");
        assert_eq!(format_count(123_456), "12.3万");
    }

    #[test]
    fn test_format_iso_and_sql_timestamps() {
        assert_eq!(
            format_date_time("2025-08-13T16:16:38.808406"),
            "2025/8/13 16:16:38"
        );
        assert_eq!(format_date_time("2025-08-13 08:16:38"), "2025/8/13 08:16:38");
        assert_eq!(
            format_date_time("2025-08-13T16:16:38+08:00"),
            "2025/8/13 16:16:38"
        );
    }

    #[test]
    fn test_format_fallbacks() {
        assert_eq!(format_date_time(""), UNKNOWN_TIME);
        assert_eq!(format_date_time("昨天"), "昨天");
    }
}
