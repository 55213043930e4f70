//! Display formatting helpers shared by the TUI components.

use chrono::{Datelike, NaiveDate, Weekday};

/// Compact token count: `950`, `1.2K`, `3.4M`, `1.1B`.
#[inline]
pub fn format_number(value: u64) -> String {
    if value >= 1_000_000_000 {
        format!("{:.1}B", value as f64 / 1_000_000_000.0)
    } else if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        let k = value / 1_000;
        let remainder = value % 1_000;
        format!("{}.{}K", k, remainder / 100)
    } else {
        value.to_string()
    }
}

/// Full count with thousands separators: `1,234,567`.
#[inline]
pub fn format_number_full(value: u64) -> String {
    let s = value.to_string();
    let len = s.len();
    if len <= 3 {
        return s;
    }
    let mut result = String::with_capacity(len + (len - 1) / 3);
    for (i, byte) in s.bytes().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(byte as char);
    }
    result
}

/// Active duration in the largest three useful units.
pub fn format_active_duration(ms: i64) -> String {
    if ms <= 0 {
        return "0s".into();
    }
    let total_secs = (ms / 1000) as u64;
    let days = total_secs / 86400;
    let hours = (total_secs % 86400) / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, mins)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Render a `%Y-%m-%d` day key as `Mar 05, 2026 Thu`. Unparseable keys come
/// back unchanged.
pub fn format_date(day: &str) -> String {
    let Ok(parsed) = NaiveDate::parse_from_str(day, "%Y-%m-%d") else {
        return day.to_string();
    };
    format!(
        "{} {:02}, {} {}",
        month_abbr(parsed.month()),
        parsed.day(),
        parsed.year(),
        weekday_abbr(parsed.weekday())
    )
}

pub fn weekday_abbr(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

pub fn month_abbr(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_number_ranges() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_234), "1.2K");
        assert_eq!(format_number(999_999), "999.9K");
        assert_eq!(format_number(2_500_000), "2.5M");
        assert_eq!(format_number(1_100_000_000), "1.1B");
    }

    #[test]
    fn test_format_number_full() {
        assert_eq!(format_number_full(7), "7");
        assert_eq!(format_number_full(1_000), "1,000");
        assert_eq!(format_number_full(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_active_duration() {
        assert_eq!(format_active_duration(0), "0s");
        assert_eq!(format_active_duration(-5), "0s");
        assert_eq!(format_active_duration(42_000), "42s");
        assert_eq!(format_active_duration(125_000), "2m 5s");
        assert_eq!(format_active_duration(3_725_000), "1h 2m 5s");
        assert_eq!(format_active_duration(90_000_000), "1d 1h 0m");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2026-03-05"), "Mar 05, 2026 Thu");
        assert_eq!(format_date("garbage"), "garbage");
    }
}
