//! Pure formatting helpers shared between the template engine's `sizes`/
//! `time` function families (spec.md §4.1) and the Transformer
//! Registry's per-kind cell rendering (spec.md §4.8), so both draw on
//! one implementation of "what does 1100m over a 1Gi request look
//! like as text" rather than two.

use chrono::{DateTime, Utc};

const BINARY_UNITS: [&str; 5] = ["Ki", "Mi", "Gi", "Ti", "Pi"];

/// Binary-unit byte formatting up to `Pi` (spec.md §4.1 `humanizeBytes`,
/// §4.8 memory rendering). Zero renders as `"-"`, matching the
/// Transformer Registry's memory-cell convention.
pub fn humanize_bytes(n: u64) -> String {
    if n == 0 {
        return "-".to_string();
    }
    if n < 1024 {
        return format!("{n}B");
    }
    let mut value = n as f64;
    let mut unit = "B";
    for candidate in BINARY_UNITS {
        value /= 1024.0;
        unit = candidate;
        if value < 1024.0 {
            break;
        }
    }
    // A fractional remainder is only worth showing above this
    // threshold; otherwise the integer part alone is clearer (e.g.
    // "2Gi" rather than "2.00Gi" for an exact value).
    if (value - value.trunc()).abs() < 0.05 {
        format!("{}{}", value.round() as i64, unit)
    } else {
        format!("{value:.1}{unit}")
    }
}

/// Parses either a bare millicore integer-as-string or a Kubernetes
/// `"<N>m"` CPU quantity into millicores.
pub fn parse_millicores(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(stripped) = s.strip_suffix('m') {
        stripped.parse::<u64>().ok()
    } else {
        s.parse::<f64>().ok().map(|cores| (cores * 1000.0).round() as u64)
    }
}

/// `<N>m` below one core, else integer cores (or one-decimal for a
/// non-integer core count) (spec.md §4.8 CPU formatting).
pub fn format_millicores(m: u64) -> String {
    if m < 1000 {
        format!("{m}m")
    } else if m % 1000 == 0 {
        format!("{}", m / 1000)
    } else {
        format!("{:.1}", m as f64 / 1000.0)
    }
}

pub fn millicores_to_cores(m: u64) -> f64 {
    m as f64 / 1000.0
}

pub fn cores_to_millicores(cores: f64) -> u64 {
    (cores * 1000.0).round() as u64
}

/// Largest-unit age string: `s/m/h/d/mo/y` (spec.md §4.1 `ago`, §4.8 age
/// rendering). `since` is the resource's creation time; `now` is
/// injected so callers (and tests) control the clock.
pub fn format_age(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - since).num_seconds().max(0);
    format_age_seconds(seconds)
}

pub fn format_age_seconds(seconds: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    if seconds < MINUTE {
        format!("{seconds}s")
    } else if seconds < HOUR {
        format!("{}m", seconds / MINUTE)
    } else if seconds < DAY {
        format!("{}h", seconds / HOUR)
    } else if seconds < MONTH {
        format!("{}d", seconds / DAY)
    } else if seconds < YEAR {
        format!("{}mo", seconds / MONTH)
    } else {
        format!("{}y", seconds / YEAR)
    }
}

/// Parses a value that may be an RFC-3339 timestamp string, returning
/// `None` (the template engine's `ago`/`timestamp` functions render
/// `"unknown"` for this case) when it isn't recognized.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses a Kubernetes memory quantity (`"256Mi"`, `"1Gi"`, or a bare
/// byte count) into bytes, for comparing pod/container memory requests
/// against usage (spec.md §4.8 threshold coloring).
pub fn parse_memory_quantity(s: &str) -> Option<u64> {
    let s = s.trim();
    const UNITS: [(&str, u64); 5] = [
        ("Ki", 1024),
        ("Mi", 1024u64.pow(2)),
        ("Gi", 1024u64.pow(3)),
        ("Ti", 1024u64.pow(4)),
        ("Pi", 1024u64.pow(5)),
    ];
    for (suffix, multiplier) in UNITS {
        if let Some(stripped) = s.strip_suffix(suffix) {
            return stripped
                .trim()
                .parse::<f64>()
                .ok()
                .map(|n| (n * multiplier as f64).round() as u64);
        }
    }
    s.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn humanize_bytes_uses_binary_units() {
        assert_eq!(humanize_bytes(0), "-");
        assert_eq!(humanize_bytes(512), "512B");
        assert_eq!(humanize_bytes(2048), "2Ki");
        assert_eq!(humanize_bytes(1024 * 1024 * 1024), "1Gi");
        assert_eq!(humanize_bytes(1536 * 1024 * 1024), "1.5Gi");
    }

    #[test]
    fn millicores_roundtrip_and_format() {
        assert_eq!(parse_millicores("850m"), Some(850));
        assert_eq!(parse_millicores("2"), Some(2000));
        assert_eq!(format_millicores(850), "850m");
        assert_eq!(format_millicores(2000), "2");
        assert_eq!(format_millicores(2500), "2.5");
    }

    #[test]
    fn age_picks_largest_unit() {
        assert_eq!(format_age_seconds(30), "30s");
        assert_eq!(format_age_seconds(90), "1m");
        assert_eq!(format_age_seconds(3 * 3600), "3h");
        assert_eq!(format_age_seconds(2 * 86400), "2d");
        assert_eq!(format_age_seconds(40 * 86400), "1mo");
        assert_eq!(format_age_seconds(400 * 86400), "1y");
    }

    #[test]
    fn format_age_from_timestamps() {
        let now = Utc::now();
        let since = now - Duration::hours(5);
        assert_eq!(format_age(since, now), "5h");
    }

    #[test]
    fn memory_quantity_parses_binary_units() {
        assert_eq!(parse_memory_quantity("256Mi"), Some(256 * 1024 * 1024));
        assert_eq!(parse_memory_quantity("1Gi"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_quantity("512"), Some(512));
    }
}
