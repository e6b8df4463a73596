//! Utility functions for number formatting, string truncation, date keying,
//! and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Compact display formatting for large metric values
//! - Character-budget truncation for descriptions and log lines
//! - Calendar-date keying of snapshots under the platform's UTC+9 local day
//! - File system validation for the snapshots directory

use chrono::{DateTime, FixedOffset, Utc};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Boxed error type used across the crate.
///
/// `Send + Sync` so errors can cross task boundaries (scheduler jobs, axum
/// handlers).
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The platform's "local day" offset. Editions are dated in UTC+9 regardless
/// of where the process runs.
const LOCAL_DAY_OFFSET_HOURS: i32 = 9;

/// Round a float to six decimal places.
///
/// Used for the derived like ratio so persisted snapshots are stable across
/// platforms and reruns.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Format a count as a compact display string: `950`, `12.4K`, `1.2M`, `3.1B`.
///
/// One decimal place, with a trailing `.0` stripped (`2.0M` renders as `2M`).
///
/// # Examples
///
/// ```ignore
/// assert_eq!(compact_count(950), "950");
/// assert_eq!(compact_count(1_234_567), "1.2M");
/// ```
pub fn compact_count(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();

    let (scaled, suffix) = match abs {
        0..=999 => return value.to_string(),
        1_000..=999_999 => (abs as f64 / 1_000.0, "K"),
        1_000_000..=999_999_999 => (abs as f64 / 1_000_000.0, "M"),
        _ => (abs as f64 / 1_000_000_000.0, "B"),
    };

    let rounded = (scaled * 10.0).round() / 10.0;
    if (rounded.fract()).abs() < f64::EPSILON {
        format!("{sign}{}{suffix}", rounded as u64)
    } else {
        format!("{sign}{rounded:.1}{suffix}")
    }
}

/// Truncate a string to a character budget, appending an ellipsis when cut.
///
/// Operates on characters, not bytes, so multi-byte text (Korean descriptions
/// in particular) is never split mid-character.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte count
/// indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…(+{} bytes)", &s[..end], s.len() - end)
    }
}

/// Derive the calendar date key for a snapshot timestamp.
///
/// `generated_at` is an ISO-8601/RFC-3339 timestamp; the returned key is the
/// `YYYY-MM-DD` calendar date of that instant shifted into the fixed UTC+9
/// offset. A run at `2024-01-01T16:00:00Z` therefore lands on `2024-01-02`.
pub fn date_key_utc9(generated_at: &str) -> Result<String, BoxError> {
    let parsed: DateTime<Utc> = generated_at.parse()?;
    let offset = FixedOffset::east_opt(LOCAL_DAY_OFFSET_HOURS * 3600)
        .ok_or("invalid local-day offset")?;
    Ok(parsed.with_timezone(&offset).format("%Y-%m-%d").to_string())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), BoxError> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Snapshots directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round6() {
        assert_eq!(round6(1.0 / 3.0), 0.333333);
        assert_eq!(round6(0.9), 0.9);
        assert_eq!(round6(0.123456789), 0.123457);
    }

    #[test]
    fn test_compact_count_small_values() {
        assert_eq!(compact_count(0), "0");
        assert_eq!(compact_count(950), "950");
        assert_eq!(compact_count(999), "999");
    }

    #[test]
    fn test_compact_count_thousands_and_up() {
        assert_eq!(compact_count(1_000), "1K");
        assert_eq!(compact_count(12_400), "12.4K");
        assert_eq!(compact_count(1_234_567), "1.2M");
        assert_eq!(compact_count(2_000_000), "2M");
        assert_eq!(compact_count(3_100_000_000), "3.1B");
    }

    #[test]
    fn test_compact_count_negative() {
        assert_eq!(compact_count(-1_500), "-1.5K");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello…");
        assert_eq!(truncate_chars("설명이 없습니다", 3), "설명이…");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_date_key_utc9_rolls_into_next_day() {
        assert_eq!(
            date_key_utc9("2024-01-01T16:00:00.000Z").unwrap(),
            "2024-01-02"
        );
    }

    #[test]
    fn test_date_key_utc9_same_day() {
        assert_eq!(
            date_key_utc9("2024-01-01T02:00:00.000Z").unwrap(),
            "2024-01-01"
        );
    }

    #[test]
    fn test_date_key_utc9_rejects_garbage() {
        assert!(date_key_utc9("not-a-timestamp").is_err());
    }
}
