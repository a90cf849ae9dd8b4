//! Utility functions for text bounding, pacing and file system checks.
//!
//! This module provides helper functions used throughout the pipeline:
//! - Whitespace collapsing and char-safe truncation for extracted text
//! - String truncation for logging
//! - Randomized jitter for batched sweeps
//! - File system validation for output directories

use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::Regex;
use std::fs as stdfs;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::GatherError;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Keep at most `max` characters of `s`, never splitting a UTF-8 sequence.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate to `cap` characters and append `marker`.
///
/// The marker is appended even when nothing was cut, so the result is always
/// at most `cap + marker.chars().count()` characters long.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(cap_with_marker("abcdef", 3, "..."), "abc...");
/// assert_eq!(cap_with_marker("ab", 3, "..."), "ab...");
/// ```
pub fn cap_with_marker(s: &str, cap: usize, marker: &str) -> String {
    let mut out = truncate_chars(s, cap).to_string();
    out.push_str(marker);
    out
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// A random delay in `[min, max]`, used to space out concurrent batch members.
pub fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let ms = rng().random_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(ms)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), GatherError> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("Saïd Business", 3), "Saï");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_cap_with_marker_always_appends() {
        assert_eq!(cap_with_marker("abcdef", 3, "..."), "abc...");
        assert_eq!(cap_with_marker("ab", 3, "..."), "ab...");
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
    fn test_jitter_stays_in_range() {
        let min = Duration::from_millis(1000);
        let max = Duration::from_millis(3000);
        for _ in 0..50 {
            let d = jitter(min, max);
            assert!(d >= min && d <= max);
        }
        assert_eq!(jitter(max, min), max);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = std::env::temp_dir().join(format!("goodnews_writable_{}", std::process::id()));
        let path = dir.to_string_lossy().to_string();
        ensure_writable_dir(&path).await.unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
