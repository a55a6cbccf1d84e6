//! Shared utility functions used across multiple modules.

use chrono::{DateTime, SecondsFormat, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Collapse a remote error into a single log-friendly line.
pub fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}

/// ISO-8601 timestamp with millisecond precision, as stored in `booked_at`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn normalize_text_option_rejects_blank_cells() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("\t \n".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" Bookings ".to_string())),
            Some("Bookings".to_string())
        );
    }

    #[test]
    fn is_http_url_requires_web_scheme() {
        assert!(is_http_url("https://project.supabase.co"));
        assert!(is_http_url("http://127.0.0.1:54321"));
        assert!(!is_http_url("postgres://project.supabase.co"));
        assert!(!is_http_url("project.supabase.co"));
    }

    #[test]
    fn iso_timestamp_uses_utc_millis() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(iso_timestamp(at), "2025-03-14T09:26:53.000Z");
    }
}
