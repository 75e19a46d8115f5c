//! Small helpers shared by the store, sync and config modules.

/// Longest backend error body quoted in a user-facing message.
pub const MAX_ERROR_BODY_CHARS: usize = 180;

/// Trimmed text, or `None` when nothing but whitespace is left.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// First [`MAX_ERROR_BODY_CHARS`] characters of a trimmed error body.
pub fn compact_error_body(body: &str) -> String {
    body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Wall clock in epoch milliseconds, the unit of local progress copies.
pub fn unix_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Wall clock in epoch nanoseconds, the unit of snapshot update timestamps.
/// Saturates once the value no longer fits in an `i64`.
pub fn unix_timestamp_nanos() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
}

pub const fn nanos_to_millis(nanos: i64) -> i64 {
    nanos / 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_normalizes_to_none() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \n ".to_string())), None);
        assert_eq!(
            normalize_text_option(Some(" https://api.example.com ".to_string())).as_deref(),
            Some("https://api.example.com")
        );
    }

    #[test]
    fn only_http_schemes_count_as_urls() {
        assert!(is_http_url("http://localhost:8787"));
        assert!(is_http_url("https://valentine.example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("valentine.example.com"));
    }

    #[test]
    fn error_body_is_trimmed_and_capped() {
        let body = format!("  {}  ", "x".repeat(400));
        assert_eq!(compact_error_body(&body).len(), MAX_ERROR_BODY_CHARS);
        assert_eq!(compact_error_body("  oops \n"), "oops");
    }

    #[test]
    fn snapshot_nanos_convert_to_millis() {
        assert_eq!(nanos_to_millis(1_700_000_000_123_456_789), 1_700_000_000_123);
        assert_eq!(nanos_to_millis(0), 0);
    }
}
