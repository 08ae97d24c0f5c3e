//! # Response Parsing
//!
//! Strict JSON parsing of response bodies with enough context in the error to
//! debug a proxy page or a truncated payload.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::redact_sensitive;

/// Return a hint for status codes that usually mean a misconfigured client.
///
/// # Example
/// ```rust
/// use odoorpc_util::http::status_error_message;
///
/// assert!(status_error_message(404).unwrap().contains("base URL"));
/// assert!(status_error_message(500).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: log in again to refresh the stored session".into()),
        403 => Some("Forbidden (403). Hint: check the user's access rights on the target model".into()),
        404 => Some("Not Found (404). Hint: check the base URL and the route".into()),
        _ => None,
    }
}

/// Parse HTTP response text into JSON, providing detailed errors on failure.
///
/// # Errors
/// Returns a [`JsonParseError`] carrying the serde error, the status code and
/// up to 200 characters of the (redacted) body with whitespace collapsed.
pub fn parse_response_json_strict(text: &str, status: Option<StatusCode>) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string());
        let preview = truncate_response_preview(&redact_sensitive(text), 200);

        JsonParseError::new(status_note, error, preview)
    })
}

/// Collapse whitespace and cut `text` to roughly `limit` characters.
pub fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// Error returned when strict JSON parsing of an HTTP response fails.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn new(status_note: String, source: serde_json::Error, body_preview: String) -> Self {
        Self {
            status_note,
            source,
            body_preview,
        }
    }

    /// Access the truncated response preview captured during parsing.
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_parse_reports_status_and_preview() {
        let error = parse_response_json_strict("<html>\n<body>Bad Gateway</body>\n</html>", Some(StatusCode::BAD_GATEWAY))
            .expect_err("html is not json");
        let message = error.to_string();

        assert!(message.contains("status 502 Bad Gateway"));
        assert_eq!(error.body_preview(), "<html> <body>Bad Gateway</body> </html>");
    }

    #[test]
    fn preview_marks_empty_bodies_and_truncates() {
        assert_eq!(truncate_response_preview("  ", 10), "<empty>");
        assert_eq!(truncate_response_preview("abcdefghijkl", 4), "abcd...");
    }

    #[test]
    fn preview_redacts_credentials() {
        let error = parse_response_json_strict(r#"{"password":"hunter2""#, None).expect_err("truncated json");
        assert!(!error.body_preview().contains("hunter2"));
    }
}
