//! Maps HTTP failures and provider error bodies onto [`StreamErrorKind`].
//!
//! Status codes win over body text; the body is only consulted for the
//! generic 4xx range where providers report different causes under the same
//! status.
//!
//! ```rust
//! use gstream::{StreamErrorKind, classify_http_status};
//!
//! assert_eq!(classify_http_status(401, None), StreamErrorKind::Unauthorized);
//! assert_eq!(classify_http_status(400, None), StreamErrorKind::BadRequest);
//!
//! let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota"}}"#;
//! assert_eq!(
//!     classify_http_status(400, Some(body)),
//!     StreamErrorKind::InsufficientQuota
//! );
//! ```

use serde_json::Value;

use crate::{StreamError, StreamErrorKind};

const INVALID_MODEL_MARKERS: &[&str] = &["model_not_found", "does not exist", "invalid model"];

const QUOTA_MARKERS: &[&str] = &[
    "insufficient_quota",
    "billing",
    "hard limit",
    "exceeded your current quota",
];

/// Provider-reported error metadata (`{"error": {message, type, code}}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    pub message: Option<String>,
    pub error_type: Option<String>,
    pub code: Option<String>,
}

impl ErrorDetails {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        if let Some(message) = value.as_str() {
            return Some(Self::from_message(message));
        }

        let object = value.as_object()?;
        let text = |field: &str| {
            object
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let details = Self {
            message: text("message"),
            error_type: text("type"),
            code: text("code"),
        };

        if details.is_empty() { None } else { Some(details) }
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.error_type.is_none() && self.code.is_none()
    }

    fn searchable_text(&self, extra: Option<&str>) -> String {
        [
            self.message.as_deref(),
            self.error_type.as_deref(),
            self.code.as_deref(),
            extra,
        ]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// Extracts provider error metadata from a response body.
///
/// The error object may sit at `error`, `response.error` or `data.error`.
pub fn extract_error_details(body: &str) -> Option<ErrorDetails> {
    let trimmed = body.trim();
    if !trimmed.starts_with('{') {
        return None;
    }

    let parsed = serde_json::from_str::<Value>(trimmed).ok()?;
    ["/error", "/response/error", "/data/error"]
        .into_iter()
        .filter_map(|pointer| parsed.pointer(pointer))
        .find_map(ErrorDetails::from_value)
}

/// Classifies a failed HTTP response by status and optional body.
pub fn classify_http_status(status: u16, body: Option<&str>) -> StreamErrorKind {
    let details = body.and_then(extract_error_details);
    classify_failure(Some(status), details.as_ref(), None)
}

/// Full classification cascade shared by HTTP and in-stream failures.
pub fn classify_failure(
    status: Option<u16>,
    details: Option<&ErrorDetails>,
    message_text: Option<&str>,
) -> StreamErrorKind {
    match status {
        Some(401 | 403) => return StreamErrorKind::Unauthorized,
        Some(429) => return StreamErrorKind::RateLimited,
        Some(status) if status >= 500 => return StreamErrorKind::ServerError,
        _ => {}
    }

    let combined = match details {
        Some(details) => details.searchable_text(message_text),
        None => message_text.map(str::to_lowercase).unwrap_or_default(),
    };

    if INVALID_MODEL_MARKERS
        .iter()
        .any(|marker| combined.contains(marker))
    {
        return StreamErrorKind::InvalidModel;
    }

    if QUOTA_MARKERS.iter().any(|marker| combined.contains(marker)) {
        return StreamErrorKind::InsufficientQuota;
    }

    if status == Some(400) {
        return StreamErrorKind::BadRequest;
    }

    StreamErrorKind::Provider
}

/// Builds the error reported for a non-success HTTP response.
pub fn http_error(status: u16, body: Option<&str>) -> StreamError {
    let details = body.and_then(extract_error_details);
    let kind = classify_failure(Some(status), details.as_ref(), None);
    let message = details
        .and_then(|details| details.message)
        .unwrap_or_else(|| format!("request failed with status {status}"));

    StreamError::new(kind, message).with_status(status)
}

/// Builds the error reported for a failure message delivered inside the stream.
pub fn stream_failure_error(details: &ErrorDetails) -> StreamError {
    let kind = classify_failure(None, Some(details), None);
    let message = details
        .message
        .clone()
        .or_else(|| details.code.clone())
        .unwrap_or_else(|| "provider reported a failure".to_string());

    StreamError::new(kind, message)
}

/// Parses errors flattened into `HTTP_<status>[:<body>]` message strings.
///
/// ```rust
/// use gstream::parse_http_error_message;
///
/// assert_eq!(
///     parse_http_error_message("HTTP_429:slow down"),
///     Some((429, Some("slow down".to_string())))
/// );
/// assert_eq!(parse_http_error_message("HTTP_5xx"), None);
/// ```
pub fn parse_http_error_message(message: &str) -> Option<(u16, Option<String>)> {
    let rest = message.strip_prefix("HTTP_")?;
    let (status, body) = match rest.split_once(':') {
        Some((status, body)) => (status, Some(body)),
        None => (rest, None),
    };

    if status.len() != 3 || !status.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    let status = status.parse::<u16>().ok()?;
    let body = body.filter(|body| !body.is_empty()).map(str::to_string);
    Some((status, body))
}

/// Classifies a free-form failure message, honouring the `HTTP_<status>` form.
pub fn error_from_message(message: &str) -> StreamError {
    if let Some((status, body)) = parse_http_error_message(message) {
        return http_error(status, body.as_deref());
    }

    if message.trim() == "UNAUTHORIZED" {
        return StreamError::unauthorized("no access token available");
    }

    let kind = classify_failure(None, None, Some(message));
    StreamError::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::{
        ErrorDetails, classify_failure, classify_http_status, error_from_message,
        extract_error_details, http_error, parse_http_error_message, stream_failure_error,
    };
    use crate::StreamErrorKind;

    #[test]
    fn status_codes_take_priority() {
        assert_eq!(classify_http_status(401, None), StreamErrorKind::Unauthorized);
        assert_eq!(classify_http_status(403, None), StreamErrorKind::Unauthorized);
        assert_eq!(classify_http_status(429, None), StreamErrorKind::RateLimited);
        assert_eq!(classify_http_status(500, None), StreamErrorKind::ServerError);
        assert_eq!(classify_http_status(503, None), StreamErrorKind::ServerError);

        let quota_body = r#"{"error":{"message":"billing hard limit reached"}}"#;
        assert_eq!(
            classify_http_status(429, Some(quota_body)),
            StreamErrorKind::RateLimited
        );
    }

    #[test]
    fn bad_request_without_recognizable_body() {
        assert_eq!(classify_http_status(400, None), StreamErrorKind::BadRequest);
        assert_eq!(
            classify_http_status(400, Some("<html>nope</html>")),
            StreamErrorKind::BadRequest
        );
        assert_eq!(
            classify_http_status(400, Some(r#"{"error":{"message":"missing input"}}"#)),
            StreamErrorKind::BadRequest
        );
    }

    #[test]
    fn body_text_distinguishes_model_and_quota_failures() {
        let model = r#"{"error":{"message":"The model `gpt-9` does not exist","type":"invalid_request_error","code":"model_not_found"}}"#;
        assert_eq!(classify_http_status(404, Some(model)), StreamErrorKind::InvalidModel);
        assert_eq!(classify_http_status(400, Some(model)), StreamErrorKind::InvalidModel);

        let quota = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota"}}"#;
        assert_eq!(
            classify_http_status(402, Some(quota)),
            StreamErrorKind::InsufficientQuota
        );
    }

    #[test]
    fn unmatched_statuses_fall_back_to_generic_provider_error() {
        assert_eq!(classify_http_status(404, None), StreamErrorKind::Provider);
        assert_eq!(
            classify_http_status(409, Some(r#"{"error":{"message":"conflict"}}"#)),
            StreamErrorKind::Provider
        );
    }

    #[test]
    fn error_details_are_found_in_nested_locations() {
        let nested = r#"{"response":{"error":{"code":"server_busy"}}}"#;
        assert_eq!(
            extract_error_details(nested),
            Some(ErrorDetails {
                message: None,
                error_type: None,
                code: Some("server_busy".to_string()),
            })
        );

        let data = r#"{"data":{"error":{"type":"invalid_model"}}}"#;
        assert_eq!(
            extract_error_details(data).and_then(|details| details.error_type),
            Some("invalid_model".to_string())
        );

        assert_eq!(extract_error_details(r#"{"error":{}}"#), None);
        assert_eq!(extract_error_details("not json"), None);
        assert_eq!(extract_error_details("{broken"), None);
    }

    #[test]
    fn http_error_prefers_provider_message() {
        let error = http_error(401, Some(r#"{"error":{"message":"Incorrect API key"}}"#));
        assert_eq!(error.kind, StreamErrorKind::Unauthorized);
        assert_eq!(error.message, "Incorrect API key");
        assert_eq!(error.status, Some(401));

        let error = http_error(502, None);
        assert_eq!(error.message, "request failed with status 502");
        assert!(error.retryable);
    }

    #[test]
    fn in_stream_failures_use_text_rules_only() {
        let details = ErrorDetails {
            message: Some("Rate limit reached".to_string()),
            error_type: None,
            code: Some("rate_limit_exceeded".to_string()),
        };
        let error = stream_failure_error(&details);
        assert_eq!(error.kind, StreamErrorKind::Provider);
        assert_eq!(error.message, "Rate limit reached");

        let quota = ErrorDetails::from_message("insufficient_quota");
        assert_eq!(
            classify_failure(None, Some(&quota), None),
            StreamErrorKind::InsufficientQuota
        );
    }

    #[test]
    fn flattened_http_messages_are_parsed() {
        assert_eq!(parse_http_error_message("HTTP_401"), Some((401, None)));
        assert_eq!(parse_http_error_message("HTTP_401:"), Some((401, None)));
        assert_eq!(
            parse_http_error_message("HTTP_400:{\"a\":\"b:c\"}"),
            Some((400, Some("{\"a\":\"b:c\"}".to_string())))
        );
        assert_eq!(parse_http_error_message("HTTP_40"), None);
        assert_eq!(parse_http_error_message("HTTP_abc:x"), None);
        assert_eq!(parse_http_error_message("boom"), None);

        assert_eq!(error_from_message("HTTP_429").kind, StreamErrorKind::RateLimited);
        assert_eq!(
            error_from_message("UNAUTHORIZED").kind,
            StreamErrorKind::Unauthorized
        );
        assert_eq!(
            error_from_message("Invalid model requested").kind,
            StreamErrorKind::InvalidModel
        );
    }
}
