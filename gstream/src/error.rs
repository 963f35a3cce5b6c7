//! Streaming error kinds and error value helpers.
//!
//! ```rust
//! use gstream::{StreamError, StreamErrorKind};
//!
//! let limited = StreamError::rate_limited("slow down").with_status(429);
//! assert!(limited.retryable);
//! assert_eq!(limited.code(), "OPENAI_RATE_LIMIT");
//!
//! let aborted = StreamError::aborted();
//! assert!(aborted.is_abort());
//! assert_eq!(aborted.kind, StreamErrorKind::Aborted);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamErrorKind {
    /// Caller-triggered stop or a superseding request. Never shown as a failure.
    Aborted,
    /// Network failure before or while reading a response.
    Transport,
    Unauthorized,
    RateLimited,
    ServerError,
    BadRequest,
    InvalidModel,
    InsufficientQuota,
    /// Provider failure that matched no more specific rule.
    Provider,
    /// One malformed event payload; local to the stream.
    Parse,
    /// A session callback panicked; reported to hooks only.
    Sink,
}

impl StreamErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Aborted => "ABORTED",
            Self::Transport => "NETWORK_ERROR",
            Self::Unauthorized => "OPENAI_UNAUTHORIZED",
            Self::RateLimited => "OPENAI_RATE_LIMIT",
            Self::ServerError => "OPENAI_SERVER_ERROR",
            Self::BadRequest => "OPENAI_BAD_REQUEST",
            Self::InvalidModel => "OPENAI_INVALID_MODEL",
            Self::InsufficientQuota => "OPENAI_INSUFFICIENT_QUOTA",
            Self::Provider => "OPENAI_ERROR",
            Self::Parse => "PARSE_ERROR",
            Self::Sink => "SINK_ERROR",
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transport | Self::RateLimited | Self::ServerError)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub retryable: bool,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            retryable: kind.is_retryable(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn aborted() -> Self {
        Self::new(StreamErrorKind::Aborted, "request aborted")
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Transport, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Unauthorized, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::ServerError, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::BadRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Provider, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Parse, message)
    }

    pub fn sink(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Sink, message)
    }

    pub fn is_abort(&self) -> bool {
        self.kind == StreamErrorKind::Aborted
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl Display for StreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} ({status}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for StreamError {}

impl From<serde_json::Error> for StreamError {
    fn from(value: serde_json::Error) -> Self {
        StreamError::parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{StreamError, StreamErrorKind};

    #[test]
    fn helper_builders_assign_expected_retryability() {
        assert!(!StreamError::unauthorized("bad key").retryable);
        assert!(!StreamError::bad_request("bad body").retryable);
        assert!(!StreamError::aborted().retryable);
        assert!(StreamError::transport("reset").retryable);
        assert!(StreamError::server("boom").retryable);
        assert!(StreamError::rate_limited("later").retryable);
    }

    #[test]
    fn display_includes_status_when_present() {
        let error = StreamError::server("upstream down").with_status(503);
        assert_eq!(error.to_string(), "ServerError (503): upstream down");

        let error = StreamError::transport("connection reset");
        assert_eq!(error.to_string(), "Transport: connection reset");
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(StreamErrorKind::Unauthorized.code(), "OPENAI_UNAUTHORIZED");
        assert_eq!(StreamErrorKind::InvalidModel.code(), "OPENAI_INVALID_MODEL");
        assert_eq!(
            StreamErrorKind::InsufficientQuota.code(),
            "OPENAI_INSUFFICIENT_QUOTA"
        );
        assert_eq!(StreamErrorKind::Provider.code(), "OPENAI_ERROR");
        assert_eq!(StreamError::sink("callback panicked").code(), "SINK_ERROR");
        assert!(!StreamError::sink("callback panicked").retryable);
    }
}
