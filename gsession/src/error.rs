//! Session orchestration errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

use gcache::CacheError;
use gstream::StreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    InvalidRequest,
    /// No async runtime was available to drive the session.
    Runtime,
    Cache,
    Stream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::InvalidRequest, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Runtime, message)
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Cache, message)
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Stream, message)
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for SessionError {}

impl From<CacheError> for SessionError {
    fn from(value: CacheError) -> Self {
        SessionError::cache(value.to_string())
    }
}

impl From<StreamError> for SessionError {
    fn from(value: StreamError) -> Self {
        SessionError::stream(value.to_string())
    }
}
