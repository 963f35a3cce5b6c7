//! Answer requests, session events and session states.

use gcache::{CacheKey, build_cache_key};
use gcommon::{Preferences, SurfaceId};
use gstream::{StreamError, TransportRequest};

pub const DEFAULT_SURFACE: &str = "default";

/// One answer to produce for one surface.
///
/// `question` is what the cache is keyed on; `prompt` is the full text sent to
/// the generation service. `display_question` is what history shows for the
/// answer when it differs from `question`, such as a follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRequest {
    pub question: String,
    pub display_question: Option<String>,
    pub prompt: String,
    pub preferences: Preferences,
    pub surface: SurfaceId,
    pub model: Option<String>,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            display_question: None,
            prompt: prompt.into(),
            preferences: Preferences::default(),
            surface: SurfaceId::from(DEFAULT_SURFACE),
            model: None,
        }
    }

    pub fn with_display_question(mut self, display_question: impl Into<String>) -> Self {
        self.display_question = Some(display_question.into());
        self
    }

    /// Question shown for the answer: the display form when set, otherwise
    /// the key question.
    pub fn display_question(&self) -> &str {
        self.display_question.as_deref().unwrap_or(&self.question)
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_surface(mut self, surface: impl Into<SurfaceId>) -> Self {
        self.surface = surface.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn cache_key(&self) -> CacheKey {
        build_cache_key(&self.question, &self.preferences)
    }

    pub(crate) fn transport_request(&self) -> TransportRequest {
        let request = TransportRequest::new(self.prompt.clone());
        match &self.model {
            Some(model) => request.with_model(model.clone()),
            None => request,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Whole answer text accumulated so far.
    Delta(String),
    Final(String),
    Error(StreamError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Requesting,
    Streaming,
    Finalized,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Cancelled | Self::Failed)
    }
}
