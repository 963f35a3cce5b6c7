//! Cache-then-stream answer orchestration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use gcache::{AnswerCache, CacheEntry};
use gcommon::{Clock, Preferences, SurfaceId, SystemClock};
use gstream::{AnswerTransport, CredentialSource, StreamError, StreamErrorKind};

use crate::controller::{SessionHandle, SurfaceController};
use crate::error::SessionError;
use crate::hooks::{NoopSessionHooks, SessionHooks};
use crate::sink::SessionSink;
use crate::types::AnswerRequest;

#[derive(Debug)]
pub enum AnswerOutcome {
    /// Served from the cache. The sink already received `on_final`.
    Cached(CacheEntry),
    Streaming(SessionHandle),
}

impl AnswerOutcome {
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        match self {
            Self::Cached(_) => None,
            Self::Streaming(handle) => Some(handle),
        }
    }
}

pub struct AnswerService {
    cache: Arc<AnswerCache>,
    transport: Arc<dyn AnswerTransport>,
    hooks: Arc<dyn SessionHooks>,
    clock: Arc<dyn Clock>,
    credentials: Option<Arc<dyn CredentialSource>>,
    controllers: Mutex<HashMap<SurfaceId, Arc<SurfaceController>>>,
}

impl AnswerService {
    pub fn new(cache: Arc<AnswerCache>, transport: Arc<dyn AnswerTransport>) -> Self {
        Self {
            cache,
            transport,
            hooks: Arc::new(NoopSessionHooks),
            clock: Arc::new(SystemClock),
            credentials: None,
            controllers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn SessionHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Credentials to invalidate when the service rejects them.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn cache(&self) -> &Arc<AnswerCache> {
        &self.cache
    }

    pub fn controller(&self, surface: &SurfaceId) -> Arc<SurfaceController> {
        let mut controllers = self
            .controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let controller = controllers.entry(surface.clone()).or_insert_with(|| {
            Arc::new(
                SurfaceController::new(surface.clone(), Arc::clone(&self.transport))
                    .with_hooks(Arc::clone(&self.hooks))
                    .with_clock(Arc::clone(&self.clock)),
            )
        });
        Arc::clone(controller)
    }

    /// Serves `request` from the cache, or streams a fresh answer and caches
    /// it once finalized.
    ///
    /// A cache hit still supersedes the surface's active session. A failed
    /// cache read is treated as a miss.
    pub async fn answer(
        &self,
        request: AnswerRequest,
        sink: Arc<dyn SessionSink>,
    ) -> Result<AnswerOutcome, SessionError> {
        if request.prompt.trim().is_empty() {
            return Err(SessionError::invalid_request("prompt must not be empty"));
        }

        let controller = self.controller(&request.surface);
        if let Ok(Some(entry)) = self.cache.lookup_key(&request.cache_key()).await {
            controller.cancel_active();
            sink.on_final(&entry.answer);
            return Ok(AnswerOutcome::Cached(entry));
        }

        let sink = Arc::new(CachingSink {
            inner: sink,
            cache: Arc::clone(&self.cache),
            credentials: self.credentials.clone(),
            question: request.question.clone(),
            display_question: request.display_question.clone(),
            preferences: request.preferences,
        });
        let handle = controller.start(request, sink)?;
        Ok(AnswerOutcome::Streaming(handle))
    }

    pub fn cancel(&self, surface: &SurfaceId) -> bool {
        self.controller(surface).cancel_active()
    }
}

/// Forwards callbacks and writes finalized answers to the cache.
struct CachingSink {
    inner: Arc<dyn SessionSink>,
    cache: Arc<AnswerCache>,
    credentials: Option<Arc<dyn CredentialSource>>,
    question: String,
    display_question: Option<String>,
    preferences: Preferences,
}

impl SessionSink for CachingSink {
    fn on_delta(&self, text: &str) {
        self.inner.on_delta(text);
    }

    fn on_final(&self, text: &str) {
        if !text.trim().is_empty() {
            let cache = Arc::clone(&self.cache);
            let question = self.question.clone();
            let display_question = self.display_question.clone();
            let answer = text.to_string();
            let preferences = self.preferences;
            tokio::spawn(async move {
                // Failures are reported through the cache hooks.
                let _ = cache
                    .persist(
                        &question,
                        display_question.as_deref(),
                        &answer,
                        &preferences,
                    )
                    .await;
            });
        }

        self.inner.on_final(text);
    }

    fn on_error(&self, error: &StreamError) {
        if error.kind == StreamErrorKind::Unauthorized
            && let Some(credentials) = self.credentials.clone()
        {
            tokio::spawn(async move { credentials.invalidate().await });
        }

        self.inner.on_error(error);
    }
}
