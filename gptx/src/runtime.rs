//! Runtime wiring: store, cache, transport and answer service from one config.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::{
    AnswerCache, AnswerService, AnswerStore, AnswerStoreConfig, AnswerTransport, CacheError,
    CacheHooks, CredentialSource, MetricsObservabilityHooks, NoopCacheHooks, NoopSessionHooks,
    RetentionPolicy, SafeCacheHooks, SafeSessionHooks, SessionHooks, StreamError,
    TracingObservabilityHooks, TransportConfig, create_answer_store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Observability {
    Off,
    #[default]
    Tracing,
    Metrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GptxConfig {
    pub transport: TransportConfig,
    pub store: AnswerStoreConfig,
    /// Fixed retention policy. `None` reads it from the store on every prune.
    pub retention: Option<RetentionPolicy>,
    pub observability: Observability,
}

impl GptxConfig {
    pub fn new(transport: TransportConfig, store: AnswerStoreConfig) -> Self {
        Self {
            transport,
            store,
            ..Self::default()
        }
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_store(mut self, store: AnswerStoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn with_observability(mut self, observability: Observability) -> Self {
        self.observability = observability;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    Store,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for RuntimeError {}

impl From<CacheError> for RuntimeError {
    fn from(value: CacheError) -> Self {
        Self {
            kind: RuntimeErrorKind::Store,
            message: value.to_string(),
        }
    }
}

impl From<StreamError> for RuntimeError {
    fn from(value: StreamError) -> Self {
        Self {
            kind: RuntimeErrorKind::Transport,
            message: value.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct RuntimeBundle {
    pub store: Arc<dyn AnswerStore>,
    pub cache: Arc<AnswerCache>,
    pub service: Arc<AnswerService>,
}

fn observability_hooks(
    observability: Observability,
) -> (Arc<dyn SessionHooks>, Arc<dyn CacheHooks>) {
    match observability {
        Observability::Off => (Arc::new(NoopSessionHooks), Arc::new(NoopCacheHooks)),
        Observability::Tracing => (
            Arc::new(SafeSessionHooks::new(TracingObservabilityHooks)),
            Arc::new(SafeCacheHooks::new(TracingObservabilityHooks)),
        ),
        Observability::Metrics => (
            Arc::new(SafeSessionHooks::new(MetricsObservabilityHooks)),
            Arc::new(SafeCacheHooks::new(MetricsObservabilityHooks)),
        ),
    }
}

/// Builds a runtime over the HTTP transport.
#[cfg(feature = "http-transport")]
pub fn build_runtime(
    config: GptxConfig,
    credentials: Arc<dyn CredentialSource>,
) -> Result<RuntimeBundle, RuntimeError> {
    let transport = Arc::new(crate::HttpAnswerTransport::new(
        config.transport.clone(),
        Arc::clone(&credentials),
    )?);
    build_runtime_with(config, transport, Some(credentials))
}

/// Builds a runtime whose access token lives in the answer store.
#[cfg(feature = "http-transport")]
pub fn build_runtime_with_stored_token(config: GptxConfig) -> Result<RuntimeBundle, RuntimeError> {
    let store = create_answer_store(config.store.clone())?;
    let credentials: Arc<dyn CredentialSource> =
        Arc::new(crate::StoredAccessToken::new(Arc::clone(&store)));
    let transport = Arc::new(crate::HttpAnswerTransport::new(
        config.transport.clone(),
        Arc::clone(&credentials),
    )?);
    Ok(assemble(config, store, transport, Some(credentials)))
}

/// Builds a runtime over any transport. `config.transport` is not used.
pub fn build_runtime_with(
    config: GptxConfig,
    transport: Arc<dyn AnswerTransport>,
    credentials: Option<Arc<dyn CredentialSource>>,
) -> Result<RuntimeBundle, RuntimeError> {
    let store = create_answer_store(config.store.clone())?;
    Ok(assemble(config, store, transport, credentials))
}

fn assemble(
    config: GptxConfig,
    store: Arc<dyn AnswerStore>,
    transport: Arc<dyn AnswerTransport>,
    credentials: Option<Arc<dyn CredentialSource>>,
) -> RuntimeBundle {
    let (session_hooks, cache_hooks) = observability_hooks(config.observability);

    let mut cache = AnswerCache::new(Arc::clone(&store)).with_hooks(cache_hooks);
    if let Some(retention) = config.retention {
        cache = cache.with_retention(retention);
    }
    let cache = Arc::new(cache);

    let mut service = AnswerService::new(Arc::clone(&cache), transport).with_hooks(session_hooks);
    if let Some(credentials) = credentials {
        service = service.with_credentials(credentials);
    }

    RuntimeBundle {
        store,
        cache,
        service: Arc::new(service),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use futures_util::stream;

    use crate::{
        AnswerRequest, AnswerStoreConfig, AnswerTransport, BoxFuture, ByteStream,
        RetentionPolicy, SessionEvent, SessionSink, SessionState, StaticCredential, StreamError,
        TransportConfig, TransportRequest,
    };

    use super::{GptxConfig, Observability, build_runtime_with};

    #[derive(Debug)]
    struct CannedTransport;

    impl AnswerTransport for CannedTransport {
        fn open<'a>(
            &'a self,
            _request: TransportRequest,
        ) -> BoxFuture<'a, Result<ByteStream, StreamError>> {
            Box::pin(async move {
                let body = "data: {\"type\":\"response.output_text.delta\",\"delta\":\"Cached soon\"}\n\n\
                            data: [DONE]\n\n";
                Ok(Box::pin(stream::iter([Ok(Bytes::from(body))])) as ByteStream)
            })
        }
    }

    #[derive(Default)]
    struct Collect {
        events: Mutex<Vec<SessionEvent>>,
    }

    impl SessionSink for Collect {
        fn on_final(&self, text: &str) {
            self.events
                .lock()
                .expect("events lock")
                .push(SessionEvent::Final(text.to_string()));
        }
    }

    #[test]
    fn config_defaults_to_responses_transport_and_sqlite_store() {
        let config = GptxConfig::default();
        assert_eq!(config.transport, TransportConfig::responses());
        assert!(matches!(config.store, AnswerStoreConfig::Sqlite { .. }));
        assert_eq!(config.retention, None);
        assert_eq!(config.observability, Observability::Tracing);
    }

    #[tokio::test]
    async fn runtime_streams_then_serves_from_cache() {
        let config = GptxConfig::default()
            .with_store(AnswerStoreConfig::InMemory)
            .with_retention(RetentionPolicy::new(30, 100))
            .with_observability(Observability::Off);
        let runtime = build_runtime_with(config, Arc::new(CannedTransport), None)
            .expect("runtime should build");

        let sink = Arc::new(Collect::default());
        let outcome = runtime
            .service
            .answer(AnswerRequest::new("q", "prompt"), sink.clone())
            .await
            .expect("answer should start");
        let handle = outcome.session().expect("first answer should stream");
        assert_eq!(handle.finished().await, SessionState::Finalized);

        let mut cached = false;
        for _ in 0..200 {
            if runtime
                .cache
                .lookup_key(handle.cache_key())
                .await
                .expect("lookup should work")
                .is_some()
            {
                cached = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(cached);

        let outcome = runtime
            .service
            .answer(AnswerRequest::new("q", "prompt"), sink.clone())
            .await
            .expect("answer should resolve");
        assert!(outcome.is_cached());
        assert_eq!(
            *sink.events.lock().expect("events lock"),
            vec![
                SessionEvent::Final("Cached soon".to_string()),
                SessionEvent::Final("Cached soon".to_string()),
            ]
        );
    }

    #[cfg(feature = "http-transport")]
    #[test]
    fn http_runtime_builds_with_static_credentials() {
        let config = GptxConfig::default()
            .with_store(AnswerStoreConfig::InMemory)
            .with_transport(TransportConfig::conversation());
        let runtime = super::build_runtime(config, Arc::new(StaticCredential::api_key("sk-test")))
            .expect("runtime should build");
        assert!(Arc::strong_count(&runtime.cache) >= 2);
    }
}
