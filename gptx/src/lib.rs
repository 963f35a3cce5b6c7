//! Unified facade over the gptx workspace crates.
//!
//! Most applications only need this crate. It re-exports the stream decoder,
//! answer cache, session controller and observability hooks, and wires them
//! together through [`runtime`].
//!
//! ```rust
//! use gptx::prelude::*;
//!
//! let request = answer_request(
//!     "rust async runtimes",
//!     "Compare the popular Rust async runtimes",
//!     Preferences::new(AnswerMode::Summary, AnswerFormat::Table),
//! );
//! assert_eq!(request.cache_key().as_str(), "gptx:rust async runtimes::summary::table");
//! ```

pub mod prelude;
pub mod runtime;
pub mod util;

pub use gcache;
pub use gcommon;
pub use gobserve;
pub use gsession;
pub use gstream;

pub use gcache::{
    ACCESS_TOKEN_KEY, AnswerCache, AnswerStore, AnswerStoreConfig, CacheEntry, CacheError,
    CacheErrorKind, CacheHooks, CacheKey, EXTENSION_ENABLED_KEY, FilesystemAnswerStore,
    HISTORY_RETENTION_KEY, InMemoryAnswerStore, NoopCacheHooks, PREFERENCES_KEY, PersistOutcome,
    RetentionPolicy, SqliteAnswerStore, StoreSnapshot, StoredAccessToken, StoredAnswer,
    build_cache_key, create_answer_store, create_default_answer_store, history_keys,
    normalize_entry, parse_cache_key, prune_keys, renderable_entries,
};
pub use gcommon::{
    AnswerFormat, AnswerMode, BoxFuture, Citations, Clock, FixedClock, Preferences, SessionId,
    SurfaceId, SystemClock,
};
pub use gobserve::{
    MetricsObservabilityHooks, SafeCacheHooks, SafeSessionHooks, TracingObservabilityHooks,
};
pub use gsession::{
    AnswerOutcome, AnswerRequest, AnswerService, DEFAULT_SURFACE, FnSessionSink,
    NoopSessionHooks, SessionError, SessionErrorKind, SessionEvent, SessionEvents, SessionHandle,
    SessionHooks, SessionSink, SessionState, SurfaceController,
};
pub use gstream::{
    AnswerTransport, ByteStream, CredentialSource, FrameEvent, FrameKind, FrameParser,
    ProviderMessage, RequestFormat, SecretString, StaticCredential, StreamError, StreamErrorKind,
    TransportAuth, TransportConfig, TransportRequest, classify_failure, decode_frames,
    interpret_frame, interpret_payload,
};

#[cfg(feature = "http-transport")]
pub use gstream::HttpAnswerTransport;

#[cfg(feature = "http-transport")]
pub use runtime::{build_runtime, build_runtime_with_stored_token};
pub use runtime::{
    GptxConfig, Observability, RuntimeBundle, RuntimeError, RuntimeErrorKind, build_runtime_with,
};
pub use util::{
    answer_request, load_preferences, preferences_from_value, preferences_to_value,
    save_preferences,
};

#[cfg(test)]
mod tests {
    use crate::{
        CacheError, CacheErrorKind, RuntimeError, RuntimeErrorKind, StreamError, StreamErrorKind,
    };

    #[test]
    fn runtime_errors_keep_the_source_message() {
        let error = RuntimeError::from(CacheError::storage("disk full"));
        assert_eq!(error.kind, RuntimeErrorKind::Store);
        assert!(error.message.contains("disk full"));

        let error = RuntimeError::from(StreamError::transport("connection refused"));
        assert_eq!(error.kind, RuntimeErrorKind::Transport);
        assert_eq!(error.to_string(), format!("Transport: {}", error.message));
    }

    #[test]
    fn facade_reexports_member_error_kinds() {
        assert_eq!(CacheError::storage("x").kind, CacheErrorKind::Storage);
        assert_eq!(StreamError::transport("x").kind, StreamErrorKind::Transport);
    }
}
