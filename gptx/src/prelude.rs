//! Common imports for most gptx applications.

pub use crate::{
    AnswerCache, AnswerFormat, AnswerMode, AnswerOutcome, AnswerRequest, AnswerService,
    AnswerStore, AnswerStoreConfig, AnswerTransport, BoxFuture, CacheEntry, CacheError,
    Citations, CredentialSource, FnSessionSink, GptxConfig, Observability, Preferences,
    RetentionPolicy, RuntimeBundle, RuntimeError, SessionError, SessionEvent, SessionHandle,
    SessionSink, SessionState, StaticCredential, StreamError, StreamErrorKind, SurfaceId,
    TransportConfig,
};
pub use crate::{
    answer_request, build_runtime_with, create_answer_store, load_preferences, save_preferences,
};

#[cfg(feature = "http-transport")]
pub use crate::{HttpAnswerTransport, build_runtime, build_runtime_with_stored_token};
