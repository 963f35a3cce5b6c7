//! Streaming answer sessions: one live session per surface, cancel and
//! supersede semantics, and cache-then-stream orchestration.

mod controller;
mod error;
mod hooks;
mod service;
mod sink;
mod types;

pub mod prelude {
    pub use crate::{
        AnswerOutcome, AnswerRequest, AnswerService, FnSessionSink, NoopSessionHooks,
        SessionError, SessionErrorKind, SessionEvent, SessionEvents, SessionHandle, SessionHooks,
        SessionSink, SessionState, SurfaceController,
    };
    pub use gcommon::{Preferences, SessionId, SurfaceId};
}

pub use controller::{SessionEvents, SessionHandle, SurfaceController};
pub use error::{SessionError, SessionErrorKind};
pub use hooks::{NoopSessionHooks, SessionHooks};
pub use service::{AnswerOutcome, AnswerService};
pub use sink::{FnSessionSink, SessionSink};
pub use types::{AnswerRequest, DEFAULT_SURFACE, SessionEvent, SessionState};
