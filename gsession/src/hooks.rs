//! Session lifecycle hooks.

use std::time::Duration;

use gcommon::{SessionId, SurfaceId};
use gstream::StreamError;

/// Receives session lifecycle events. Every method defaults to a no-op.
pub trait SessionHooks: Send + Sync {
    fn on_session_start(&self, _session: &SessionId, _surface: &SurfaceId) {}

    fn on_session_superseded(&self, _previous: &SessionId, _next: &SessionId) {}

    fn on_first_delta(&self, _session: &SessionId, _elapsed: Duration) {}

    /// A payload that could not be interpreted was dropped.
    fn on_payload_discarded(&self, _session: &SessionId, _error: &StreamError) {}

    fn on_session_finalized(&self, _session: &SessionId, _answer_len: usize, _elapsed: Duration) {}

    fn on_session_failed(&self, _session: &SessionId, _error: &StreamError) {}

    fn on_session_cancelled(&self, _session: &SessionId) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionHooks;

impl SessionHooks for NoopSessionHooks {}
