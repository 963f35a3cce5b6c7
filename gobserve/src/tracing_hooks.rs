//! Tracing-based observability hooks for session and cache phases.
//!
//! ```rust
//! use gobserve::TracingObservabilityHooks;
//! use gsession::SessionHooks;
//!
//! fn accepts_session_hooks(_hooks: &dyn SessionHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_session_hooks(&hooks);
//! ```

use std::time::Duration;

use gcache::{CacheError, CacheHooks};
use gcommon::{SessionId, SurfaceId};
use gsession::SessionHooks;
use gstream::StreamError;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl SessionHooks for TracingObservabilityHooks {
    fn on_session_start(&self, session: &SessionId, surface: &SurfaceId) {
        tracing::info!(
            phase = "session",
            event = "start",
            session_id = %session,
            surface = %surface
        );
    }

    fn on_session_superseded(&self, previous: &SessionId, next: &SessionId) {
        tracing::info!(
            phase = "session",
            event = "superseded",
            session_id = %previous,
            next_session_id = %next
        );
    }

    fn on_first_delta(&self, session: &SessionId, elapsed: Duration) {
        tracing::debug!(
            phase = "session",
            event = "first_delta",
            session_id = %session,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_payload_discarded(&self, session: &SessionId, error: &StreamError) {
        tracing::warn!(
            phase = "session",
            event = "payload_discarded",
            session_id = %session,
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_session_finalized(&self, session: &SessionId, answer_len: usize, elapsed: Duration) {
        tracing::info!(
            phase = "session",
            event = "finalized",
            session_id = %session,
            answer_len,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_session_failed(&self, session: &SessionId, error: &StreamError) {
        tracing::error!(
            phase = "session",
            event = "failed",
            session_id = %session,
            error_kind = ?error.kind,
            error_code = error.code(),
            status = error.status,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_session_cancelled(&self, session: &SessionId) {
        tracing::info!(phase = "session", event = "cancelled", session_id = %session);
    }
}

impl CacheHooks for TracingObservabilityHooks {
    fn on_cache_hit(&self, key: &str) {
        tracing::debug!(phase = "cache", event = "hit", key);
    }

    fn on_cache_miss(&self, key: &str) {
        tracing::debug!(phase = "cache", event = "miss", key);
    }

    fn on_entry_persisted(&self, key: &str, answer_len: usize) {
        tracing::info!(phase = "cache", event = "persisted", key, answer_len);
    }

    fn on_entries_pruned(&self, keys: &[String]) {
        tracing::info!(
            phase = "cache",
            event = "pruned",
            count = keys.len(),
            keys = ?keys
        );
    }

    fn on_store_failure(&self, operation: &str, error: &CacheError) {
        tracing::error!(
            phase = "cache",
            event = "store_failure",
            operation,
            error_kind = ?error.kind,
            error = %error
        );
    }
}
