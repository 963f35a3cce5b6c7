//! Metrics-based observability hooks for session and cache phases.
//!
//! ```rust
//! use gcache::CacheHooks;
//! use gobserve::MetricsObservabilityHooks;
//!
//! fn accepts_cache_hooks(_hooks: &dyn CacheHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_cache_hooks(&hooks);
//! ```

use std::time::Duration;

use gcache::{CacheError, CacheHooks};
use gcommon::{SessionId, SurfaceId};
use gsession::SessionHooks;
use gstream::StreamError;

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl SessionHooks for MetricsObservabilityHooks {
    fn on_session_start(&self, _session: &SessionId, surface: &SurfaceId) {
        metrics::counter!(
            "gptx_session_start_total",
            "surface" => surface.to_string()
        )
        .increment(1);
    }

    fn on_session_superseded(&self, _previous: &SessionId, _next: &SessionId) {
        metrics::counter!("gptx_session_superseded_total").increment(1);
    }

    fn on_first_delta(&self, _session: &SessionId, elapsed: Duration) {
        metrics::histogram!("gptx_session_first_delta_seconds").record(elapsed.as_secs_f64());
    }

    fn on_payload_discarded(&self, _session: &SessionId, error: &StreamError) {
        metrics::counter!(
            "gptx_session_payload_discarded_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }

    fn on_session_finalized(&self, _session: &SessionId, answer_len: usize, elapsed: Duration) {
        metrics::counter!("gptx_session_finalized_total").increment(1);
        metrics::histogram!("gptx_session_duration_seconds").record(elapsed.as_secs_f64());
        metrics::histogram!("gptx_session_answer_bytes").record(answer_len as f64);
    }

    fn on_session_failed(&self, _session: &SessionId, error: &StreamError) {
        metrics::counter!(
            "gptx_session_failed_total",
            "error_code" => error.code()
        )
        .increment(1);
    }

    fn on_session_cancelled(&self, _session: &SessionId) {
        metrics::counter!("gptx_session_cancelled_total").increment(1);
    }
}

impl CacheHooks for MetricsObservabilityHooks {
    fn on_cache_hit(&self, _key: &str) {
        metrics::counter!("gptx_cache_hit_total").increment(1);
    }

    fn on_cache_miss(&self, _key: &str) {
        metrics::counter!("gptx_cache_miss_total").increment(1);
    }

    fn on_entry_persisted(&self, _key: &str, answer_len: usize) {
        metrics::counter!("gptx_cache_persisted_total").increment(1);
        metrics::histogram!("gptx_cache_answer_bytes").record(answer_len as f64);
    }

    fn on_entries_pruned(&self, keys: &[String]) {
        metrics::counter!("gptx_cache_pruned_total").increment(keys.len() as u64);
    }

    fn on_store_failure(&self, operation: &str, error: &CacheError) {
        metrics::counter!(
            "gptx_cache_store_failure_total",
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }
}
