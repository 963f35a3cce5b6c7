use std::sync::{Arc, Mutex};
use std::time::Duration;

use gcache::{AnswerCache, CacheError, CacheHooks, InMemoryAnswerStore, RetentionPolicy};
use gcommon::{FixedClock, Preferences, SessionId, SurfaceId};
use gsession::SessionHooks;
use gstream::StreamError;

use crate::{
    MetricsObservabilityHooks, SafeCacheHooks, SafeSessionHooks, TracingObservabilityHooks,
};

fn session() -> SessionId {
    SessionId::from("session-1")
}

fn exercise_session_hooks(hooks: &dyn SessionHooks) {
    let error = StreamError::rate_limited("slow down").with_status(429);

    hooks.on_session_start(&session(), &SurfaceId::from("results"));
    hooks.on_session_superseded(&session(), &SessionId::from("session-2"));
    hooks.on_first_delta(&session(), Duration::from_millis(120));
    hooks.on_payload_discarded(&session(), &StreamError::parse("expected value"));
    hooks.on_session_finalized(&session(), 42, Duration::from_millis(900));
    hooks.on_session_failed(&session(), &error);
    hooks.on_session_cancelled(&session());
}

fn exercise_cache_hooks(hooks: &dyn CacheHooks) {
    let key = "gptx:q::balanced::bullets";

    hooks.on_cache_hit(key);
    hooks.on_cache_miss(key);
    hooks.on_entry_persisted(key, 12);
    hooks.on_entries_pruned(&["old-1".to_string(), "old-2".to_string()]);
    hooks.on_store_failure("set", &CacheError::storage("disk full"));
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    let hooks = TracingObservabilityHooks;
    exercise_session_hooks(&hooks);
    exercise_cache_hooks(&hooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    let hooks = MetricsObservabilityHooks;
    exercise_session_hooks(&hooks);
    exercise_cache_hooks(&hooks);
}

#[derive(Default, Clone)]
struct RecordingHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingHooks {
    fn push(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl SessionHooks for RecordingHooks {
    fn on_session_start(&self, _session: &SessionId, _surface: &SurfaceId) {
        self.push("start");
    }

    fn on_session_superseded(&self, _previous: &SessionId, _next: &SessionId) {
        self.push("superseded");
    }

    fn on_first_delta(&self, _session: &SessionId, _elapsed: Duration) {
        self.push("first_delta");
    }

    fn on_payload_discarded(&self, _session: &SessionId, _error: &StreamError) {
        self.push("discarded");
    }

    fn on_session_finalized(&self, _session: &SessionId, _answer_len: usize, _elapsed: Duration) {
        self.push("finalized");
    }

    fn on_session_failed(&self, _session: &SessionId, _error: &StreamError) {
        self.push("failed");
    }

    fn on_session_cancelled(&self, _session: &SessionId) {
        self.push("cancelled");
    }
}

impl CacheHooks for RecordingHooks {
    fn on_cache_hit(&self, _key: &str) {
        self.push("hit");
    }

    fn on_cache_miss(&self, _key: &str) {
        self.push("miss");
    }

    fn on_entry_persisted(&self, _key: &str, _answer_len: usize) {
        self.push("persisted");
    }

    fn on_entries_pruned(&self, _keys: &[String]) {
        self.push("pruned");
    }

    fn on_store_failure(&self, _operation: &str, _error: &CacheError) {
        self.push("store_failure");
    }
}

struct PanicHooks;

impl SessionHooks for PanicHooks {
    fn on_session_start(&self, _session: &SessionId, _surface: &SurfaceId) {
        panic!("start panic");
    }

    fn on_session_superseded(&self, _previous: &SessionId, _next: &SessionId) {
        panic!("superseded panic");
    }

    fn on_first_delta(&self, _session: &SessionId, _elapsed: Duration) {
        panic!("first delta panic");
    }

    fn on_payload_discarded(&self, _session: &SessionId, _error: &StreamError) {
        panic!("discarded panic");
    }

    fn on_session_finalized(&self, _session: &SessionId, _answer_len: usize, _elapsed: Duration) {
        panic!("finalized panic");
    }

    fn on_session_failed(&self, _session: &SessionId, _error: &StreamError) {
        panic!("failed panic");
    }

    fn on_session_cancelled(&self, _session: &SessionId) {
        panic!("cancelled panic");
    }
}

impl CacheHooks for PanicHooks {
    fn on_cache_hit(&self, _key: &str) {
        panic!("hit panic");
    }

    fn on_cache_miss(&self, _key: &str) {
        panic!("miss panic");
    }

    fn on_entry_persisted(&self, _key: &str, _answer_len: usize) {
        panic!("persisted panic");
    }

    fn on_entries_pruned(&self, _keys: &[String]) {
        panic!("pruned panic");
    }

    fn on_store_failure(&self, _operation: &str, _error: &CacheError) {
        panic!("store failure panic");
    }
}

#[test]
fn safe_session_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingHooks::default();
    let events = Arc::clone(&inner.events);
    exercise_session_hooks(&SafeSessionHooks::new(inner));

    assert_eq!(
        *events.lock().expect("events lock"),
        vec![
            "start",
            "superseded",
            "first_delta",
            "discarded",
            "finalized",
            "failed",
            "cancelled",
        ]
    );
}

#[test]
fn safe_cache_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingHooks::default();
    let events = Arc::clone(&inner.events);
    exercise_cache_hooks(&SafeCacheHooks::new(inner));

    assert_eq!(
        *events.lock().expect("events lock"),
        vec!["hit", "miss", "persisted", "pruned", "store_failure"]
    );
}

#[test]
fn safe_session_hooks_swallow_panics() {
    exercise_session_hooks(&SafeSessionHooks::new(PanicHooks));
}

#[test]
fn safe_cache_hooks_swallow_panics() {
    exercise_cache_hooks(&SafeCacheHooks::new(PanicHooks));
}

#[tokio::test]
async fn panicking_cache_hooks_do_not_break_persistence() {
    let clock = Arc::new(FixedClock::new(1_000));
    let cache = AnswerCache::new(Arc::new(InMemoryAnswerStore::new()))
        .with_clock(clock.clone())
        .with_retention(RetentionPolicy::new(0, 1))
        .with_hooks(Arc::new(SafeCacheHooks::new(PanicHooks)));
    let preferences = Preferences::default();

    cache
        .persist("first", None, "one", &preferences)
        .await
        .expect("persist should work");
    clock.advance(1_000);
    let outcome = cache
        .persist("second", None, "two", &preferences)
        .await
        .expect("persist should work");

    assert_eq!(
        outcome.pruned.into_iter().collect::<Vec<_>>(),
        vec!["gptx:first::balanced::bullets".to_string()]
    );
    assert!(
        cache
            .lookup("second", &preferences)
            .await
            .expect("lookup should work")
            .is_some()
    );
}
