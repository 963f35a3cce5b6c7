use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use gcache::{CacheError, CacheHooks};
use gcommon::{SessionId, SurfaceId};
use gsession::SessionHooks;
use gstream::StreamError;

pub struct SafeSessionHooks<H> {
    inner: H,
}

impl<H> SafeSessionHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> SessionHooks for SafeSessionHooks<H>
where
    H: SessionHooks,
{
    fn on_session_start(&self, session: &SessionId, surface: &SurfaceId) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_session_start(session, surface)
        }));
    }

    fn on_session_superseded(&self, previous: &SessionId, next: &SessionId) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_session_superseded(previous, next)
        }));
    }

    fn on_first_delta(&self, session: &SessionId, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_first_delta(session, elapsed)
        }));
    }

    fn on_payload_discarded(&self, session: &SessionId, error: &StreamError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_payload_discarded(session, error)
        }));
    }

    fn on_session_finalized(&self, session: &SessionId, answer_len: usize, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_session_finalized(session, answer_len, elapsed)
        }));
    }

    fn on_session_failed(&self, session: &SessionId, error: &StreamError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_session_failed(session, error)
        }));
    }

    fn on_session_cancelled(&self, session: &SessionId) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_session_cancelled(session)));
    }
}

pub struct SafeCacheHooks<H> {
    inner: H,
}

impl<H> SafeCacheHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> CacheHooks for SafeCacheHooks<H>
where
    H: CacheHooks,
{
    fn on_cache_hit(&self, key: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_cache_hit(key)));
    }

    fn on_cache_miss(&self, key: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_cache_miss(key)));
    }

    fn on_entry_persisted(&self, key: &str, answer_len: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_entry_persisted(key, answer_len)
        }));
    }

    fn on_entries_pruned(&self, keys: &[String]) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_entries_pruned(keys)));
    }

    fn on_store_failure(&self, operation: &str, error: &CacheError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_store_failure(operation, error)
        }));
    }
}
