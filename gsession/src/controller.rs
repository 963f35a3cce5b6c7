//! Surface-scoped streaming sessions.
//!
//! A [`SurfaceController`] owns at most one live session. Starting a new one
//! cancels the previous one, and once [`SessionHandle::cancel`] returns the
//! cancelled session never calls its sink again.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use futures_util::{StreamExt, stream};
//! use gcommon::BoxFuture;
//! use gsession::{AnswerRequest, SessionEvent, SurfaceController};
//! use gstream::{AnswerTransport, ByteStream, StreamError, TransportRequest};
//!
//! #[derive(Debug)]
//! struct Canned;
//!
//! impl AnswerTransport for Canned {
//!     fn open<'a>(
//!         &'a self,
//!         _request: TransportRequest,
//!     ) -> BoxFuture<'a, Result<ByteStream, StreamError>> {
//!         Box::pin(async move {
//!             let body = "data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hi\"}\n\n\
//!                         data: [DONE]\n\n";
//!             Ok(Box::pin(stream::iter([Ok(Bytes::from(body))])) as ByteStream)
//!         })
//!     }
//! }
//!
//! let runtime = tokio::runtime::Runtime::new().expect("runtime should build");
//! runtime.block_on(async {
//!     let controller = SurfaceController::new("results", Arc::new(Canned));
//!     let (_handle, events) = controller
//!         .start_stream(AnswerRequest::new("greeting", "Say hi"))
//!         .expect("session should start");
//!
//!     let events = events.collect::<Vec<_>>().await;
//!     assert_eq!(
//!         events,
//!         vec![
//!             SessionEvent::Delta("Hi".to_string()),
//!             SessionEvent::Final("Hi".to_string()),
//!         ]
//!     );
//! });
//! ```

use std::fmt::{Debug, Formatter};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::thread::{self, ThreadId};
use std::time::Instant;

use futures_core::Stream;
use futures_util::StreamExt;
use gcache::CacheKey;
use gcommon::{Clock, SessionId, SurfaceId, SystemClock};
use gstream::{
    AnswerTransport, ProviderMessage, StreamError, decode_frames, interpret_frame,
    stream_failure_error,
};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::SessionError;
use crate::hooks::{NoopSessionHooks, SessionHooks};
use crate::sink::{ChannelSink, SessionSink};
use crate::types::{AnswerRequest, SessionEvent, SessionState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SessionShared {
    id: SessionId,
    surface: SurfaceId,
    request: AnswerRequest,
    cache_key: CacheKey,
    started_at: i64,
    started: Instant,
    token: CancellationToken,
    state: watch::Sender<SessionState>,
    // Held for the duration of every sink callback.
    gate: Mutex<()>,
    dispatching: Mutex<Option<ThreadId>>,
    hooks: Arc<dyn SessionHooks>,
}

struct DispatchMark<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> DispatchMark<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(slot) = Some(thread::current().id());
        Self(slot)
    }
}

impl Drop for DispatchMark<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

impl SessionShared {
    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Terminal states are never left.
    fn transition(&self, next: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                return false;
            }
            *state = next;
            true
        })
    }

    /// Runs `deliver` under the gate unless the session is cancelled.
    ///
    /// A panicking callback fails the session; no further callback runs.
    fn dispatch(&self, deliver: impl FnOnce()) -> bool {
        let _gate = lock(&self.gate);
        if self.token.is_cancelled() {
            return false;
        }

        let _mark = DispatchMark::enter(&self.dispatching);
        if catch_unwind(AssertUnwindSafe(deliver)).is_ok() {
            return true;
        }

        self.token.cancel();
        if self.transition(SessionState::Failed) {
            self.hooks
                .on_session_failed(&self.id, &StreamError::sink("session sink panicked"));
        }
        false
    }

    fn dispatching_here(&self) -> bool {
        *lock(&self.dispatching) == Some(thread::current().id())
    }

    fn cancel(&self) -> bool {
        if self.state().is_terminal() {
            return false;
        }

        self.token.cancel();
        // Wait out a callback running on another thread. A callback on this
        // thread is cancelling its own session and already holds the gate.
        if !self.dispatching_here() {
            drop(lock(&self.gate));
        }

        let cancelled = self.transition(SessionState::Cancelled);
        if cancelled {
            self.hooks.on_session_cancelled(&self.id);
        }
        cancelled
    }

    fn finalize(&self, sink: &dyn SessionSink, text: &str) {
        let delivered = self.dispatch(|| {
            if self.transition(SessionState::Finalized) {
                sink.on_final(text);
            }
        });

        if delivered {
            self.hooks
                .on_session_finalized(&self.id, text.len(), self.started.elapsed());
        }
    }

    fn fail(&self, sink: &dyn SessionSink, error: StreamError) {
        if error.is_abort() {
            self.cancel();
            return;
        }

        let delivered = self.dispatch(|| {
            if self.transition(SessionState::Failed) {
                sink.on_error(&error);
            }
        });

        if delivered {
            self.hooks.on_session_failed(&self.id, &error);
        }
    }
}

/// Shared view of one session. Clones refer to the same session.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    fn new(
        surface: SurfaceId,
        request: AnswerRequest,
        hooks: Arc<dyn SessionHooks>,
        clock: &dyn Clock,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            shared: Arc::new(SessionShared {
                id: SessionId::new(Uuid::new_v4().to_string()),
                surface,
                cache_key: request.cache_key(),
                request,
                started_at: clock.now_millis(),
                started: Instant::now(),
                token: CancellationToken::new(),
                state,
                gate: Mutex::new(()),
                dispatching: Mutex::new(None),
                hooks,
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.shared.id
    }

    pub fn surface(&self) -> &SurfaceId {
        &self.shared.surface
    }

    pub fn request(&self) -> &AnswerRequest {
        &self.shared.request
    }

    pub fn cache_key(&self) -> &CacheKey {
        &self.shared.cache_key
    }

    pub fn display_question(&self) -> &str {
        self.shared.request.display_question()
    }

    /// Epoch milliseconds at which the session was created.
    pub fn started_at(&self) -> i64 {
        self.shared.started_at
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == SessionState::Cancelled
    }

    /// Stops the session and drops its transport.
    ///
    /// After this returns no further sink callback runs for the session.
    /// Returns `false` when the session had already reached a terminal state.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Waits until the session reaches a terminal state.
    pub async fn finished(&self) -> SessionState {
        let mut receiver = self.shared.state.subscribe();
        match receiver.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }
}

impl Debug for SessionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.shared.id)
            .field("surface", &self.shared.surface)
            .field("state", &self.state())
            .finish()
    }
}

/// Session updates as a stream. Yields nothing once the session is cancelled.
pub struct SessionEvents {
    receiver: mpsc::UnboundedReceiver<SessionEvent>,
    token: CancellationToken,
}

impl Stream for SessionEvents {
    type Item = SessionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.token.is_cancelled() {
            this.receiver.close();
            return Poll::Ready(None);
        }

        this.receiver.poll_recv(cx)
    }
}

pub struct SurfaceController {
    surface: SurfaceId,
    transport: Arc<dyn AnswerTransport>,
    hooks: Arc<dyn SessionHooks>,
    clock: Arc<dyn Clock>,
    active: Mutex<Option<SessionHandle>>,
}

impl SurfaceController {
    pub fn new(surface: impl Into<SurfaceId>, transport: Arc<dyn AnswerTransport>) -> Self {
        Self {
            surface: surface.into(),
            transport,
            hooks: Arc::new(NoopSessionHooks),
            clock: Arc::new(SystemClock),
            active: Mutex::new(None),
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

    pub fn surface(&self) -> &SurfaceId {
        &self.surface
    }

    /// The current session, if it has not reached a terminal state.
    pub fn active(&self) -> Option<SessionHandle> {
        lock(&self.active)
            .as_ref()
            .filter(|handle| !handle.state().is_terminal())
            .cloned()
    }

    /// Cancels the active session and starts a new one delivering to `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        request: AnswerRequest,
        sink: Arc<dyn SessionSink>,
    ) -> Result<SessionHandle, SessionError> {
        if request.prompt.trim().is_empty() {
            return Err(SessionError::invalid_request("prompt must not be empty"));
        }
        let runtime = Handle::try_current()
            .map_err(|error| SessionError::runtime(format!("no tokio runtime available: {error}")))?;

        let handle = SessionHandle::new(
            self.surface.clone(),
            request,
            Arc::clone(&self.hooks),
            self.clock.as_ref(),
        );

        let previous = lock(&self.active).replace(handle.clone());
        if let Some(previous) = previous
            && previous.cancel()
        {
            self.hooks
                .on_session_superseded(previous.id(), handle.id());
        }

        self.hooks.on_session_start(handle.id(), &self.surface);
        handle.shared.transition(SessionState::Requesting);
        runtime.spawn(run_session(
            Arc::clone(&handle.shared),
            Arc::clone(&self.transport),
            sink,
        ));

        Ok(handle)
    }

    /// Channel-backed variant of [`SurfaceController::start`].
    pub fn start_stream(
        &self,
        request: AnswerRequest,
    ) -> Result<(SessionHandle, SessionEvents), SessionError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = self.start(request, Arc::new(ChannelSink::new(sender)))?;
        let events = SessionEvents {
            receiver,
            token: handle.shared.token.clone(),
        };
        Ok((handle, events))
    }

    pub fn cancel(&self, handle: &SessionHandle) -> bool {
        {
            let mut active = lock(&self.active);
            if active
                .as_ref()
                .is_some_and(|current| current.id() == handle.id())
            {
                *active = None;
            }
        }

        handle.cancel()
    }

    pub fn cancel_active(&self) -> bool {
        let active = lock(&self.active).take();
        active.is_some_and(|handle| handle.cancel())
    }
}

impl Debug for SurfaceController {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceController")
            .field("surface", &self.surface)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

async fn run_session(
    shared: Arc<SessionShared>,
    transport: Arc<dyn AnswerTransport>,
    sink: Arc<dyn SessionSink>,
) {
    let token = shared.token.clone();
    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        opened = transport.open(shared.request.transport_request()) => opened,
    };

    let body = match opened {
        Ok(body) => body,
        Err(error) => {
            shared.fail(sink.as_ref(), error);
            return;
        }
    };
    shared.transition(SessionState::Streaming);

    let mut frames = decode_frames(body);
    let mut accumulated = String::new();
    let mut seen_delta = false;

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            next = frames.next() => next,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(error)) => {
                shared.fail(sink.as_ref(), error);
                return;
            }
            None => {
                shared.fail(
                    sink.as_ref(),
                    StreamError::transport("stream ended before completion"),
                );
                return;
            }
        };

        let message = match interpret_frame(&frame) {
            Ok(message) => message,
            Err(error) => {
                shared.hooks.on_payload_discarded(&shared.id, &error);
                continue;
            }
        };

        match message {
            ProviderMessage::Completed(text) => {
                if accumulated.is_empty()
                    && let Some(text) = text
                {
                    accumulated = text;
                }
                shared.finalize(sink.as_ref(), &accumulated);
                return;
            }
            ProviderMessage::Failed(details) => {
                shared.fail(sink.as_ref(), stream_failure_error(&details));
                return;
            }
            ProviderMessage::Ignored => {}
            update => {
                if !update.apply_to(&mut accumulated) {
                    continue;
                }
                if !seen_delta {
                    seen_delta = true;
                    shared
                        .hooks
                        .on_first_delta(&shared.id, shared.started.elapsed());
                }
                if !shared.dispatch(|| sink.on_delta(&accumulated)) {
                    return;
                }
            }
        }
    }
}
