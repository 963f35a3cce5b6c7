//! Receivers for session callbacks.

use gstream::StreamError;
use tokio::sync::mpsc::UnboundedSender;

use crate::types::SessionEvent;

/// Receives the updates of one session.
///
/// Callbacks run synchronously on the session task and must not block. They
/// may cancel their own session.
pub trait SessionSink: Send + Sync {
    fn on_delta(&self, _text: &str) {}

    fn on_final(&self, _text: &str) {}

    fn on_error(&self, _error: &StreamError) {}
}

/// Adapts a closure over [`SessionEvent`] into a sink.
///
/// ```rust
/// use gsession::{FnSessionSink, SessionEvent, SessionSink};
///
/// let sink = FnSessionSink::new(|event| {
///     if let SessionEvent::Final(text) = event {
///         assert_eq!(text, "done");
///     }
/// });
/// sink.on_final("done");
/// ```
pub struct FnSessionSink<F> {
    callback: F,
}

impl<F> FnSessionSink<F>
where
    F: Fn(SessionEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> SessionSink for FnSessionSink<F>
where
    F: Fn(SessionEvent) + Send + Sync,
{
    fn on_delta(&self, text: &str) {
        (self.callback)(SessionEvent::Delta(text.to_string()));
    }

    fn on_final(&self, text: &str) {
        (self.callback)(SessionEvent::Final(text.to_string()));
    }

    fn on_error(&self, error: &StreamError) {
        (self.callback)(SessionEvent::Error(error.clone()));
    }
}

pub(crate) struct ChannelSink {
    sender: UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    pub(crate) fn new(sender: UnboundedSender<SessionEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}

impl SessionSink for ChannelSink {
    fn on_delta(&self, text: &str) {
        self.send(SessionEvent::Delta(text.to_string()));
    }

    fn on_final(&self, text: &str) {
        self.send(SessionEvent::Final(text.to_string()));
    }

    fn on_error(&self, error: &StreamError) {
        self.send(SessionEvent::Error(error.clone()));
    }
}
