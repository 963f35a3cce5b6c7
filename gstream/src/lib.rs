//! Event-stream decoding, payload interpretation and the answer transport.
//!
//! Bytes from the transport flow through [`FrameParser`] into [`FrameEvent`]s,
//! which [`interpret_frame`] turns into [`ProviderMessage`]s. Failures are
//! reported as [`StreamError`]s classified by [`classify`].

pub mod classify;
mod credentials;
pub mod dialect;
mod error;
pub mod frame;
mod transport;

pub mod prelude {
    pub use crate::{
        AnswerTransport, ByteStream, CredentialSource, ErrorDetails, FrameEvent, FrameKind,
        FrameParser, FrameStream, ProviderMessage, RequestFormat, SecretString, StaticCredential,
        StreamError, StreamErrorKind, TransportAuth, TransportConfig, TransportRequest,
        decode_frames, interpret_frame, interpret_payload,
    };

    #[cfg(feature = "http-transport")]
    pub use crate::HttpAnswerTransport;
}

pub use classify::{
    ErrorDetails, classify_failure, classify_http_status, error_from_message,
    extract_error_details, http_error, parse_http_error_message, stream_failure_error,
};
pub use credentials::{CredentialSource, SecretString, StaticCredential, TransportAuth};
pub use dialect::{ProviderMessage, interpret_frame, interpret_payload};
pub use error::{StreamError, StreamErrorKind};
pub use frame::{DONE_SENTINEL, FrameEvent, FrameKind, FrameParser};
pub use transport::{
    AnswerTransport, ByteStream, FrameStream, RequestFormat, TransportConfig, TransportRequest,
    build_request_body, decode_frames,
};

#[cfg(feature = "http-transport")]
pub use transport::HttpAnswerTransport;
