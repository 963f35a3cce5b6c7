//! Answer transport trait, request formats and the reqwest-based HTTP client.
//!
//! ```rust
//! use gstream::{RequestFormat, TransportConfig};
//!
//! let config = TransportConfig::conversation();
//! assert_eq!(config.request_format, RequestFormat::Conversation);
//! assert_eq!(
//!     config.endpoint(),
//!     "https://chat.openai.com/backend-api/conversation"
//! );
//!
//! let config = TransportConfig::responses().with_model("gpt-4.1-mini");
//! assert_eq!(config.endpoint(), "https://api.openai.com/v1/responses");
//! ```

use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use gcommon::BoxFuture;
use serde_json::{Value, json};

use crate::frame::{FrameEvent, FrameParser};
use crate::StreamError;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<FrameEvent, StreamError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestFormat {
    /// `{action, messages, model, parent_message_id}` conversation body.
    Conversation,
    /// `{model, input, stream}` responses body.
    #[default]
    Responses,
    /// `{model, messages, stream}` chat-completions body.
    ChatCompletions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub base_url: String,
    pub path: String,
    pub model: String,
    pub request_format: RequestFormat,
    /// Connect timeout. Streams themselves are unbounded; cancel them instead.
    pub timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::responses()
    }
}

impl TransportConfig {
    pub fn conversation() -> Self {
        Self {
            base_url: "https://chat.openai.com/backend-api".to_string(),
            path: "conversation".to_string(),
            model: "text-davinci-002-render".to_string(),
            request_format: RequestFormat::Conversation,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn responses() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            path: "responses".to_string(),
            model: "gpt-4o-mini".to_string(),
            request_format: RequestFormat::Responses,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn chat_completions() -> Self {
        Self {
            path: "chat/completions".to_string(),
            request_format: RequestFormat::ChatCompletions,
            ..Self::responses()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

/// One outbound generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub prompt: String,
    pub model: Option<String>,
}

impl TransportRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Opens a streaming generation request and yields the raw response body.
///
/// Implementations classify non-success responses themselves, so a returned
/// stream always belongs to a successful response.
pub trait AnswerTransport: Send + Sync + std::fmt::Debug {
    fn open<'a>(&'a self, request: TransportRequest) -> BoxFuture<'a, Result<ByteStream, StreamError>>;
}

/// Builds the JSON body for `format`.
///
/// ```rust
/// use gstream::{RequestFormat, build_request_body};
///
/// let body = build_request_body(RequestFormat::Responses, "gpt-4o-mini", "why is the sky blue?");
/// assert_eq!(body["input"], "why is the sky blue?");
/// assert_eq!(body["stream"], true);
/// ```
pub fn build_request_body(format: RequestFormat, model: &str, prompt: &str) -> Value {
    match format {
        RequestFormat::Conversation => json!({
            "action": "next",
            "messages": [{
                "id": uuid::Uuid::new_v4().to_string(),
                "role": "user",
                "content": {
                    "content_type": "text",
                    "parts": [prompt],
                },
            }],
            "model": model,
            "parent_message_id": uuid::Uuid::new_v4().to_string(),
        }),
        RequestFormat::Responses => json!({
            "model": model,
            "input": prompt,
            "stream": true,
        }),
        RequestFormat::ChatCompletions => json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": true,
        }),
    }
}

/// Decodes a response body into frames with a fresh [`FrameParser`].
pub fn decode_frames(mut body: ByteStream) -> FrameStream {
    let stream = stream! {
        let mut parser = FrameParser::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => {
                    for event in parser.feed(&chunk) {
                        yield Ok(event);
                    }
                }
                Err(err) => {
                    yield Err(err);
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

#[cfg(feature = "http-transport")]
pub use http::HttpAnswerTransport;

#[cfg(feature = "http-transport")]
mod http {
    use std::sync::Arc;

    use futures_util::StreamExt;
    use gcommon::BoxFuture;
    use reqwest::header::{ACCEPT, CONTENT_TYPE};
    use reqwest::{Client, Response};

    use super::{AnswerTransport, ByteStream, TransportConfig, TransportRequest, build_request_body};
    use crate::classify::http_error;
    use crate::{CredentialSource, StreamError};

    pub struct HttpAnswerTransport {
        client: Client,
        config: TransportConfig,
        credentials: Arc<dyn CredentialSource>,
    }

    impl std::fmt::Debug for HttpAnswerTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("HttpAnswerTransport")
                .field("config", &self.config)
                .finish_non_exhaustive()
        }
    }

    impl HttpAnswerTransport {
        pub fn new(
            config: TransportConfig,
            credentials: Arc<dyn CredentialSource>,
        ) -> Result<Self, StreamError> {
            let mut builder = Client::builder();
            if let Some(timeout) = config.timeout {
                builder = builder.connect_timeout(timeout);
            }

            let client = builder
                .build()
                .map_err(|err| StreamError::transport(format!("failed to build http client: {err}")))?;

            Ok(Self::with_client(client, config, credentials))
        }

        pub fn with_client(
            client: Client,
            config: TransportConfig,
            credentials: Arc<dyn CredentialSource>,
        ) -> Self {
            Self {
                client,
                config,
                credentials,
            }
        }

        pub fn config(&self) -> &TransportConfig {
            &self.config
        }

        async fn parse_error(response: Response) -> StreamError {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            http_error(status, Some(&body))
        }
    }

    impl AnswerTransport for HttpAnswerTransport {
        fn open<'a>(
            &'a self,
            request: TransportRequest,
        ) -> BoxFuture<'a, Result<ByteStream, StreamError>> {
            Box::pin(async move {
                let auth = self.credentials.resolve().await?;
                let model = request.model.as_deref().unwrap_or(&self.config.model);
                let body = build_request_body(self.config.request_format, model, &request.prompt);

                let response = self
                    .client
                    .post(self.config.endpoint())
                    .header(CONTENT_TYPE, "application/json")
                    .header(ACCEPT, "text/event-stream")
                    .bearer_auth(auth.bearer())
                    .json(&body)
                    .send()
                    .await
                    .map_err(|err| {
                        if err.is_timeout() {
                            StreamError::transport(format!("request timed out: {err}"))
                        } else {
                            StreamError::transport(err.to_string())
                        }
                    })?;

                if !response.status().is_success() {
                    return Err(Self::parse_error(response).await);
                }

                let body = response
                    .bytes_stream()
                    .map(|item| item.map_err(|err| StreamError::transport(err.to_string())));

                Ok(Box::pin(body) as ByteStream)
            })
        }
    }
}
