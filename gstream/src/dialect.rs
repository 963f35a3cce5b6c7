//! Interpretation of decoded event payloads into [`ProviderMessage`] values.
//!
//! Two payload dialects share the same stream framing:
//!
//! - the conversation dialect sends the whole answer generated so far under
//!   `message.content.parts[0]` and ends with the `[DONE]` sentinel;
//! - the responses dialect sends objects tagged by `type`, carrying either an
//!   incremental fragment, the finished text, the full completion, or a
//!   failure.
//!
//! Chat-completion chunks (`choices[0].delta.content`) are treated as
//! incremental fragments.
//!
//! ```rust
//! use gstream::{FrameEvent, ProviderMessage, interpret_frame, interpret_payload};
//!
//! let delta = interpret_payload(r#"{"type":"response.output_text.delta","delta":"Hel"}"#)
//!     .expect("payload should parse");
//! assert_eq!(delta, ProviderMessage::Delta("Hel".to_string()));
//!
//! let snapshot = interpret_payload(r#"{"message":{"content":{"parts":["Hello"]}}}"#)
//!     .expect("payload should parse");
//! assert_eq!(snapshot, ProviderMessage::Snapshot("Hello".to_string()));
//!
//! let done = interpret_frame(&FrameEvent::sentinel()).expect("sentinel should interpret");
//! assert!(done.is_terminal());
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::frame::FrameEvent;
use crate::{ErrorDetails, StreamError};

/// One interpreted provider payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderMessage {
    /// Whole text generated so far; replaces accumulated text.
    Snapshot(String),
    /// Newly generated fragment; appended to accumulated text.
    Delta(String),
    /// Authoritative full text for the current output, not yet end of turn.
    TextDone(String),
    /// End of turn. Carries the completion text when the provider sent it.
    Completed(Option<String>),
    Failed(ErrorDetails),
    Ignored,
}

impl ProviderMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }

    /// Applies a text-bearing message to the accumulated answer.
    ///
    /// Returns `true` for every text-bearing message, including a snapshot
    /// equal to the current text, and `false` for the rest.
    pub fn apply_to(&self, accumulated: &mut String) -> bool {
        match self {
            Self::Snapshot(text) | Self::TextDone(text) => {
                accumulated.clear();
                accumulated.push_str(text);
                true
            }
            Self::Delta(fragment) => {
                accumulated.push_str(fragment);
                true
            }
            Self::Completed(_) | Self::Failed(_) | Self::Ignored => false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TaggedEvent {
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        #[serde(default)]
        delta: Option<String>,
    },
    #[serde(rename = "response.output_text.done")]
    OutputTextDone {
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(rename = "response.completed")]
    Completed {
        #[serde(default)]
        response: Option<Value>,
    },
    #[serde(rename = "response.failed")]
    Failed {
        #[serde(default)]
        response: Option<Value>,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        code: Option<Value>,
        #[serde(default)]
        error: Option<Value>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ConversationPayload {
    message: Option<ConversationMessage>,
}

#[derive(Debug, Deserialize)]
struct ConversationMessage {
    content: Option<ConversationContent>,
}

#[derive(Debug, Deserialize)]
struct ConversationContent {
    #[serde(default)]
    parts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    delta: Option<ChatDelta>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatDelta {
    content: Option<String>,
}

/// Interprets one decoded frame. The sentinel becomes `Completed(None)`.
pub fn interpret_frame(event: &FrameEvent) -> Result<ProviderMessage, StreamError> {
    if event.is_sentinel() {
        return Ok(ProviderMessage::Completed(None));
    }

    interpret_payload(&event.payload)
}

/// Interprets one `data` payload.
///
/// Returns a `Parse` error only for payloads that are not valid JSON. Valid
/// JSON that matches no known shape is `Ignored`.
pub fn interpret_payload(payload: &str) -> Result<ProviderMessage, StreamError> {
    let value = serde_json::from_str::<Value>(payload)?;
    let Some(object) = value.as_object() else {
        return Ok(ProviderMessage::Ignored);
    };

    if object.get("type").is_some_and(Value::is_string) {
        return interpret_tagged(value);
    }

    if object.contains_key("choices") {
        return Ok(interpret_chat_chunk(value));
    }

    if object.contains_key("message") {
        return Ok(interpret_conversation(value));
    }

    if let Some(details) = object.get("error").and_then(ErrorDetails::from_value) {
        return Ok(ProviderMessage::Failed(details));
    }

    Ok(ProviderMessage::Ignored)
}

fn interpret_tagged(value: Value) -> Result<ProviderMessage, StreamError> {
    let event = serde_json::from_value::<TaggedEvent>(value)?;

    Ok(match event {
        TaggedEvent::OutputTextDelta { delta } => match delta {
            Some(delta) if !delta.is_empty() => ProviderMessage::Delta(delta),
            _ => ProviderMessage::Ignored,
        },
        TaggedEvent::OutputTextDone { text } => match text {
            Some(text) if !text.is_empty() => ProviderMessage::TextDone(text),
            _ => ProviderMessage::Ignored,
        },
        TaggedEvent::Completed { response } => {
            ProviderMessage::Completed(response.as_ref().and_then(completion_text))
        }
        TaggedEvent::Failed { response } => ProviderMessage::Failed(
            response
                .as_ref()
                .and_then(|response| response.get("error"))
                .and_then(ErrorDetails::from_value)
                .unwrap_or_else(|| ErrorDetails::from_message("response failed")),
        ),
        TaggedEvent::Error {
            message,
            code,
            error,
        } => {
            let nested = error.as_ref().and_then(ErrorDetails::from_value);
            let details = nested.unwrap_or_else(|| ErrorDetails {
                message,
                error_type: None,
                code: code.as_ref().and_then(value_text),
            });
            if details.is_empty() {
                ProviderMessage::Failed(ErrorDetails::from_message("stream error"))
            } else {
                ProviderMessage::Failed(details)
            }
        }
        TaggedEvent::Unknown => ProviderMessage::Ignored,
    })
}

fn interpret_conversation(value: Value) -> ProviderMessage {
    let Ok(payload) = serde_json::from_value::<ConversationPayload>(value) else {
        return ProviderMessage::Ignored;
    };

    payload
        .message
        .and_then(|message| message.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| match part {
            Value::String(text) if !text.is_empty() => Some(ProviderMessage::Snapshot(text)),
            _ => None,
        })
        .unwrap_or(ProviderMessage::Ignored)
}

fn interpret_chat_chunk(value: Value) -> ProviderMessage {
    let Ok(chunk) = serde_json::from_value::<ChatChunk>(value) else {
        return ProviderMessage::Ignored;
    };

    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| {
            choice
                .delta
                .and_then(|delta| delta.content)
                .or(choice.text)
        })
        .filter(|fragment| !fragment.is_empty())
        .map(ProviderMessage::Delta)
        .unwrap_or(ProviderMessage::Ignored)
}

fn completion_text(response: &Value) -> Option<String> {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string()).filter(|text| !text.is_empty());
    }

    let text = response
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<String>();

    if text.is_empty() { None } else { Some(text) }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ProviderMessage, interpret_frame, interpret_payload};
    use crate::{ErrorDetails, FrameEvent, StreamErrorKind};

    fn interpret(payload: &str) -> ProviderMessage {
        interpret_payload(payload).expect("payload should interpret")
    }

    #[test]
    fn conversation_payload_is_a_snapshot() {
        assert_eq!(
            interpret(r#"{"message":{"id":"m1","content":{"content_type":"text","parts":["Hello wor"]}}}"#),
            ProviderMessage::Snapshot("Hello wor".to_string())
        );
        assert_eq!(
            interpret(r#"{"message":{"content":{"parts":[]}}}"#),
            ProviderMessage::Ignored
        );
        assert_eq!(
            interpret(r#"{"message":{"content":{"parts":[""]}}}"#),
            ProviderMessage::Ignored
        );
        assert_eq!(interpret(r#"{"message":null}"#), ProviderMessage::Ignored);
    }

    #[test]
    fn responses_dialect_variants_are_distinguished_by_tag() {
        assert_eq!(
            interpret(r#"{"type":"response.output_text.delta","item_id":"x","delta":"lo"}"#),
            ProviderMessage::Delta("lo".to_string())
        );
        assert_eq!(
            interpret(r#"{"type":"response.output_text.done","text":"Hello"}"#),
            ProviderMessage::TextDone("Hello".to_string())
        );
        assert_eq!(
            interpret(r#"{"type":"response.completed","response":{"status":"completed"}}"#),
            ProviderMessage::Completed(None)
        );
        assert_eq!(
            interpret(r#"{"type":"response.created","response":{}}"#),
            ProviderMessage::Ignored
        );
    }

    #[test]
    fn completion_text_is_collected_from_output_items() {
        let payload = r#"{"type":"response.completed","response":{"output":[
            {"type":"message","content":[
                {"type":"output_text","text":"Hello "},
                {"type":"refusal","refusal":"no"},
                {"type":"output_text","text":"world"}
            ]}
        ]}}"#;
        assert_eq!(
            interpret(payload),
            ProviderMessage::Completed(Some("Hello world".to_string()))
        );

        assert_eq!(
            interpret(r#"{"type":"response.completed","response":{"output_text":"Short"}}"#),
            ProviderMessage::Completed(Some("Short".to_string()))
        );
    }

    #[test]
    fn failures_carry_provider_details() {
        assert_eq!(
            interpret(
                r#"{"type":"response.failed","response":{"error":{"code":"server_error","message":"overloaded"}}}"#
            ),
            ProviderMessage::Failed(ErrorDetails {
                message: Some("overloaded".to_string()),
                error_type: None,
                code: Some("server_error".to_string()),
            })
        );

        assert_eq!(
            interpret(r#"{"type":"error","code":"insufficient_quota","message":"quota"}"#),
            ProviderMessage::Failed(ErrorDetails {
                message: Some("quota".to_string()),
                error_type: None,
                code: Some("insufficient_quota".to_string()),
            })
        );

        assert_eq!(
            interpret(r#"{"type":"response.failed"}"#),
            ProviderMessage::Failed(ErrorDetails::from_message("response failed"))
        );

        assert_eq!(
            interpret(r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#),
            ProviderMessage::Failed(ErrorDetails {
                message: Some("bad key".to_string()),
                error_type: Some("invalid_request_error".to_string()),
                code: None,
            })
        );
    }

    #[test]
    fn chat_completion_chunks_are_deltas() {
        assert_eq!(
            interpret(r#"{"choices":[{"index":0,"delta":{"content":"Hi"}}]}"#),
            ProviderMessage::Delta("Hi".to_string())
        );
        assert_eq!(
            interpret(r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#),
            ProviderMessage::Ignored
        );
        assert_eq!(
            interpret(r#"{"choices":[{"text":" there"}]}"#),
            ProviderMessage::Delta(" there".to_string())
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error_and_other_json_is_ignored() {
        let error = interpret_payload("{not json").expect_err("payload should fail");
        assert_eq!(error.kind, StreamErrorKind::Parse);

        assert_eq!(interpret("42"), ProviderMessage::Ignored);
        assert_eq!(interpret(r#"["a"]"#), ProviderMessage::Ignored);
        assert_eq!(interpret(r#"{"hello":"world"}"#), ProviderMessage::Ignored);
    }

    #[test]
    fn sentinel_frame_is_a_completion() {
        assert_eq!(
            interpret_frame(&FrameEvent::sentinel()).expect("sentinel should interpret"),
            ProviderMessage::Completed(None)
        );
        assert_eq!(
            interpret_frame(&FrameEvent::data(r#"{"type":"response.output_text.delta","delta":"a"}"#))
                .expect("data should interpret"),
            ProviderMessage::Delta("a".to_string())
        );
    }

    #[test]
    fn applying_messages_updates_accumulated_text() {
        let mut text = String::new();
        assert!(ProviderMessage::Delta("Hel".to_string()).apply_to(&mut text));
        assert!(ProviderMessage::Delta("lo".to_string()).apply_to(&mut text));
        assert_eq!(text, "Hello");

        assert!(ProviderMessage::Snapshot("Hello there".to_string()).apply_to(&mut text));
        assert!(ProviderMessage::TextDone("Hello there".to_string()).apply_to(&mut text));
        assert!(!ProviderMessage::Completed(Some("ignored".to_string())).apply_to(&mut text));
        assert!(!ProviderMessage::Ignored.apply_to(&mut text));
        assert_eq!(text, "Hello there");
    }
}
