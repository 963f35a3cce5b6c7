//! Normalization of stored answer values into [`CacheEntry`] records.
//!
//! Stores hold two shapes: bare answer strings written by early versions and
//! [`StoredAnswer`] objects. Both normalize to the same record.
//!
//! ```rust
//! use gcache::normalize_entry;
//! use serde_json::json;
//!
//! let legacy = normalize_entry("old question", Some(&json!("cached answer")))
//!     .expect("string values normalize");
//! assert!(legacy.is_legacy());
//! assert_eq!(legacy.mode.as_deref(), Some("legacy"));
//!
//! assert!(normalize_entry("k", Some(&json!(""))).is_none());
//! assert!(normalize_entry("k", None).is_none());
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use gcommon::{AnswerFormat, AnswerMode, Citations, Preferences};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::CacheError;

pub const LEGACY_LABEL: &str = "legacy";

/// Normalized view of one stored answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub storage_key: String,
    pub question: String,
    pub answer: String,
    pub mode: Option<String>,
    pub format: Option<String>,
    pub citations: Option<String>,
    /// Epoch milliseconds. `None` marks an entry written before timestamps.
    pub created_at: Option<i64>,
}

impl CacheEntry {
    pub fn is_legacy(&self) -> bool {
        self.created_at.is_none()
    }

    /// Timestamp used for age checks; undated entries count as the epoch.
    pub fn age_timestamp(&self) -> i64 {
        self.created_at.unwrap_or(0)
    }

    /// Preferences the answer was generated under, when they are known.
    pub fn preferences(&self) -> Option<Preferences> {
        let mode = self.mode.as_deref()?.parse::<AnswerMode>().ok()?;
        let format = self.format.as_deref()?.parse::<AnswerFormat>().ok()?;
        let citations = self
            .citations
            .as_deref()
            .and_then(|value| value.parse::<Citations>().ok())
            .unwrap_or_default();

        Some(Preferences::new(mode, format).with_citations(citations))
    }

    /// Label such as `Summary · Bullets · 2024-01-02T03:04:05Z`.
    pub fn meta_label(&self) -> String {
        let mut parts = Vec::new();
        for value in [self.mode.as_deref(), self.format.as_deref()]
            .into_iter()
            .flatten()
        {
            if !value.is_empty() && value != LEGACY_LABEL {
                parts.push(capitalize(value));
            }
        }

        if let Some(timestamp) = self
            .created_at
            .filter(|millis| *millis != 0)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
        {
            parts.push(timestamp.to_rfc3339_opts(SecondsFormat::Secs, true));
        }

        parts.join(" \u{b7} ")
    }

    /// Stored representation; normalizing it yields an equal entry.
    pub fn to_value(&self) -> Value {
        json!({
            "question": self.question,
            "answer": self.answer,
            "mode": self.mode,
            "format": self.format,
            "citations": self.citations,
            "createdAt": self.created_at,
        })
    }
}

/// Shape written for every answer finalized by this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnswer {
    pub question: String,
    pub answer: String,
    pub mode: AnswerMode,
    pub format: AnswerFormat,
    #[serde(default)]
    pub citations: Citations,
    pub created_at: i64,
}

impl StoredAnswer {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        preferences: &Preferences,
        created_at: i64,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            mode: preferences.mode,
            format: preferences.format,
            citations: preferences.citations,
            created_at,
        }
    }

    pub fn to_value(&self) -> Result<Value, CacheError> {
        serde_json::to_value(self).map_err(|error| {
            CacheError::invalid_request(format!("failed to serialize stored answer: {error}"))
        })
    }
}

/// Normalizes a raw stored value. Never panics; unusable values yield `None`.
pub fn normalize_entry(key: &str, value: Option<&Value>) -> Option<CacheEntry> {
    let value = value?;
    if is_falsy(value) {
        return None;
    }

    match value {
        Value::String(answer) => Some(CacheEntry {
            storage_key: key.to_string(),
            question: key.to_string(),
            answer: answer.clone(),
            mode: Some(LEGACY_LABEL.to_string()),
            format: Some(LEGACY_LABEL.to_string()),
            citations: None,
            created_at: None,
        }),
        Value::Object(object) => normalize_object(key, object),
        _ => None,
    }
}

fn normalize_object(key: &str, object: &Map<String, Value>) -> Option<CacheEntry> {
    let answer = non_empty_text(object.get("answer"))?;

    Some(CacheEntry {
        storage_key: key.to_string(),
        question: non_empty_text(object.get("question")).unwrap_or_else(|| key.to_string()),
        answer,
        mode: non_empty_text(object.get("mode")),
        format: non_empty_text(object.get("format")),
        citations: non_empty_text(object.get("citations")),
        created_at: object.get("createdAt").and_then(timestamp_millis),
    })
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn timestamp_millis(value: &Value) -> Option<i64> {
    if let Some(millis) = value.as_i64() {
        return Some(millis);
    }

    value
        .as_f64()
        .filter(|millis| millis.is_finite())
        .map(|millis| millis.floor() as i64)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_none_or(|number| number == 0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
