//! Cache fingerprints for `(question, mode, format)`.
//!
//! ```rust
//! use gcache::{build_cache_key, parse_cache_key};
//! use gcommon::{AnswerFormat, AnswerMode, Preferences};
//!
//! let preferences = Preferences::new(AnswerMode::Summary, AnswerFormat::Bullets);
//! let key = build_cache_key("best running shoes", &preferences);
//! assert_eq!(key.as_str(), "gptx:best running shoes::summary::bullets");
//!
//! let parsed = parse_cache_key(key.as_str()).expect("key should parse");
//! assert_eq!(parsed.question, "best running shoes");
//! assert_eq!(parsed.mode, AnswerMode::Summary);
//! ```

use std::fmt::{Display, Formatter};

use gcommon::{AnswerFormat, AnswerMode, Preferences};

pub const CACHE_KEY_PREFIX: &str = "gptx:";

const SEGMENT_SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Components recovered from a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCacheKey {
    pub question: String,
    pub mode: AnswerMode,
    pub format: AnswerFormat,
}

/// Builds the storage key. Citations do not take part in the fingerprint.
pub fn build_cache_key(question: &str, preferences: &Preferences) -> CacheKey {
    CacheKey(format!(
        "{CACHE_KEY_PREFIX}{question}{SEGMENT_SEPARATOR}{}{SEGMENT_SEPARATOR}{}",
        preferences.mode.as_str(),
        preferences.format.as_str()
    ))
}

/// Inverts [`build_cache_key`].
///
/// Splits from the right: mode and format names never contain `:`, so the
/// question may contain any text, including `::`.
pub fn parse_cache_key(key: &str) -> Option<ParsedCacheKey> {
    let rest = key.strip_prefix(CACHE_KEY_PREFIX)?;
    let (rest, format) = rest.rsplit_once(SEGMENT_SEPARATOR)?;
    let (question, mode) = rest.rsplit_once(SEGMENT_SEPARATOR)?;

    Some(ParsedCacheKey {
        question: question.to_string(),
        mode: mode.parse().ok()?,
        format: format.parse().ok()?,
    })
}

pub fn is_cache_key(key: &str) -> bool {
    parse_cache_key(key).is_some()
}
