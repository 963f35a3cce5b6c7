//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use gcommon::{AnswerFormat, AnswerMode, Preferences, SessionId};
//!
//! let session = SessionId::from("session-1");
//! let preferences = Preferences::default()
//!     .with_mode(AnswerMode::Summary)
//!     .with_format(AnswerFormat::Steps);
//!
//! assert_eq!(session.as_str(), "session-1");
//! assert_eq!(preferences.mode.as_str(), "summary");
//! assert_eq!(preferences.format.to_string(), "steps");
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use gcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Identifier newtypes shared across crates.
    //!
    //! ```rust
    //! use gcommon::{SessionId, SurfaceId};
    //!
    //! let session = SessionId::new("session-42");
    //! let surface = SurfaceId::from("results-page");
    //!
    //! assert_eq!(session.to_string(), "session-42");
    //! assert_eq!(surface.as_str(), "results-page");
    //! ```

    use std::fmt::{Display, Formatter};

    macro_rules! string_id {
        ($name:ident) => {
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        };
    }

    string_id!(SessionId);
    string_id!(SurfaceId);
}

pub mod preferences {
    //! Answer preferences that shape the prompt and the cache fingerprint.
    //!
    //! ```rust
    //! use gcommon::{AnswerMode, Citations, Preferences};
    //!
    //! let mode: AnswerMode = "deep".parse().expect("known mode");
    //! let preferences = Preferences::new(mode, "table".parse().expect("known format"))
    //!     .with_citations(Citations::On);
    //!
    //! assert_eq!(preferences.mode, AnswerMode::Deep);
    //! assert!(preferences.citations.is_on());
    //! ```

    use std::fmt::{Display, Formatter};
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum AnswerMode {
        Summary,
        #[default]
        Balanced,
        Deep,
    }

    impl AnswerMode {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Summary => "summary",
                Self::Balanced => "balanced",
                Self::Deep => "deep",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum AnswerFormat {
        #[default]
        Bullets,
        Steps,
        Table,
    }

    impl AnswerFormat {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Bullets => "bullets",
                Self::Steps => "steps",
                Self::Table => "table",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Citations {
        #[default]
        Off,
        On,
    }

    impl Citations {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Off => "off",
                Self::On => "on",
            }
        }

        pub fn is_on(self) -> bool {
            self == Self::On
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UnknownPreference {
        pub field: &'static str,
        pub value: String,
    }

    impl Display for UnknownPreference {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "unknown {} '{}'", self.field, self.value)
        }
    }

    impl std::error::Error for UnknownPreference {}

    macro_rules! preference_text {
        ($ty:ident, $field:literal, [$($text:literal => $variant:ident),+ $(,)?]) => {
            impl Display for $ty {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = UnknownPreference;

                fn from_str(value: &str) -> Result<Self, Self::Err> {
                    match value.trim().to_ascii_lowercase().as_str() {
                        $($text => Ok(Self::$variant),)+
                        _ => Err(UnknownPreference {
                            field: $field,
                            value: value.to_string(),
                        }),
                    }
                }
            }
        };
    }

    preference_text!(AnswerMode, "mode", ["summary" => Summary, "balanced" => Balanced, "deep" => Deep]);
    preference_text!(AnswerFormat, "format", ["bullets" => Bullets, "steps" => Steps, "table" => Table]);
    preference_text!(Citations, "citations", ["off" => Off, "on" => On]);

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Preferences {
        pub mode: AnswerMode,
        pub format: AnswerFormat,
        pub citations: Citations,
    }

    impl Preferences {
        pub fn new(mode: AnswerMode, format: AnswerFormat) -> Self {
            Self {
                mode,
                format,
                citations: Citations::Off,
            }
        }

        pub fn with_mode(mut self, mode: AnswerMode) -> Self {
            self.mode = mode;
            self
        }

        pub fn with_format(mut self, format: AnswerFormat) -> Self {
            self.format = format;
            self
        }

        pub fn with_citations(mut self, citations: Citations) -> Self {
            self.citations = citations;
            self
        }
    }
}

pub mod clock {
    //! Wall-clock source in epoch milliseconds, swappable in tests.
    //!
    //! ```rust
    //! use gcommon::{Clock, FixedClock};
    //!
    //! let clock = FixedClock::new(1_700_000_000_000);
    //! assert_eq!(clock.now_millis(), 1_700_000_000_000);
    //! ```

    use std::sync::atomic::{AtomicI64, Ordering};

    pub trait Clock: Send + Sync {
        fn now_millis(&self) -> i64;
    }

    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now_millis(&self) -> i64 {
            chrono::Utc::now().timestamp_millis()
        }
    }

    #[derive(Debug, Default)]
    pub struct FixedClock {
        now: AtomicI64,
    }

    impl FixedClock {
        pub fn new(now_millis: i64) -> Self {
            Self {
                now: AtomicI64::new(now_millis),
            }
        }

        pub fn set(&self, now_millis: i64) {
            self.now.store(now_millis, Ordering::SeqCst);
        }

        pub fn advance(&self, millis: i64) {
            self.now.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{SessionId, SurfaceId};
pub use future::BoxFuture;
pub use preferences::{AnswerFormat, AnswerMode, Citations, Preferences, UnknownPreference};

#[cfg(test)]
mod tests {
    use super::{
        AnswerFormat, AnswerMode, Citations, Clock, FixedClock, Preferences, SessionId, SurfaceId,
    };

    #[test]
    fn id_newtypes_round_trip_strings() {
        let session = SessionId::new("session-1");
        let surface = SurfaceId::from("surface-1");

        assert_eq!(session.as_str(), "session-1");
        assert_eq!(surface.as_str(), "surface-1");
        assert_eq!(session.to_string(), "session-1");
        assert_eq!(surface.to_string(), "surface-1");
    }

    #[test]
    fn preferences_parse_case_insensitively_and_reject_unknown_values() {
        assert_eq!(" Summary ".parse::<AnswerMode>(), Ok(AnswerMode::Summary));
        assert_eq!("TABLE".parse::<AnswerFormat>(), Ok(AnswerFormat::Table));
        assert_eq!("on".parse::<Citations>(), Ok(Citations::On));

        let error = "verbose".parse::<AnswerMode>().expect_err("unknown mode");
        assert_eq!(error.field, "mode");
        assert_eq!(error.to_string(), "unknown mode 'verbose'");
    }

    #[test]
    fn preferences_default_and_builders() {
        let preferences = Preferences::default();
        assert_eq!(preferences.mode, AnswerMode::Balanced);
        assert_eq!(preferences.format, AnswerFormat::Bullets);
        assert_eq!(preferences.citations, Citations::Off);

        let updated = preferences
            .with_mode(AnswerMode::Deep)
            .with_format(AnswerFormat::Table)
            .with_citations(Citations::On);
        assert_eq!(updated, Preferences {
            mode: AnswerMode::Deep,
            format: AnswerFormat::Table,
            citations: Citations::On,
        });
    }

    #[test]
    fn preferences_deserialize_with_missing_fields() {
        let preferences: Preferences =
            serde_json::from_str(r#"{"mode":"summary"}"#).expect("preferences should parse");
        assert_eq!(preferences.mode, AnswerMode::Summary);
        assert_eq!(preferences.format, AnswerFormat::Bullets);

        let encoded = serde_json::to_string(&preferences).expect("preferences should encode");
        assert_eq!(
            encoded,
            r#"{"mode":"summary","format":"bullets","citations":"off"}"#
        );
    }

    #[test]
    fn fixed_clock_can_be_moved() {
        let clock = FixedClock::new(10);
        clock.advance(5);
        assert_eq!(clock.now_millis(), 15);
        clock.set(1);
        assert_eq!(clock.now_millis(), 1);
    }
}
