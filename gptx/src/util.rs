//! Small convenience helpers for stored preferences and requests.

use serde_json::Value;

use crate::{AnswerRequest, AnswerStore, CacheError, PREFERENCES_KEY, Preferences};

/// Reads stored preferences field by field. Unknown or missing values fall
/// back to the default for that field.
///
/// ```rust
/// use gptx::{AnswerFormat, AnswerMode, Citations, preferences_from_value};
/// use serde_json::json;
///
/// let preferences = preferences_from_value(&json!({"mode": "Deep", "format": "chart"}));
/// assert_eq!(preferences.mode, AnswerMode::Deep);
/// assert_eq!(preferences.format, AnswerFormat::Bullets);
/// assert_eq!(preferences.citations, Citations::Off);
/// ```
pub fn preferences_from_value(value: &Value) -> Preferences {
    let field = |name: &str| value.get(name).and_then(Value::as_str);
    let defaults = Preferences::default();

    Preferences {
        mode: field("mode")
            .and_then(|text| text.parse().ok())
            .unwrap_or(defaults.mode),
        format: field("format")
            .and_then(|text| text.parse().ok())
            .unwrap_or(defaults.format),
        citations: field("citations")
            .and_then(|text| text.parse().ok())
            .unwrap_or(defaults.citations),
    }
}

pub fn preferences_to_value(preferences: &Preferences) -> Value {
    serde_json::json!({
        "mode": preferences.mode.as_str(),
        "format": preferences.format.as_str(),
        "citations": preferences.citations.as_str(),
    })
}

pub async fn load_preferences(store: &dyn AnswerStore) -> Result<Preferences, CacheError> {
    Ok(store
        .get(PREFERENCES_KEY)
        .await?
        .as_ref()
        .map(preferences_from_value)
        .unwrap_or_default())
}

pub async fn save_preferences(
    store: &dyn AnswerStore,
    preferences: &Preferences,
) -> Result<(), CacheError> {
    store
        .set(PREFERENCES_KEY, preferences_to_value(preferences))
        .await
}

pub fn answer_request(
    question: impl Into<String>,
    prompt: impl Into<String>,
    preferences: Preferences,
) -> AnswerRequest {
    AnswerRequest::new(question, prompt).with_preferences(preferences)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        AnswerFormat, AnswerMode, AnswerStore, Citations, InMemoryAnswerStore, PREFERENCES_KEY,
        Preferences,
    };

    use super::{answer_request, load_preferences, preferences_from_value, save_preferences};

    #[test]
    fn stored_preferences_parse_leniently() {
        assert_eq!(
            preferences_from_value(&json!({"mode": "summary", "format": "TABLE", "citations": "on"})),
            Preferences::new(AnswerMode::Summary, AnswerFormat::Table).with_citations(Citations::On)
        );
        assert_eq!(preferences_from_value(&json!("junk")), Preferences::default());
        assert_eq!(
            preferences_from_value(&json!({"mode": 3, "format": "steps"})),
            Preferences::default().with_format(AnswerFormat::Steps)
        );
    }

    #[tokio::test]
    async fn preferences_round_trip_through_the_store() {
        let store = InMemoryAnswerStore::new();
        assert_eq!(
            load_preferences(&store).await.expect("load should work"),
            Preferences::default()
        );

        let preferences = Preferences::new(AnswerMode::Deep, AnswerFormat::Steps);
        save_preferences(&store, &preferences)
            .await
            .expect("save should work");
        assert_eq!(
            store.get(PREFERENCES_KEY).await.expect("get should work"),
            Some(json!({"mode": "deep", "format": "steps", "citations": "off"}))
        );
        assert_eq!(
            load_preferences(&store).await.expect("load should work"),
            preferences
        );
    }

    #[test]
    fn answer_request_carries_preferences_into_the_cache_key() {
        let request = answer_request(
            "best laptops",
            "List the best laptops",
            Preferences::new(AnswerMode::Summary, AnswerFormat::Table),
        );
        assert_eq!(request.cache_key().as_str(), "gptx:best laptops::summary::table");
    }
}
