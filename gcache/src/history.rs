//! History listing over a store snapshot.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::entry::{CacheEntry, normalize_entry};

pub const EXTENSION_ENABLED_KEY: &str = "gptxExtensionEnabled";
pub const PREFERENCES_KEY: &str = "gptxPreferences";
pub const HISTORY_RETENTION_KEY: &str = "gptxHistoryRetention";
pub const ACCESS_TOKEN_KEY: &str = "gptxAccessToken";

/// Settings keys that share the store with cached answers.
pub const RESERVED_KEYS: &[&str] = &[
    EXTENSION_ENABLED_KEY,
    PREFERENCES_KEY,
    HISTORY_RETENTION_KEY,
    "gptxSecurityEnabled",
    "gptxSecurityAllowlist",
    "gptxSecurityBlocklist",
    "gptxSecuritySettings",
    "gptxSecurityReports",
    "gptxSecurityEvents",
    ACCESS_TOKEN_KEY,
];

pub type StoreSnapshot = BTreeMap<String, Value>;

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Normalized entries, newest first. Equal timestamps keep key order.
///
/// ```rust
/// use gcache::{StoreSnapshot, renderable_entries};
/// use serde_json::json;
///
/// let mut snapshot = StoreSnapshot::new();
/// snapshot.insert("a".to_string(), json!({"answer": "old", "createdAt": 1}));
/// snapshot.insert("b".to_string(), json!({"answer": "new", "createdAt": 2}));
/// snapshot.insert("gptxPreferences".to_string(), json!({"mode": "deep"}));
///
/// let entries = renderable_entries(&snapshot);
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].answer, "new");
/// ```
pub fn renderable_entries(snapshot: &StoreSnapshot) -> Vec<CacheEntry> {
    let mut entries = snapshot
        .iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .filter_map(|(key, value)| normalize_entry(key, Some(value)))
        .collect::<Vec<_>>();

    // Newest first. `None` orders below every timestamp, so undated entries
    // come last even after negative ones.
    entries.sort_by_key(|entry| std::cmp::Reverse(entry.created_at));
    entries
}

pub fn history_keys(snapshot: &StoreSnapshot) -> Vec<String> {
    renderable_entries(snapshot)
        .into_iter()
        .map(|entry| entry.storage_key)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{StoreSnapshot, history_keys, is_reserved_key, renderable_entries};

    #[test]
    fn reserved_and_unusable_values_are_skipped() {
        let mut snapshot = StoreSnapshot::new();
        snapshot.insert("gptxHistoryRetention".to_string(), json!({"ttlDays": 3}));
        snapshot.insert("gptxAccessToken".to_string(), json!("secret-token"));
        snapshot.insert("gptxExtensionEnabled".to_string(), json!(true));
        snapshot.insert("broken".to_string(), json!({"answer": ""}));
        snapshot.insert("legacy".to_string(), json!("old answer"));

        let entries = renderable_entries(&snapshot);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].storage_key, "legacy");
        assert!(is_reserved_key("gptxAccessToken"));
    }

    #[test]
    fn entries_sort_newest_first_with_legacy_last() {
        let mut snapshot = StoreSnapshot::new();
        snapshot.insert("legacy".to_string(), json!("text"));
        snapshot.insert("mid".to_string(), json!({"answer": "m", "createdAt": 200}));
        snapshot.insert("new".to_string(), json!({"answer": "n", "createdAt": 300}));
        snapshot.insert("tie-a".to_string(), json!({"answer": "a", "createdAt": 100}));
        snapshot.insert("tie-b".to_string(), json!({"answer": "b", "createdAt": 100}));

        assert_eq!(
            history_keys(&snapshot),
            vec!["new", "mid", "tie-a", "tie-b", "legacy"]
        );
    }
}
