//! Retention policy and pruning of cached answers.
//!
//! ```rust
//! use gcache::{RetentionPolicy, StoreSnapshot, prune_keys};
//! use serde_json::json;
//!
//! let mut snapshot = StoreSnapshot::new();
//! snapshot.insert("old".to_string(), json!({"answer": "a", "createdAt": 1}));
//! snapshot.insert("new".to_string(), json!({"answer": "b", "createdAt": 2}));
//!
//! let doomed = prune_keys(&snapshot, &RetentionPolicy::new(0, 1), 10);
//! assert_eq!(doomed.into_iter().collect::<Vec<_>>(), vec!["old".to_string()]);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::history::{StoreSnapshot, renderable_entries};

pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Zero disables the corresponding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicy {
    pub ttl_days: u32,
    pub max_entries: u32,
}

impl RetentionPolicy {
    pub fn new(ttl_days: u32, max_entries: u32) -> Self {
        Self {
            ttl_days,
            max_entries,
        }
    }

    pub fn with_ttl_days(mut self, ttl_days: u32) -> Self {
        self.ttl_days = ttl_days;
        self
    }

    pub fn with_max_entries(mut self, max_entries: u32) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl_days == 0 && self.max_entries == 0
    }

    /// Reads loosely-typed stored settings (`{"ttlDays": .., "maxEntries": ..}`).
    ///
    /// Missing, non-numeric and non-finite values become 0, negatives are
    /// clamped to 0 and fractions are floored.
    pub fn from_value(value: &Value) -> Self {
        Self {
            ttl_days: retention_number(value.get("ttlDays")),
            max_entries: retention_number(value.get("maxEntries")),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "ttlDays": self.ttl_days,
            "maxEntries": self.max_entries,
        })
    }
}

fn retention_number(value: Option<&Value>) -> u32 {
    let number = match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Bool(flag)) => f64::from(u8::from(*flag)),
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                0.0
            } else {
                text.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Array(_) | Value::Object(_)) => f64::NAN,
    };

    if !number.is_finite() {
        return 0;
    }

    number.floor().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Keys to delete so the cache satisfies `policy` at `now_millis`.
///
/// Entries are ranked newest first; reserved keys and values that do not
/// normalize are neither deleted nor counted. The result is the union of the
/// TTL and max-entries rules.
pub fn prune_keys(
    snapshot: &StoreSnapshot,
    policy: &RetentionPolicy,
    now_millis: i64,
) -> BTreeSet<String> {
    let entries = renderable_entries(snapshot);
    let mut doomed = BTreeSet::new();

    if policy.ttl_days > 0 {
        let cutoff = now_millis.saturating_sub(i64::from(policy.ttl_days) * DAY_MILLIS);
        doomed.extend(
            entries
                .iter()
                .filter(|entry| entry.age_timestamp() < cutoff)
                .map(|entry| entry.storage_key.clone()),
        );
    }

    let max_entries = policy.max_entries as usize;
    if max_entries > 0 && entries.len() > max_entries {
        doomed.extend(
            entries[max_entries..]
                .iter()
                .map(|entry| entry.storage_key.clone()),
        );
    }

    doomed
}
