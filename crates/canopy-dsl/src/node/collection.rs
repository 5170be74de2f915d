use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a [`Condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    /// Value equals the expected value
    Equals,
    /// Value differs from the expected value
    DoesNotEqual,
    /// Value is strictly greater than the expected value
    IsGreaterThan,
    /// Value is strictly less than the expected value
    IsLessThan,
    /// Value is present and not null
    IsSet,
    /// Value is absent or null
    IsNotSet,
    /// Value is boolean true
    IsTrue,
    /// Value is boolean false
    IsFalse,
}

impl Predicate {
    /// Whether the predicate compares against an expected value
    pub fn takes_value(&self) -> bool {
        matches!(
            self,
            Predicate::Equals
                | Predicate::DoesNotEqual
                | Predicate::IsGreaterThan
                | Predicate::IsLessThan
        )
    }
}

/// A predicate over a value selected from the data scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Path of the value under test, e.g. `data.price`
    pub key_path: String,

    /// Comparison to apply
    pub predicate: Predicate,

    /// Expected value for comparing predicates. String values may hold
    /// expression markers.
    #[serde(default)]
    pub value: Option<Value>,
}

impl Condition {
    /// Create a condition
    pub fn new(key_path: impl Into<String>, predicate: Predicate, value: Option<Value>) -> Self {
        Self {
            key_path: key_path.into(),
            predicate,
            value,
        }
    }
}

/// One sort key of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortDescriptor {
    /// Path of the sort key, e.g. `data.name`
    pub key_path: String,

    /// Sort direction
    #[serde(default = "default_true")]
    pub ascending: bool,
}

/// Window applied after filtering and sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limit {
    /// Number of items to keep
    pub show: usize,

    /// 1-based position of the first kept item
    #[serde(default = "default_start_at")]
    pub start_at: usize,
}

impl Limit {
    /// Keep the first `show` items
    pub fn first(show: usize) -> Self {
        Self { show, start_at: 1 }
    }
}

/// A node that repeats its children once per element of an array in the
/// data scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Path of the iterated array
    #[serde(default = "default_key_path")]
    pub key_path: String,

    /// All must hold for an element to be kept
    #[serde(default)]
    pub filters: Vec<Condition>,

    /// Applied in order; later descriptors break ties of earlier ones
    #[serde(default)]
    pub sort_descriptors: Vec<SortDescriptor>,

    /// Optional window applied last
    #[serde(default)]
    pub limit: Option<Limit>,
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            key_path: default_key_path(),
            filters: Vec::new(),
            sort_descriptors: Vec::new(),
            limit: None,
        }
    }
}

/// A node whose children render only while all its conditions hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    /// Conditions evaluated against the current scope
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

fn default_true() -> bool {
    true
}

fn default_start_at() -> usize {
    1
}

fn default_key_path() -> String {
    "data".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_defaults() {
        let collection: Collection = serde_json::from_value(json!({})).unwrap();
        assert_eq!(collection.key_path, "data");
        assert!(collection.filters.is_empty());
        assert!(collection.sort_descriptors.is_empty());
        assert!(collection.limit.is_none());
    }

    #[test]
    fn test_full_collection_config() {
        let collection: Collection = serde_json::from_value(json!({
            "keyPath": "data.items",
            "filters": [
                {"keyPath": "data.price", "predicate": "isGreaterThan", "value": 10}
            ],
            "sortDescriptors": [
                {"keyPath": "data.name"},
                {"keyPath": "data.price", "ascending": false}
            ],
            "limit": {"show": 3}
        }))
        .unwrap();

        assert_eq!(collection.key_path, "data.items");
        assert_eq!(collection.filters[0].predicate, Predicate::IsGreaterThan);
        assert_eq!(collection.filters[0].value, Some(json!(10)));
        assert!(collection.sort_descriptors[0].ascending);
        assert!(!collection.sort_descriptors[1].ascending);
        assert_eq!(collection.limit, Some(Limit::first(3)));
    }

    #[test]
    fn test_unknown_predicate_is_rejected() {
        let result = serde_json::from_value::<Condition>(json!({
            "keyPath": "data.x",
            "predicate": "matchesRegex"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_predicate_takes_value() {
        assert!(Predicate::Equals.takes_value());
        assert!(Predicate::IsLessThan.takes_value());
        assert!(!Predicate::IsSet.takes_value());
        assert!(!Predicate::IsTrue.takes_value());
    }
}
