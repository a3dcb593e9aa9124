use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Device attribute holding the instant a device was first seen by the inventory
pub const FIRST_SEEN_ATTRIBUTE: &str = "firstSeen";

/// Boolean predicate over device attributes, in the inventory service's JSON wire form.
///
/// Stored filter predicates are opaque to this service: they are only embedded
/// into larger predicates, never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(Value);

impl Query {
    pub fn from_json(value: Value) -> Self {
        Self(value)
    }

    /// `{"lt": {attribute: value}}`
    pub fn less_than(attribute: &str, value: impl Into<Value>) -> Self {
        let mut comparison = serde_json::Map::new();
        comparison.insert(attribute.to_string(), value.into());
        Self(json!({ "lt": Value::Object(comparison) }))
    }

    /// `{"and": [left, right]}`
    pub fn and(left: Query, right: Query) -> Self {
        Self(json!({ "and": [left.0, right.0] }))
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Compact JSON encoding, as sent in the inventory `query` parameter
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }
}
