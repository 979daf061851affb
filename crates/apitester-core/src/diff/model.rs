//! Structural diff output types.
//!
//! Nested diffs serialize as plain JSON objects keyed by field name (or array
//! index); leaf changes serialize as objects tagged with `_diff_type`:
//!
//! ```json
//! {"a": {"c": {"_diff_type": "changed_value", "before": 2, "after": 3}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-entity-type diff, keyed by entity type id.
pub type EntityDiff = BTreeMap<String, DiffNode>;

/// Coarse JSON type, following JavaScript `typeof` for non-null values.
///
/// Arrays and objects are both `Object`; null is never classified because
/// null operands are handled as absent before types are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Boolean,
    Object,
}

impl JsonType {
    /// Classify a non-null value. Returns `None` for `Value::Null`.
    pub fn of(value: &Value) -> Option<JsonType> {
        match value {
            Value::Null => None,
            Value::String(_) => Some(JsonType::String),
            Value::Number(_) => Some(JsonType::Number),
            Value::Bool(_) => Some(JsonType::Boolean),
            Value::Array(_) | Value::Object(_) => Some(JsonType::Object),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
        }
    }
}

/// A value paired with its type, carried by `changed_type` leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub json_type: JsonType,
    pub value: Value,
}

/// A single leaf change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_diff_type", rename_all = "snake_case")]
pub enum Change {
    /// Value absent before, present after
    Created { value: Value },
    /// Value present before, absent after
    Deleted { value: Value },
    /// Both present with different `typeof`
    ChangedType { before: TypedValue, after: TypedValue },
    /// Same primitive type, different value
    ChangedValue { before: Value, after: Value },
    /// Key only present in the after object
    Added { value: Value },
    /// Key only present in the before object
    Removed { value: Value },
}

impl Change {
    /// The `_diff_type` tag of this change
    pub fn tag(&self) -> &'static str {
        match self {
            Change::Created { .. } => "created",
            Change::Deleted { .. } => "deleted",
            Change::ChangedType { .. } => "changed_type",
            Change::ChangedValue { .. } => "changed_value",
            Change::Added { .. } => "added",
            Change::Removed { .. } => "removed",
        }
    }
}

/// Recursive diff between two JSON values.
///
/// `Nested` with no entries is the empty diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiffNode {
    Leaf(Change),
    Nested(BTreeMap<String, DiffNode>),
}

impl DiffNode {
    /// The empty diff
    pub fn empty() -> Self {
        DiffNode::Nested(BTreeMap::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DiffNode::Nested(children) if children.is_empty())
    }

    /// Number of leaf changes in this tree
    pub fn change_count(&self) -> usize {
        match self {
            DiffNode::Leaf(_) => 1,
            DiffNode::Nested(children) => children.values().map(DiffNode::change_count).sum(),
        }
    }

    /// Leaf changes with their key paths, depth first in key order.
    pub fn leaves(&self) -> Vec<(Vec<&str>, &Change)> {
        let mut out = Vec::new();
        collect_leaves(self, &mut Vec::new(), &mut out);
        out
    }

    /// Child diff for `key`, if this is a nested diff that has one
    pub fn get(&self, key: &str) -> Option<&DiffNode> {
        match self {
            DiffNode::Nested(children) => children.get(key),
            DiffNode::Leaf(_) => None,
        }
    }

    pub fn as_change(&self) -> Option<&Change> {
        match self {
            DiffNode::Leaf(change) => Some(change),
            DiffNode::Nested(_) => None,
        }
    }
}

fn collect_leaves<'a>(
    node: &'a DiffNode,
    path: &mut Vec<&'a str>,
    out: &mut Vec<(Vec<&'a str>, &'a Change)>,
) {
    match node {
        DiffNode::Leaf(change) => out.push((path.clone(), change)),
        DiffNode::Nested(children) => {
            for (key, child) in children {
                path.push(key.as_str());
                collect_leaves(child, path, out);
                path.pop();
            }
        }
    }
}
