//! Structural diff computation engine.
//!
//! The entry point is [`compute_diff`]. Absent operands (`None`) and JSON
//! `null` are treated alike. Whether a key changed is decided by deep value
//! equality of the two subtrees ([`json_eq`]): object key order never matters
//! and numbers compare by value, so `1` and `1.0` are equal.

use crate::diff::model::{Change, DiffNode, EntityDiff, JsonType, TypedValue};
use crate::snapshot::SnapshotSlot;
use serde_json::Value;
use std::collections::BTreeMap;

/// Compute the structural diff between two JSON values.
///
/// Inputs are never mutated; changed values are cloned into the result.
pub fn compute_diff(before: Option<&Value>, after: Option<&Value>) -> DiffNode {
    let before = before.filter(|v| !v.is_null());
    let after = after.filter(|v| !v.is_null());

    match (before, after) {
        (None, None) => DiffNode::empty(),
        (None, Some(after)) => DiffNode::Leaf(Change::Created {
            value: after.clone(),
        }),
        (Some(before), None) => DiffNode::Leaf(Change::Deleted {
            value: before.clone(),
        }),
        (Some(before), Some(after)) => diff_present(before, after),
    }
}

/// Diff every entity type recorded in `before` against the same type in `after`.
///
/// A type missing from `after`, or captured there with a null state, shows up
/// as `deleted`.
pub fn diff_slots(before: &SnapshotSlot, after: &SnapshotSlot) -> EntityDiff {
    before
        .iter()
        .map(|(entity_type, snapshot)| {
            let after_state = after.get(entity_type).and_then(|s| s.state.as_ref());
            (
                entity_type.clone(),
                compute_diff(snapshot.state.as_ref(), after_state),
            )
        })
        .collect()
}

fn diff_present(before: &Value, after: &Value) -> DiffNode {
    // Both operands are non-null here, so classification always succeeds.
    let (Some(before_type), Some(after_type)) = (JsonType::of(before), JsonType::of(after)) else {
        return DiffNode::empty();
    };

    if before_type != after_type {
        return DiffNode::Leaf(Change::ChangedType {
            before: TypedValue {
                json_type: before_type,
                value: before.clone(),
            },
            after: TypedValue {
                json_type: after_type,
                value: after.clone(),
            },
        });
    }

    match before_type {
        JsonType::Object => diff_entries(before, after),
        _ if json_eq(before, after) => DiffNode::empty(),
        _ => DiffNode::Leaf(Change::ChangedValue {
            before: before.clone(),
            after: after.clone(),
        }),
    }
}

/// Key-by-key diff of two objects or arrays. Arrays are keyed by index.
fn diff_entries(before: &Value, after: &Value) -> DiffNode {
    let before_entries = entries(before);
    let after_entries = entries(after);
    let mut out = BTreeMap::new();

    for (key, before_value) in &before_entries {
        match after_entries.get(key) {
            None => {
                out.insert(
                    key.clone(),
                    DiffNode::Leaf(Change::Removed {
                        value: (*before_value).clone(),
                    }),
                );
            }
            Some(after_value) if !json_eq(before_value, after_value) => {
                let child = compute_diff(Some(*before_value), Some(*after_value));
                if !child.is_empty() {
                    out.insert(key.clone(), child);
                }
            }
            Some(_) => {}
        }
    }

    for (key, after_value) in &after_entries {
        if !before_entries.contains_key(key) {
            out.insert(
                key.clone(),
                DiffNode::Leaf(Change::Added {
                    value: (*after_value).clone(),
                }),
            );
        }
    }

    DiffNode::Nested(out)
}

/// Deep equality with JSON number semantics.
///
/// Integers compare exactly; as soon as either side is a float both are
/// compared as `f64`.
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_f64() || y.is_f64() => {
            x.as_f64() == y.as_f64()
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

fn entries(value: &Value) -> BTreeMap<String, &Value> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => BTreeMap::new(),
    }
}
