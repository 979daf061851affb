//! Structural JSON diff.
//!
//! Compares two arbitrary JSON values and produces a recursive diff tree of
//! created/deleted/added/removed/changed leaves.
//!
//! ## Entry point
//!
//! ```
//! use apitester_core::diff::compute_diff;
//! use serde_json::json;
//!
//! let diff = compute_diff(Some(&json!({"a": 1})), Some(&json!({"a": 1, "b": 2})));
//! assert_eq!(diff.change_count(), 1);
//! ```
//!
//! ## Rules
//!
//! - `null` and absent operands are the same thing.
//! - Type mismatches follow JavaScript `typeof`: arrays and objects are both
//!   `object` and are compared key by key.
//! - **Arrays are diffed positionally**: the index is the key, there is no
//!   alignment of moved elements.
//! - Keys whose values are deeply equal are omitted from the result. Numbers
//!   compare by value: `1` and `1.0` are equal.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::{compute_diff, diff_slots, json_eq};
pub use human_summary::render_human_summary;
pub use model::{Change, DiffNode, EntityDiff, JsonType, TypedValue};
