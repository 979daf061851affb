//! Snapshot slot types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Captured entity state. `state` is `None` when the entity was missing or
/// could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub state: Option<Value>,
}

impl Snapshot {
    pub fn captured(id: impl Into<String>, state: Value) -> Self {
        Self {
            id: id.into(),
            state: Some(state),
        }
    }

    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: None,
        }
    }
}

/// Entity type id -> snapshot
pub type SnapshotSlot = BTreeMap<String, Snapshot>;

/// Which slot a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
