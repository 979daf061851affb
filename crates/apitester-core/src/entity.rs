//! Entity type catalog.
//!
//! Each known entity type is bound to the plural path marker that precedes
//! its id in REST paths and to the body key that carries its id in request
//! payloads.

use serde::{Deserialize, Serialize};

/// A domain entity type the console can snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityType {
    /// Stable type key, e.g. `user`
    pub id: String,
    /// Display label, e.g. `User`
    pub name: String,
}

impl EntityType {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// How an entity type shows up in outgoing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityBinding {
    pub entity_type: &'static str,
    pub name: &'static str,
    /// Path segment that precedes the id, e.g. `users` in `/users/u1`
    pub path_marker: &'static str,
    /// Body key carrying the id, e.g. `userId`
    pub body_key: &'static str,
}

pub const ENTITY_BINDINGS: &[EntityBinding] = &[
    EntityBinding {
        entity_type: "user",
        name: "User",
        path_marker: "users",
        body_key: "userId",
    },
    EntityBinding {
        entity_type: "challenge",
        name: "Challenge",
        path_marker: "challenges",
        body_key: "challengeId",
    },
    EntityBinding {
        entity_type: "progress",
        name: "Progress",
        path_marker: "progress",
        body_key: "progressId",
    },
    EntityBinding {
        entity_type: "evaluation",
        name: "Evaluation",
        path_marker: "evaluations",
        body_key: "evaluationId",
    },
    EntityBinding {
        entity_type: "focusArea",
        name: "Focus Area",
        path_marker: "focus-areas",
        body_key: "focusAreaId",
    },
    EntityBinding {
        entity_type: "personality",
        name: "Personality",
        path_marker: "personalities",
        body_key: "personalityId",
    },
];

/// The binding whose path marker is exactly `segment`
pub fn binding_for_marker(segment: &str) -> Option<&'static EntityBinding> {
    ENTITY_BINDINGS.iter().find(|b| b.path_marker == segment)
}

/// The default catalog, in display order
pub fn default_entity_types() -> Vec<EntityType> {
    ENTITY_BINDINGS
        .iter()
        .map(|b| EntityType::new(b.entity_type, b.name))
        .collect()
}
