//! Entity id detection for outgoing requests.
//!
//! Two passes run in order, later writes winning:
//!
//! 1. path scan: `<marker>/<id>` pairs, e.g. `/users/u1/challenges/c1`
//! 2. body scan: direct `<type>Id` keys, then `body.user.id`

use crate::entity::{binding_for_marker, ENTITY_BINDINGS};
use crate::errors::{ApiTesterError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Entity type id -> detected entity id
pub type EntityIds = BTreeMap<String, String>;

/// The request the console is about to send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            method: None,
            path: Some(path.into()),
            body: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Map known entity types to the ids referenced by `request`.
///
/// Types without an id are left out; an empty map is a normal result.
///
/// # Errors
///
/// `InvalidPathSegment` when an id segment following a path marker does not
/// percent-decode to UTF-8.
pub fn detect_entity_ids(request: &RequestDescriptor) -> Result<EntityIds> {
    let mut ids = EntityIds::new();

    if let Some(path) = request.path.as_deref() {
        scan_path(path, &mut ids)?;
    }

    if let Some(Value::Object(body)) = &request.body {
        for binding in ENTITY_BINDINGS {
            if let Some(id) = body.get(binding.body_key).and_then(stringify_id) {
                ids.insert(binding.entity_type.to_string(), id);
            }
        }

        // One level of nesting, user only.
        if let Some(Value::Object(user)) = body.get("user") {
            if let Some(id) = user.get("id").and_then(stringify_id) {
                ids.insert("user".to_string(), id);
            }
        }
    }

    Ok(ids)
}

fn scan_path(path: &str, ids: &mut EntityIds) -> Result<()> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').collect();

    for pair in segments.windows(2) {
        let (segment, next) = (pair[0], pair[1]);
        if next.is_empty() {
            continue;
        }
        if let Some(binding) = binding_for_marker(segment) {
            let id = urlencoding::decode(next).map_err(|_| ApiTesterError::InvalidPathSegment {
                segment: next.to_string(),
            })?;
            ids.insert(binding.entity_type.to_string(), id.into_owned());
        }
    }

    Ok(())
}

fn stringify_id(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
        other => Some(other.to_string()),
    }
}

/// Integral floats print without a fraction, so `7.0` and `7` name the same id.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}
