//! Entity state fetcher seam.

use crate::errors::{ExError, ExErrorKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Reads the current state of one entity.
///
/// `Ok(None)` means the entity does not exist (HTTP 404 in the HTTP
/// implementation); every other failure is an `Err`.
#[async_trait]
pub trait EntityStateFetcher: Send + Sync {
    async fn fetch(&self, entity_type: &str, entity_id: &str) -> Result<Option<Value>, ExError>;
}

/// Fetcher backed by an in-process map, for offline runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryEntityStateFetcher {
    entities: RwLock<HashMap<(String, String), Value>>,
}

impl InMemoryEntityStateFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the state of an entity.
    pub fn put(&self, entity_type: &str, entity_id: &str, state: Value) {
        if let Ok(mut entities) = self.entities.write() {
            entities.insert((entity_type.to_string(), entity_id.to_string()), state);
        }
    }

    /// Remove an entity, returning its last state.
    pub fn remove(&self, entity_type: &str, entity_id: &str) -> Option<Value> {
        self.entities
            .write()
            .ok()?
            .remove(&(entity_type.to_string(), entity_id.to_string()))
    }
}

#[async_trait]
impl EntityStateFetcher for InMemoryEntityStateFetcher {
    async fn fetch(&self, entity_type: &str, entity_id: &str) -> Result<Option<Value>, ExError> {
        let entities = self.entities.read().map_err(|_| {
            ExError::new(ExErrorKind::Internal)
                .with_op("fetch")
                .with_message("in-memory entity map lock poisoned")
        })?;
        Ok(entities
            .get(&(entity_type.to_string(), entity_id.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_fetch_remove() {
        let fetcher = InMemoryEntityStateFetcher::new();
        fetcher.put("user", "u1", json!({"name": "Al"}));
        assert_eq!(
            fetcher.fetch("user", "u1").await.unwrap(),
            Some(json!({"name": "Al"}))
        );
        assert_eq!(fetcher.fetch("user", "u2").await.unwrap(), None);
        assert!(fetcher.remove("user", "u1").is_some());
        assert_eq!(fetcher.fetch("user", "u1").await.unwrap(), None);
    }
}
