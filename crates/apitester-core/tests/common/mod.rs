use apitester_core::errors::{ExError, ExErrorKind};
use apitester_core::{DomainEvent, EntityStateFetcher, EventPublisher, Phase, SnapshotSlot};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Publisher that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DomainEvent::Error { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn snapshot_changes(&self) -> Vec<(Phase, SnapshotSlot)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DomainEvent::SnapshotChange {
                    phase, snapshots, ..
                } => Some((phase, snapshots)),
                _ => None,
            })
            .collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Fetcher with scripted states, failures and panics per entity type
#[derive(Default)]
pub struct ScriptedFetcher {
    states: Mutex<HashMap<(String, String), Value>>,
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, entity_type: &str, entity_id: &str, state: Value) {
        self.states
            .lock()
            .unwrap()
            .insert((entity_type.to_string(), entity_id.to_string()), state);
    }

    pub fn remove(&self, entity_type: &str, entity_id: &str) {
        self.states
            .lock()
            .unwrap()
            .remove(&(entity_type.to_string(), entity_id.to_string()));
    }

    pub fn fail_type(&self, entity_type: &str) {
        self.failing.lock().unwrap().insert(entity_type.to_string());
    }

    pub fn recover_type(&self, entity_type: &str) {
        self.failing.lock().unwrap().remove(entity_type);
    }

    pub fn panic_on_type(&self, entity_type: &str) {
        self.panicking.lock().unwrap().insert(entity_type.to_string());
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntityStateFetcher for ScriptedFetcher {
    async fn fetch(&self, entity_type: &str, entity_id: &str) -> Result<Option<Value>, ExError> {
        self.calls
            .lock()
            .unwrap()
            .push((entity_type.to_string(), entity_id.to_string()));

        let panics = self.panicking.lock().unwrap().contains(entity_type);
        if panics {
            panic!("scripted panic for {}", entity_type);
        }

        let fails = self.failing.lock().unwrap().contains(entity_type);
        if fails {
            return Err(ExError::new(ExErrorKind::ExternalService)
                .with_op("fetch")
                .with_message("backend unavailable"));
        }

        Ok(self
            .states
            .lock()
            .unwrap()
            .get(&(entity_type.to_string(), entity_id.to_string()))
            .cloned())
    }
}

/// Owned selection list
#[allow(dead_code)]
pub fn types(ids: &[&str]) -> Option<Vec<String>> {
    Some(ids.iter().map(|s| s.to_string()).collect())
}
