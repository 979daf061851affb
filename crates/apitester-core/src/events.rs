//! Snapshot event channel.
//!
//! The manager never returns errors to its caller; progress and failures are
//! published here so a long-lived UI session can react without unwinding.

use crate::errors::ExError;
use crate::snapshot::{Phase, SnapshotSlot};
use apitester_core_types::RequestId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event published by the snapshot manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A slot was (re)populated
    SnapshotChange {
        phase: Phase,
        snapshots: SnapshotSlot,
        cycle_id: RequestId,
        taken_at: DateTime<Utc>,
    },
    /// A fetch failed or a snapshot routine aborted
    Error {
        message: String,
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl DomainEvent {
    pub fn error(message: impl Into<String>, err: &ExError) -> Self {
        DomainEvent::Error {
            message: message.into(),
            code: err.code().to_string(),
            error: Some(err.to_string()),
        }
    }

    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::SnapshotChange { .. } => "snapshotChange",
            DomainEvent::Error { .. } => "error",
        }
    }
}

/// Sink for manager events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventPublisher;

impl EventPublisher for NoopEventPublisher {
    fn publish(&self, _event: DomainEvent) {}
}

/// Fans events out to any number of live subscribers.
///
/// Slow subscribers lag and lose the oldest events once `capacity` is
/// exceeded; publishing never blocks.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            tracing::trace!(event = name, "no subscribers for domain event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use serde_json::json;

    #[test]
    fn test_error_event_wire_shape() {
        let err = ExError::new(ExErrorKind::FetchFailed).with_message("boom");
        let event = DomainEvent::error("Failed to fetch challenge c1", &err);
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["event"], json!("error"));
        assert_eq!(wire["message"], json!("Failed to fetch challenge c1"));
        assert_eq!(wire["code"], json!("ERR_FETCH_FAILED"));
        assert_eq!(wire["error"], json!("[ERR_FETCH_FAILED]: boom"));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let publisher = BroadcastEventPublisher::new(4);
        let mut rx = publisher.subscribe();
        publisher.publish(DomainEvent::SnapshotChange {
            phase: Phase::After,
            snapshots: SnapshotSlot::new(),
            cycle_id: RequestId::from_string("c".to_string()),
            taken_at: Utc::now(),
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "snapshotChange");
    }

    #[test]
    fn test_broadcast_without_subscribers_does_not_panic() {
        BroadcastEventPublisher::default().publish(DomainEvent::Error {
            message: "m".to_string(),
            code: "ERR_INTERNAL".to_string(),
            error: None,
        });
    }
}
