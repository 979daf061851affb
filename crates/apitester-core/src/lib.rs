//! apitester core - domain-state snapshot and diff engine
//!
//! This crate captures the JSON state of backend entities before and after a
//! request under test and reports what changed:
//! - Entity id detection from request paths and bodies
//! - Before/after snapshot slots with an event channel for progress and errors
//! - A structural JSON diff with a human-readable summary
//! - Structured error and logging facilities shared by the other crates
//!
//! ```no_run
//! use std::sync::Arc;
//! use apitester_core::{DomainStateManager, InMemoryEntityStateFetcher, NoopEventPublisher};
//! use apitester_core::detect::RequestDescriptor;
//!
//! # async fn run() {
//! let fetcher = Arc::new(InMemoryEntityStateFetcher::new());
//! let mut manager = DomainStateManager::new(fetcher, Arc::new(NoopEventPublisher));
//! manager
//!     .take_before_snapshot(&RequestDescriptor::new("/users/u1"), Some(vec!["user".into()]))
//!     .await;
//! // ... send the request ...
//! manager.take_after_snapshot(None).await;
//! let diff = manager.calculate_diff();
//! # }
//! ```

pub mod detect;
pub mod diff;
pub mod entity;
pub mod errors;
pub mod events;
pub mod fetcher;
pub mod logging_facility;
pub mod manager;
pub mod snapshot;

/// Re-exported for the logging macros.
pub use apitester_core_types as core_types;

// Re-export commonly used types
pub use detect::{detect_entity_ids, EntityIds, RequestDescriptor};
pub use diff::{compute_diff, render_human_summary, DiffNode, EntityDiff};
pub use entity::{default_entity_types, EntityType};
pub use errors::{ApiTesterError, ExError, ExErrorKind, Result};
pub use events::{BroadcastEventPublisher, DomainEvent, EventPublisher, NoopEventPublisher};
pub use fetcher::{EntityStateFetcher, InMemoryEntityStateFetcher};
pub use manager::{DomainStateManager, FetchFailure, SnapshotReport, PLACEHOLDER_ENTITY_ID};
pub use snapshot::{Phase, Snapshot, SnapshotSlot};
