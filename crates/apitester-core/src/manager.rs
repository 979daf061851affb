//! Before/after domain-state snapshots around a request under test.
//!
//! ## Cycle
//! 1. `take_before_snapshot` detects entity ids in the request, clears both
//!    slots and fetches every target type into "before"
//! 2. the caller sends the request
//! 3. `take_after_snapshot` refetches the ids recorded in "before"
//! 4. `calculate_diff` compares the two slots per entity type
//!
//! Fetches run sequentially in target order. A failed fetch is reported as an
//! `error` event and the batch continues. Anything else that goes wrong inside
//! a snapshot routine, including a panic, aborts that call, is reported as an
//! `error` event, and the call still returns normally.
//!
//! Mutating operations take `&mut self`, so one manager can never run two
//! snapshot routines at once.

use crate::detect::{detect_entity_ids, RequestDescriptor};
use crate::diff::{diff_slots, EntityDiff};
use crate::entity::{default_entity_types, EntityType};
use crate::errors::{ApiTesterError, ExError, ExErrorKind};
use crate::events::{DomainEvent, EventPublisher};
use crate::fetcher::EntityStateFetcher;
use crate::snapshot::{Phase, Snapshot, SnapshotSlot};
use crate::{log_op_end, log_op_error, log_op_start};
use apitester_core_types::RequestId;
use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Id fetched for a selected type when the request names none.
pub const PLACEHOLDER_ENTITY_ID: &str = "placeholder-id";

const OP_BEFORE: &str = "take_before_snapshot";
const OP_AFTER: &str = "take_after_snapshot";

/// One entity fetch that failed during a snapshot.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub entity_type: String,
    pub entity_id: String,
    pub error: ExError,
}

/// Outcome of one snapshot call.
///
/// Mirrors what was published on the event channel.
#[derive(Debug, Clone)]
pub struct SnapshotReport {
    pub phase: Phase,
    pub cycle_id: RequestId,
    /// Slot contents after the call
    pub snapshots: SnapshotSlot,
    pub failures: Vec<FetchFailure>,
    /// Set when the routine stopped early
    pub aborted: Option<ExError>,
}

impl SnapshotReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty() && self.aborted.is_none()
    }
}

/// Owns the "before" and "after" slots of one console session.
pub struct DomainStateManager {
    entity_types: Vec<EntityType>,
    fetcher: Arc<dyn EntityStateFetcher>,
    publisher: Arc<dyn EventPublisher>,
    before: SnapshotSlot,
    after: SnapshotSlot,
    cycle_id: Option<RequestId>,
}

impl DomainStateManager {
    /// Manager over the default entity catalog.
    pub fn new(fetcher: Arc<dyn EntityStateFetcher>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            entity_types: default_entity_types(),
            fetcher,
            publisher,
            before: SnapshotSlot::new(),
            after: SnapshotSlot::new(),
            cycle_id: None,
        }
    }

    /// Replace the entity catalog.
    pub fn with_entity_types(mut self, entity_types: Vec<EntityType>) -> Self {
        self.entity_types = entity_types;
        self
    }

    /// Copy of the configured catalog
    pub fn entity_types(&self) -> Vec<EntityType> {
        self.entity_types.clone()
    }

    pub fn before(&self) -> &SnapshotSlot {
        &self.before
    }

    pub fn after(&self) -> &SnapshotSlot {
        &self.after
    }

    /// Correlation id of the latest before snapshot
    pub fn last_cycle_id(&self) -> Option<&RequestId> {
        self.cycle_id.as_ref()
    }

    /// Empty both slots.
    pub fn clear(&mut self) {
        self.before.clear();
        self.after.clear();
        self.cycle_id = None;
    }

    /// Capture the "before" slot for `request`.
    ///
    /// `selected` limits the entity types; `None` means the whole catalog.
    /// Types without a detected id are fetched with [`PLACEHOLDER_ENTITY_ID`].
    /// Types that are not found get no entry.
    pub async fn take_before_snapshot(
        &mut self,
        request: &RequestDescriptor,
        selected: Option<Vec<String>>,
    ) -> SnapshotReport {
        let started = Instant::now();
        let cycle_id = RequestId::new();
        log_op_start!(OP_BEFORE, cycle_id = %cycle_id, path = request.path.as_deref().unwrap_or(""));

        let outcome = AssertUnwindSafe(self.run_before(request, selected, &cycle_id))
            .catch_unwind()
            .await;

        let report = match outcome {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => self.abort(Phase::Before, &cycle_id, err),
            Err(panic) => {
                let err = panic_error(Phase::Before, panic);
                self.abort(Phase::Before, &cycle_id, err)
            }
        };

        self.finish(OP_BEFORE, &report, started);
        report
    }

    /// Capture the "after" slot.
    ///
    /// `selected` defaults to every type present in "before". Ids always come
    /// from "before"; a type with no before snapshot is skipped. Missing or
    /// failed fetches are stored with a null state so deletions show up.
    pub async fn take_after_snapshot(&mut self, selected: Option<Vec<String>>) -> SnapshotReport {
        let started = Instant::now();
        let cycle_id = self.cycle_id.clone().unwrap_or_default();
        log_op_start!(OP_AFTER, cycle_id = %cycle_id);

        let outcome = AssertUnwindSafe(self.run_after(selected, &cycle_id))
            .catch_unwind()
            .await;

        let report = match outcome {
            Ok(report) => report,
            Err(panic) => {
                let err = panic_error(Phase::After, panic);
                self.abort(Phase::After, &cycle_id, err)
            }
        };

        self.finish(OP_AFTER, &report, started);
        report
    }

    /// Diff every type in "before" against "after".
    ///
    /// Types with no after entry come out as `deleted`.
    pub fn calculate_diff(&self) -> EntityDiff {
        diff_slots(&self.before, &self.after)
    }

    async fn run_before(
        &mut self,
        request: &RequestDescriptor,
        selected: Option<Vec<String>>,
        cycle_id: &RequestId,
    ) -> Result<SnapshotReport, ExError> {
        let detected = detect_entity_ids(request)
            .map_err(|e| ExError::from(e).with_request_id(cycle_id.clone()))?;
        let targets = selected.unwrap_or_else(|| {
            self.entity_types
                .iter()
                .map(|t| t.id.clone())
                .collect()
        });

        self.before.clear();
        self.after.clear();
        self.cycle_id = Some(cycle_id.clone());

        let mut failures = Vec::new();
        for entity_type in targets {
            let entity_id = detected
                .get(&entity_type)
                .cloned()
                .unwrap_or_else(|| PLACEHOLDER_ENTITY_ID.to_string());

            match self.fetch_one(&entity_type, &entity_id).await {
                Ok(Some(state)) => {
                    self.before
                        .insert(entity_type, Snapshot::captured(entity_id, state));
                }
                Ok(None) => {
                    tracing::info!(
                        cycle_id = %cycle_id,
                        entity_type = %entity_type,
                        entity_id = %entity_id,
                        "entity not found, no before snapshot recorded"
                    );
                }
                Err(err) => {
                    failures.push(self.report_failure(
                        Phase::Before,
                        cycle_id,
                        entity_type,
                        entity_id,
                        err,
                    ));
                }
            }
        }

        self.publish_change(Phase::Before, cycle_id);
        Ok(SnapshotReport {
            phase: Phase::Before,
            cycle_id: cycle_id.clone(),
            snapshots: self.before.clone(),
            failures,
            aborted: None,
        })
    }

    async fn run_after(
        &mut self,
        selected: Option<Vec<String>>,
        cycle_id: &RequestId,
    ) -> SnapshotReport {
        self.after.clear();
        let targets = selected.unwrap_or_else(|| self.before.keys().cloned().collect());

        let mut failures = Vec::new();
        for entity_type in targets {
            let Some(entity_id) = self.before.get(&entity_type).map(|s| s.id.clone()) else {
                tracing::warn!(
                    cycle_id = %cycle_id,
                    entity_type = %entity_type,
                    "no before snapshot for entity type, skipping"
                );
                continue;
            };

            let snapshot = match self.fetch_one(&entity_type, &entity_id).await {
                Ok(Some(state)) => Snapshot::captured(entity_id, state),
                Ok(None) => Snapshot::missing(entity_id),
                Err(err) => {
                    failures.push(self.report_failure(
                        Phase::After,
                        cycle_id,
                        entity_type.clone(),
                        entity_id.clone(),
                        err,
                    ));
                    Snapshot::missing(entity_id)
                }
            };
            self.after.insert(entity_type, snapshot);
        }

        self.publish_change(Phase::After, cycle_id);
        SnapshotReport {
            phase: Phase::After,
            cycle_id: cycle_id.clone(),
            snapshots: self.after.clone(),
            failures,
            aborted: None,
        }
    }

    /// Fetch one entity; a JSON `null` payload counts as not found.
    async fn fetch_one(&self, entity_type: &str, entity_id: &str) -> Result<Option<Value>, ExError> {
        tracing::debug!(entity_type, entity_id, "fetching entity state");
        let state = self.fetcher.fetch(entity_type, entity_id).await?;
        Ok(state.filter(|v| !v.is_null()))
    }

    fn report_failure(
        &self,
        phase: Phase,
        cycle_id: &RequestId,
        entity_type: String,
        entity_id: String,
        cause: ExError,
    ) -> FetchFailure {
        let message = format!(
            "Failed to fetch {} state for {} {}: {}",
            phase, entity_type, entity_id, cause
        );
        let error = ExError::new(ExErrorKind::FetchFailed)
            .with_op(op_for(phase))
            .with_entity_type(entity_type.clone())
            .with_entity_id(entity_id.clone())
            .with_request_id(cycle_id.clone())
            .with_source(cause);

        tracing::warn!(
            cycle_id = %cycle_id,
            phase = phase.as_str(),
            entity_type = %entity_type,
            entity_id = %entity_id,
            err.code = error.code(),
            "entity fetch failed"
        );
        self.publisher.publish(DomainEvent::error(message, &error));

        FetchFailure {
            entity_type,
            entity_id,
            error,
        }
    }

    fn abort(&mut self, phase: Phase, cycle_id: &RequestId, err: ExError) -> SnapshotReport {
        let err = if err.kind() == ExErrorKind::SnapshotAborted {
            err.with_request_id(cycle_id.clone())
        } else {
            ExError::new(ExErrorKind::SnapshotAborted)
                .with_op(op_for(phase))
                .with_request_id(cycle_id.clone())
                .with_message(err.message().to_string())
                .with_source(err)
        };

        self.publisher.publish(DomainEvent::error(
            format!("Error taking {} snapshot: {}", phase, err),
            &err,
        ));

        let snapshots = match phase {
            Phase::Before => self.before.clone(),
            Phase::After => self.after.clone(),
        };
        SnapshotReport {
            phase,
            cycle_id: cycle_id.clone(),
            snapshots,
            failures: Vec::new(),
            aborted: Some(err),
        }
    }

    fn publish_change(&self, phase: Phase, cycle_id: &RequestId) {
        let snapshots = match phase {
            Phase::Before => self.before.clone(),
            Phase::After => self.after.clone(),
        };
        self.publisher.publish(DomainEvent::SnapshotChange {
            phase,
            snapshots,
            cycle_id: cycle_id.clone(),
            taken_at: Utc::now(),
        });
    }

    fn finish(&self, op: &str, report: &SnapshotReport, started: Instant) {
        let duration_ms = started.elapsed().as_millis() as u64;
        match &report.aborted {
            Some(err) => {
                log_op_error!(op, err.clone(), duration_ms = duration_ms, cycle_id = %report.cycle_id);
            }
            None => {
                log_op_end!(
                    op,
                    duration_ms = duration_ms,
                    cycle_id = %report.cycle_id,
                    captured_len = report.snapshots.len(),
                    failed_len = report.failures.len()
                );
            }
        }
    }
}

fn op_for(phase: Phase) -> &'static str {
    match phase {
        Phase::Before => OP_BEFORE,
        Phase::After => OP_AFTER,
    }
}

fn panic_error(phase: Phase, panic: Box<dyn Any + Send>) -> ExError {
    let reason = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    ApiTesterError::SnapshotPanicked {
        phase: phase.as_str().to_string(),
        reason,
    }
    .into()
}
