//! Probe command
//!
//! Usage: apitester probe --path <PATH> [--method <M>] [--body <JSON>]
//!        [--types a,b] [--summary]
//!
//! Takes a before snapshot, sends the request, takes an after snapshot and
//! prints the per-entity diff. Fetch failures are printed to stderr as
//! warnings; the command still completes.

use anyhow::{bail, Context};
use apitester_core::{
    default_entity_types, render_human_summary, BroadcastEventPublisher, DomainEvent,
    DomainStateManager, EntityDiff, RequestDescriptor, SnapshotSlot,
};
use apitester_http::{
    parse_body_arg, ExecutedResponse, HttpConfig, HttpEntityStateFetcher, RequestExecutor,
};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Request path, relative to the API base path
    #[arg(long)]
    pub path: String,

    /// HTTP method (default: GET)
    #[arg(long)]
    pub method: Option<String>,

    /// JSON request body
    #[arg(long)]
    pub body: Option<String>,

    /// Entity types to snapshot (default: all)
    #[arg(long, value_delimiter = ',')]
    pub types: Option<Vec<String>>,

    /// Print a readable summary instead of the JSON report
    #[arg(long)]
    pub summary: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProbeReport {
    cycle_id: String,
    request: RequestDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<ExecutedResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    execute_error: Option<String>,
    before: SnapshotSlot,
    after: SnapshotSlot,
    diff: EntityDiff,
}

pub async fn execute(args: ProbeArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(selected) = &args.types {
        validate_types(selected)?;
    }

    let body = args
        .body
        .as_deref()
        .map(parse_body_arg)
        .transpose()
        .context("invalid --body")?;
    let mut request = RequestDescriptor::new(args.path);
    request.method = args.method;
    request.body = body;

    let config = HttpConfig::load(config_path).context("cannot load backend configuration")?;
    let fetcher = Arc::new(HttpEntityStateFetcher::new(config.clone())?);
    let executor = RequestExecutor::new(config)?;
    let publisher = Arc::new(BroadcastEventPublisher::default());
    let mut events = publisher.subscribe();
    let mut manager = DomainStateManager::new(fetcher, publisher);

    let before = manager.take_before_snapshot(&request, args.types).await;
    drain_errors(&mut events);
    if let Some(err) = before.aborted {
        bail!("before snapshot aborted: {}", err);
    }

    let (response, execute_error) = match executor.execute(&request).await {
        Ok(response) => (Some(response), None),
        Err(err) => {
            eprintln!("warning: request failed: {}", err);
            (None, Some(err.to_string()))
        }
    };

    let after = manager.take_after_snapshot(None).await;
    drain_errors(&mut events);
    if let Some(err) = after.aborted {
        bail!("after snapshot aborted: {}", err);
    }

    let diff = manager.calculate_diff();
    if args.summary {
        print!("{}", render_human_summary(&diff));
    } else {
        let report = ProbeReport {
            cycle_id: before.cycle_id.to_string(),
            request,
            response,
            execute_error,
            before: manager.before().clone(),
            after: manager.after().clone(),
            diff,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn validate_types(selected: &[String]) -> anyhow::Result<()> {
    let known = default_entity_types();
    for entity_type in selected {
        if !known.iter().any(|t| &t.id == entity_type) {
            let ids: Vec<&str> = known.iter().map(|t| t.id.as_str()).collect();
            bail!(
                "unknown entity type `{}` (known: {})",
                entity_type,
                ids.join(", ")
            );
        }
    }
    Ok(())
}

fn drain_errors(events: &mut broadcast::Receiver<DomainEvent>) {
    for warning in pending_warnings(events) {
        eprintln!("warning: {}", warning);
    }
}

/// Error messages queued on the receiver, plus a note for each lag gap
fn pending_warnings(events: &mut broadcast::Receiver<DomainEvent>) -> Vec<String> {
    let mut warnings = Vec::new();
    loop {
        match events.try_recv() {
            Ok(DomainEvent::Error { message, .. }) => warnings.push(message),
            Ok(_) => {}
            Err(TryRecvError::Lagged(skipped)) => {
                warnings.push(format!("{} events were dropped before they could be reported", skipped))
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use apitester_core::core_types::RequestId;
    use apitester_core::Phase;
    use chrono::Utc;

    fn error_event(message: &str) -> DomainEvent {
        DomainEvent::Error {
            message: message.to_string(),
            code: "ERR_FETCH_FAILED".to_string(),
            error: None,
        }
    }

    #[test]
    fn test_pending_warnings_keeps_draining_after_lag() {
        let (sender, mut receiver) = broadcast::channel(2);
        for n in 1..=5 {
            sender.send(error_event(&format!("failure {}", n))).unwrap();
        }

        let warnings = pending_warnings(&mut receiver);
        assert_eq!(
            warnings,
            vec![
                "3 events were dropped before they could be reported".to_string(),
                "failure 4".to_string(),
                "failure 5".to_string(),
            ]
        );
    }

    #[test]
    fn test_pending_warnings_skips_snapshot_changes() {
        let (sender, mut receiver) = broadcast::channel(8);
        sender
            .send(DomainEvent::SnapshotChange {
                phase: Phase::Before,
                snapshots: SnapshotSlot::new(),
                cycle_id: RequestId::new(),
                taken_at: Utc::now(),
            })
            .unwrap();
        sender.send(error_event("failure")).unwrap();
        drop(sender);

        assert_eq!(pending_warnings(&mut receiver), vec!["failure".to_string()]);
    }
}
