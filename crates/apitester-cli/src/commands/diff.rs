//! Diff command
//!
//! Usage: apitester diff <BEFORE> <AFTER> [--entity <TYPE>] [--summary]
//!
//! Either file may contain `null` (or be empty) to stand for a missing entity.

use anyhow::Context;
use apitester_core::{compute_diff, render_human_summary, EntityDiff};
use clap::Args;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// JSON file holding the earlier state
    pub before: PathBuf,

    /// JSON file holding the later state
    pub after: PathBuf,

    /// Label used for the summary heading
    #[arg(long, default_value = "entity")]
    pub entity: String,

    /// Print a readable summary instead of the diff tree
    #[arg(long)]
    pub summary: bool,
}

pub fn execute(args: DiffArgs) -> anyhow::Result<()> {
    let before = read_json(&args.before)?;
    let after = read_json(&args.after)?;
    let node = compute_diff(before.as_ref(), after.as_ref());
    tracing::debug!(changes = node.change_count(), "diff computed");

    if args.summary {
        let mut diff = EntityDiff::new();
        diff.insert(args.entity, node);
        print!("{}", render_human_summary(&diff));
    } else {
        println!("{}", serde_json::to_string_pretty(&node)?);
    }
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Option<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(Some(value))
}
