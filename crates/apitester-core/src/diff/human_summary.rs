//! Human-readable summary renderer for entity diffs.

use crate::diff::model::{Change, DiffNode, EntityDiff};
use serde_json::Value;

/// Render one line per leaf change, grouped by entity type.
///
/// ```text
/// ## user (1 change)
/// - name: changed "Al" -> "Alice"
/// ```
///
/// Entity types without changes are listed as `unchanged`. Informational
/// only; the structured diff stays the source of truth.
pub fn render_human_summary(diff: &EntityDiff) -> String {
    let mut out = String::new();

    if diff.is_empty() {
        out.push_str("_No entity snapshots to compare._\n");
        return out;
    }

    for (entity_type, node) in diff {
        let count = node.change_count();
        if count == 0 {
            out.push_str(&format!("## {entity_type} (unchanged)\n\n"));
            continue;
        }

        let noun = if count == 1 { "change" } else { "changes" };
        out.push_str(&format!("## {entity_type} ({count} {noun})\n"));
        for (path, change) in node.leaves() {
            out.push_str(&format!("- {}\n", describe(&path, change)));
        }
        out.push('\n');
    }

    out
}

fn describe(path: &[&str], change: &Change) -> String {
    // Top-level leaves describe the entity itself.
    let label = if path.is_empty() {
        "(entity)".to_string()
    } else {
        path.join(".")
    };

    match change {
        Change::Created { value } => format!("{label}: created {}", compact(value)),
        Change::Deleted { value } => format!("{label}: deleted (was {})", compact(value)),
        Change::Added { value } => format!("{label}: added {}", compact(value)),
        Change::Removed { value } => format!("{label}: removed (was {})", compact(value)),
        Change::ChangedValue { before, after } => {
            format!("{label}: changed {} -> {}", compact(before), compact(after))
        }
        Change::ChangedType { before, after } => format!(
            "{label}: type {} -> {} ({} -> {})",
            before.json_type.as_str(),
            after.json_type.as_str(),
            compact(&before.value),
            compact(&after.value)
        ),
    }
}

fn compact(value: &Value) -> String {
    const MAX: usize = 60;
    let text = value.to_string();
    if text.chars().count() <= MAX {
        return text;
    }
    let cut: String = text.chars().take(MAX).collect();
    format!("{cut}…")
}
