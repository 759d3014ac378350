//! Line-oriented rendering of workspace changes for the terminal.

use livedoc_client::{ConnectionStatus, RenderUpdate, WorkspaceSnapshot};
use livedoc_types::StreamEvent;
use serde_json::Value;

pub fn status_line(status: &ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Connected => "[stream] connected".to_string(),
        ConnectionStatus::Disconnected => "[stream] disconnected".to_string(),
        ConnectionStatus::Reconnecting { attempt } => {
            format!("[stream] reconnecting (attempt {attempt})")
        }
        ConnectionStatus::Error(e) => format!("[stream] error: {e}"),
    }
}

pub fn update_line(update: &RenderUpdate) -> String {
    let (inserted, deleted) = update.script.change_counts();
    format!(
        "[document] +{inserted} -{deleted} tokens ({} chars)",
        update.text.chars().count()
    )
}

pub fn log_line(entry: &StreamEvent) -> String {
    let payload = match &entry.payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if entry.timestamp.is_empty() {
        format!("[log] {payload}")
    } else {
        format!("[log] {} {payload}", entry.timestamp)
    }
}

/// Lines describing what changed between two snapshots, excluding the
/// document (reported through the view).
pub fn snapshot_lines(prev: &WorkspaceSnapshot, next: &WorkspaceSnapshot) -> Vec<String> {
    let mut lines = Vec::new();

    // A shorter log means the snapshot was reset; report it from the start.
    let seen = if next.log_entries().len() >= prev.log_entries().len() {
        prev.log_entries().len()
    } else {
        0
    };
    lines.extend(next.log_entries()[seen..].iter().map(log_line));

    if prev.sources() != next.sources() {
        lines.push(format!("[sources] {} entries", next.sources().len()));
        for source in next.sources() {
            match source {
                Value::String(s) => lines.push(format!("  - {s}")),
                other => lines.push(format!("  - {other}")),
            }
        }
    }

    if prev.export_status() != next.export_status() {
        lines.push(format!("[export] {}", next.export_status()));
    }
    lines
}
