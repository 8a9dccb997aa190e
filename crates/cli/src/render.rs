//! Terminal and JSON rendering of listings and outcomes.

use chrono::DateTime;
use fm_client::{ManagerState, Outcome, ViewMode};
use fm_protocol::{EntryKind, FileEntry};
use serde_json::{json, Value};

/// Maximum width of the name column in list view.
const NAME_WIDTH_MAX: usize = 48;

/// Terminal width assumed for grid view.
pub const GRID_WIDTH: usize = 80;

/// Render the current listing in the given layout.
pub fn listing(state: &ManagerState, mode: ViewMode) -> String {
    let mut out = format!("Directory: {}\n", state.working_dir());
    if state.entries().is_empty() {
        out.push_str("(empty)\n");
        return out;
    }
    match mode {
        ViewMode::List => out.push_str(&list(state.entries())),
        ViewMode::Grid => out.push_str(&grid(state.entries(), GRID_WIDTH)),
    }
    out.push_str(&format!("\nTotal: {} item(s)\n", state.entries().len()));
    out
}

/// One row per entry: type, name, size and modification time.
pub fn list(entries: &[FileEntry]) -> String {
    let name_width = entries
        .iter()
        .map(|e| display_name(e).chars().count())
        .max()
        .unwrap_or(4)
        .clamp(4, NAME_WIDTH_MAX);

    let mut out = format!(
        "{:<6}  {:<name_width$}  {:>10}  {:<16}\n",
        "TYPE",
        "NAME",
        "SIZE",
        "MODIFIED",
        name_width = name_width
    );
    out.push_str(&"-".repeat(6 + name_width + 10 + 16 + 6));
    out.push('\n');

    for entry in entries {
        let size = entry.display_size().unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<6}  {:<name_width$}  {:>10}  {:<16}\n",
            kind_label(entry.kind()),
            truncate_str(&display_name(entry), name_width),
            size,
            format_time(entry.time),
            name_width = name_width
        ));
    }
    out
}

/// Names laid out in columns, folders marked with a trailing `/`.
pub fn grid(entries: &[FileEntry], width: usize) -> String {
    let names: Vec<String> = entries.iter().map(display_name).collect();
    let cell = names
        .iter()
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(0)
        .min(NAME_WIDTH_MAX)
        + 2;
    let columns = (width / cell.max(1)).max(1);

    let mut out = String::new();
    for row in names.chunks(columns) {
        let line: Vec<String> = row
            .iter()
            .map(|name| format!("{:<cell$}", truncate_str(name, cell - 2), cell = cell))
            .collect();
        out.push_str(line.concat().trim_end());
        out.push('\n');
    }
    out
}

/// Machine-readable result of a command.
pub fn outcome_json(outcome: &Outcome, state: &ManagerState) -> Value {
    let (kind, detail) = match outcome {
        Outcome::Refreshed => ("refreshed", Value::Null),
        Outcome::Stale => ("stale", Value::Null),
        Outcome::Failed { message } => ("failed", json!(message)),
        Outcome::Notified(notification) => ("notified", json!(notification)),
        Outcome::Downloaded(path) => ("downloaded", json!(path.display().to_string())),
        Outcome::Dismissed => ("dismissed", Value::Null),
    };
    json!({
        "ok": outcome.is_success(),
        "outcome": kind,
        "detail": detail,
        "phase": state.phase(),
        "state": state,
    })
}

fn display_name(entry: &FileEntry) -> String {
    if entry.is_folder() {
        format!("{}/", entry.name)
    } else {
        entry.name.clone()
    }
}

fn kind_label(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Folder => "dir",
        EntryKind::Image => "image",
        EntryKind::File => "file",
    }
}

/// Format a Unix timestamp as `YYYY-MM-DD HH:MM` (UTC).
pub fn format_time(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "-".to_string();
    }
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
