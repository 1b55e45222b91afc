use std::time::SystemTime;

use chrono::{DateTime, Local};
use comfy_table::Table;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use sharebox_core::EntryKind;

/// Create a styled table for output
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

/// Format a byte size into a human-readable string
#[allow(clippy::cast_precision_loss)] // Display only
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.1}G", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1}M", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1}K", b as f64 / KB as f64),
        b => format!("{b}B"),
    }
}

/// Format an entry type indicator
pub fn format_entry_type(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Directory => "d",
        EntryKind::Symlink => "l",
        EntryKind::File => "-",
        EntryKind::Other => "?",
    }
}

/// Local timestamp for table output.
pub fn format_time(time: Option<SystemTime>) -> String {
    time.map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// RFC 3339 timestamp for JSON output.
pub fn format_time_rfc3339(time: Option<SystemTime>) -> Option<String> {
    time.map(|t| DateTime::<Local>::from(t).to_rfc3339())
}

/// First line of a comment, shortened to `max` characters.
pub fn comment_preview(comment: &str, max: usize) -> String {
    let first = comment.lines().next().unwrap_or("");
    let multiline = comment.contains('\n');
    if first.chars().count() > max {
        let cut: String = first.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    } else if multiline {
        format!("{first} …")
    } else {
        first.to_string()
    }
}
