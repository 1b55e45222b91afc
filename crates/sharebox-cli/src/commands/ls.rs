//! List the contents of a share directory.
//!
//! Checksum sidecars never appear in the output.
//!
//! # Examples
//!
//! ```bash
//! # Table with size, modification time, checksum and comment
//! sharebox ls
//! sharebox ls photos/2024
//!
//! # One name per line
//! sharebox ls -1 photos
//!
//! # Machine-readable
//! sharebox ls --json | jq '.entries[].name'
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use comfy_table::{Cell, Color};
use serde::Serialize;
use sharebox_core::{DirectoryListing, EntryKind, ListingEntry};
use tracing::instrument;

use super::{Session, dir_arg};
use crate::output::{
    comment_preview, create_table, format_entry_type, format_size, format_time,
    format_time_rfc3339,
};

#[derive(ClapArgs)]
pub struct Args {
    /// Directory within the share (defaults to the root)
    pub dir: Option<String>,

    /// Print one name per line
    #[arg(short = '1', conflicts_with = "json")]
    pub one_per_line: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output structure for ls command
#[derive(Serialize)]
struct LsOutput {
    dir: String,
    entries: Vec<EntryInfo>,
}

#[derive(Serialize)]
struct EntryInfo {
    name: String,
    kind: EntryKind,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    checksum: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    comment: String,
}

impl From<&ListingEntry> for EntryInfo {
    fn from(entry: &ListingEntry) -> Self {
        Self {
            name: entry.name.clone(),
            kind: entry.kind,
            size: entry.size,
            modified: format_time_rfc3339(entry.modified),
            checksum: entry.checksum.clone(),
            comment: entry.comment.clone(),
        }
    }
}

#[instrument(level = "info", name = "cmd::ls", skip_all, fields(dir = ?args.dir))]
pub fn execute(session: &Session, args: &Args) -> Result<()> {
    let listing = session.ops.list(dir_arg(args.dir.as_deref()))?;
    tracing::debug!(entries = listing.entries.len(), "Listed directory");

    if args.json {
        print_json(&listing)
    } else if args.one_per_line {
        for entry in &listing.entries {
            println!("{}", display_name(entry));
        }
        Ok(())
    } else {
        print_table(&listing);
        Ok(())
    }
}

fn print_json(listing: &DirectoryListing) -> Result<()> {
    let output = LsOutput {
        dir: listing.relative.clone(),
        entries: listing.entries.iter().map(EntryInfo::from).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_table(listing: &DirectoryListing) {
    if listing.entries.is_empty() {
        println!("{} is empty", listing.relative);
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["", "Name", "Size", "Modified", "MD5", "Comment"]);

    for entry in &listing.entries {
        let name = match entry.kind {
            EntryKind::Directory => Cell::new(display_name(entry)).fg(Color::Blue),
            EntryKind::Symlink => Cell::new(display_name(entry)).fg(Color::Cyan),
            _ => Cell::new(display_name(entry)),
        };
        let size = if entry.kind == EntryKind::File {
            format_size(entry.size)
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(format_entry_type(entry.kind)),
            name,
            Cell::new(size),
            Cell::new(format_time(entry.modified)),
            Cell::new(&entry.checksum),
            Cell::new(comment_preview(&entry.comment, 40)),
        ]);
    }

    println!("{table}");

    let files = listing.files().count();
    let dirs = listing.directories().count();
    println!("{files} files, {dirs} directories");
}

fn display_name(entry: &ListingEntry) -> String {
    if entry.kind == EntryKind::Directory {
        format!("{}/", entry.name)
    } else {
        entry.name.clone()
    }
}
