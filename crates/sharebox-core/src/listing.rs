//! Directory listings.
//!
//! Rendering is pluggable through [`ListingRenderer`]; the default
//! [`EntryListing`] produces a structured [`DirectoryListing`] with each
//! file's stored checksum and comment. Sidecar files are never listed.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{ShareError, ShareOpContext, ShareResult};
use crate::sidecar::{SidecarStore, is_sidecar_name};

/// What a renderer is asked to list.
#[derive(Debug, Clone, Copy)]
pub struct ListingRequest<'a> {
    /// Canonical absolute directory.
    pub dir: &'a Path,
    /// Relative location, `/` for the root and `docs/` for a subdirectory.
    pub relative: &'a str,
}

/// Turns a directory into some output representation.
pub trait ListingRenderer {
    type Output;

    fn render(&self, request: &ListingRequest<'_>) -> ShareResult<Self::Output>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes; zero for directories.
    pub size: u64,
    pub modified: Option<SystemTime>,
    /// Stored checksum, empty if the file has no sidecar.
    pub checksum: String,
    /// Stored comment, empty if unset.
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub relative: String,
    pub entries: Vec<ListingEntry>,
}

impl DirectoryListing {
    pub fn files(&self) -> impl Iterator<Item = &ListingEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::File)
    }

    pub fn directories(&self) -> impl Iterator<Item = &ListingEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Directory)
    }

    pub fn get(&self, name: &str) -> Option<&ListingEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Default renderer producing a [`DirectoryListing`] sorted by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryListing {
    sidecars: SidecarStore,
}

impl EntryListing {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ListingRenderer for EntryListing {
    type Output = DirectoryListing;

    fn render(&self, request: &ListingRequest<'_>) -> ShareResult<DirectoryListing> {
        let ctx = || {
            ShareOpContext::new()
                .with_relative_path(request.relative)
                .with_absolute_path(request.dir)
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(request.dir).map_err(|e| ShareError::io(e, ctx()))? {
            let entry = entry.map_err(|e| ShareError::io(e, ctx()))?;
            let file_name = entry.file_name();
            if is_sidecar_name(&file_name) {
                continue;
            }

            let name = file_name.to_string_lossy().into_owned();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    // Raced with a concurrent delete.
                    debug!(name = %name, error = %e, "Skipping entry without metadata");
                    continue;
                }
            };

            let file_type = metadata.file_type();
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            let record = if kind == EntryKind::File {
                self.sidecars.read(&entry.path())
            } else {
                Default::default()
            };

            entries.push(ListingEntry {
                name,
                kind,
                size: if kind == EntryKind::File { metadata.len() } else { 0 },
                modified: metadata.modified().ok(),
                checksum: record.checksum,
                comment: record.comment,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        trace!(relative = %request.relative, count = entries.len(), "Directory listed");

        Ok(DirectoryListing {
            relative: request.relative.to_string(),
            entries,
        })
    }
}
