//! Sidecar metadata records.
//!
//! Every regular file in a share may own one sidecar stored beside it as
//! `<canonical file path>.md5`. The format is UTF-8 text:
//!
//! ```text
//! <lowercase hex digest>\n<comment, verbatim, may contain newlines>
//! ```
//!
//! Reads are deliberately forgiving: a missing, unreadable, or non-UTF-8
//! sidecar reads back as an empty record.

use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, instrument, trace};

/// Suffix appended to a file's canonical path to name its sidecar.
pub const SIDECAR_SUFFIX: &str = ".md5";

/// Checksum and comment stored for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarRecord {
    /// Lowercase hex digest, empty when no sidecar exists.
    pub checksum: String,
    /// Free-text comment, empty when unset.
    pub comment: String,
}

impl SidecarRecord {
    pub fn new(checksum: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            checksum: checksum.into(),
            comment: comment.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.checksum.is_empty() && self.comment.is_empty()
    }

    /// Parse sidecar content: everything before the first newline is the
    /// checksum, everything after it is the comment.
    pub fn parse(content: &str) -> Self {
        match content.split_once('\n') {
            Some((checksum, comment)) => Self::new(checksum, comment),
            None => Self::new(content, ""),
        }
    }

    /// Render sidecar content.
    pub fn render(&self) -> String {
        format!("{}\n{}", self.checksum, self.comment)
    }
}

/// Returns true if `name` looks like a sidecar (`<something>.md5`).
pub fn is_sidecar_name(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|n| n.len() > SIDECAR_SUFFIX.len() && n.ends_with(SIDECAR_SUFFIX))
}

/// Reads, writes, and deletes sidecar records.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarStore;

impl SidecarStore {
    pub fn new() -> Self {
        Self
    }

    /// Location of the sidecar for `file`.
    ///
    /// Uses the canonical form of `file` when it can be computed, so a file
    /// reached through a symlink shares its sidecar with the link target.
    pub fn sidecar_path_for(&self, file: &Path) -> PathBuf {
        let base = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        let mut raw = base.into_os_string();
        raw.push(SIDECAR_SUFFIX);
        PathBuf::from(raw)
    }

    /// Replace the sidecar for `file`.
    ///
    /// The record is written to a temporary file in the same directory and
    /// renamed into place, so readers never observe a partial sidecar.
    #[instrument(level = "debug", skip(self, comment), fields(file = %file.display(), checksum = %checksum))]
    pub fn write(&self, file: &Path, checksum: &str, comment: &str) -> io::Result<()> {
        let sidecar = self.sidecar_path_for(file);
        let dir = sidecar
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "sidecar has no parent directory"))?;

        let record = SidecarRecord::new(checksum, comment);
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(record.render().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&sidecar).map_err(|e| e.error)?;

        debug!(sidecar = %sidecar.display(), comment_len = comment.len(), "Sidecar written");
        Ok(())
    }

    /// Read the sidecar for `file`, or an empty record if there is none.
    #[instrument(level = "trace", skip(self), fields(file = %file.display()))]
    pub fn read(&self, file: &Path) -> SidecarRecord {
        let sidecar = self.sidecar_path_for(file);
        match fs::read(&sidecar) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => SidecarRecord::parse(&content),
                Err(_) => {
                    debug!(sidecar = %sidecar.display(), "Sidecar is not valid UTF-8, ignoring");
                    SidecarRecord::default()
                }
            },
            Err(e) => {
                trace!(sidecar = %sidecar.display(), error = %e, "No readable sidecar");
                SidecarRecord::default()
            }
        }
    }

    /// Remove the sidecar for `file` if one exists.
    #[instrument(level = "debug", skip(self), fields(file = %file.display()))]
    pub fn delete(&self, file: &Path) -> io::Result<()> {
        let sidecar = self.sidecar_path_for(file);
        match fs::remove_file(&sidecar) {
            Ok(()) => {
                debug!(sidecar = %sidecar.display(), "Sidecar removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
