//! Sandboxed resolution of caller-supplied paths.
//!
//! [`PathSandbox`] is the only way to obtain a [`ResolvedDir`] or a
//! [`ResolvedPath`]. Both types have private fields, so holding one is proof
//! that the location was validated against the share root.
//!
//! # Two-stage validation
//!
//! Resolution always happens in two steps:
//!
//! 1. [`PathSandbox::resolve_directory`] turns a relative directory string into
//!    an existing, accessible directory below the root.
//! 2. [`PathSandbox::resolve_file`] turns a bare leaf name into a location
//!    inside that directory.
//!
//! Each step re-verifies containment on the canonical (symlink-free) form of
//! the path using component-wise prefix comparison. Rejecting `..` segments
//! and separators up front is a fast path only; the canonical check is what
//! catches symlinks and platform path quirks.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument, trace};

use crate::error::{ShareError, ShareOpContext, ShareResult};
use crate::sidecar::is_sidecar_name;

/// Default limit for canonical absolute path length, in bytes.
#[cfg(windows)]
pub const DEFAULT_MAX_PATH_LENGTH: usize = 260;

/// Default limit for canonical absolute path length, in bytes.
#[cfg(not(windows))]
pub const DEFAULT_MAX_PATH_LENGTH: usize = 4096;

/// A directory proven to exist below the share root and to be readable and
/// writable at the time of resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDir {
    path: PathBuf,
    relative: String,
}

impl ResolvedDir {
    /// Canonical absolute location of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location relative to the share root, always ending in `/`.
    ///
    /// The root itself is `/`; a subdirectory is `docs/` or `docs/2024/`.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative == "/"
    }
}

/// A leaf location proven to be contained in its working directory.
///
/// Nothing is guaranteed about existence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    canonical: PathBuf,
    name: String,
}

impl ResolvedPath {
    /// Absolute location: the canonical working directory joined with the leaf name.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Canonical location; differs from [`path`](Self::path) only for symlinks.
    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if anything (file, directory, or symlink) exists here.
    pub fn exists(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok()
    }
}

/// Validates relative paths against a fixed share root.
#[derive(Debug, Clone)]
pub struct PathSandbox {
    root: PathBuf,
    max_path_length: usize,
}

impl PathSandbox {
    /// Create a sandbox rooted at `root`.
    ///
    /// The root is canonicalized once; it must exist and be a directory.
    #[instrument(level = "debug", fields(root = %root.as_ref().display()))]
    pub fn new(root: impl AsRef<Path>, max_path_length: usize) -> ShareResult<Self> {
        let root = root.as_ref();
        let ctx = || ShareOpContext::new().with_absolute_path(root);

        let canonical = fs::canonicalize(root).map_err(|e| ShareError::io(e, ctx()))?;
        if !canonical.is_dir() {
            return Err(ShareError::NotADirectory { context: ctx() });
        }

        debug!(canonical = %canonical.display(), "Share root canonicalized");
        Ok(Self {
            root: canonical,
            max_path_length,
        })
    }

    /// Canonical share root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }

    /// Resolve a caller-relative directory path.
    ///
    /// `None` and `""` denote the share root. A single leading separator is
    /// ignored, so `/docs` and `docs` are equivalent.
    #[instrument(level = "debug", skip(self), fields(relative = relative.unwrap_or("")))]
    pub fn resolve_directory(&self, relative: Option<&str>) -> ShareResult<ResolvedDir> {
        let raw = relative.unwrap_or("");
        let trimmed = raw
            .strip_prefix('/')
            .or_else(|| raw.strip_prefix('\\'))
            .unwrap_or(raw);
        let ctx = || ShareOpContext::new().with_relative_path(raw);

        if has_traversal_component(Path::new(trimmed)) {
            debug!("Rejected relative path with traversal component");
            return Err(ShareError::TraversalDenied { context: ctx() });
        }

        let candidate = self.root.join(trimmed);
        let metadata = fs::metadata(&candidate)
            .map_err(|e| ShareError::io(e, ctx().with_absolute_path(&candidate)))?;

        let canonical = fs::canonicalize(&candidate)
            .map_err(|e| ShareError::io(e, ctx().with_absolute_path(&candidate)))?;
        if !canonical.starts_with(&self.root) {
            debug!(canonical = %canonical.display(), "Directory resolves outside the share root");
            return Err(ShareError::TraversalDenied { context: ctx() });
        }

        self.check_length(&canonical, ctx)?;

        if !metadata.is_dir() {
            return Err(ShareError::NotADirectory {
                context: ctx().with_absolute_path(&canonical),
            });
        }
        if !is_readable(&canonical) {
            return Err(ShareError::AccessDenied {
                reason: "directory is not readable",
                context: ctx().with_absolute_path(&canonical),
            });
        }
        if !is_writable(&canonical) {
            return Err(ShareError::AccessDenied {
                reason: "directory is not writable",
                context: ctx().with_absolute_path(&canonical),
            });
        }

        let relative = self.relative_display(&canonical);
        trace!(canonical = %canonical.display(), relative = %relative, "Directory resolved");
        Ok(ResolvedDir {
            path: canonical,
            relative,
        })
    }

    /// Resolve a bare leaf name inside an already resolved directory.
    ///
    /// Names ending in the sidecar suffix are reserved and never resolve.
    #[instrument(level = "debug", skip(self, dir), fields(dir = %dir.relative(), name = %name))]
    pub fn resolve_file(&self, dir: &ResolvedDir, name: &str) -> ShareResult<ResolvedPath> {
        validate_name(name)?;
        if is_sidecar_name(OsStr::new(name)) {
            return Err(ShareError::IllegalName {
                name: name.to_string(),
                reason: "name is reserved for checksum sidecars",
            });
        }

        let ctx = || {
            ShareOpContext::new()
                .with_relative_path(dir.relative())
                .with_name(name)
        };
        let candidate = dir.path.join(name);

        let canonical = match fs::symlink_metadata(&candidate) {
            Ok(_) => match fs::canonicalize(&candidate) {
                Ok(canonical) => canonical,
                // Dangling symlink: its target cannot be proven contained.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Rejected dangling symlink");
                    return Err(ShareError::TraversalDenied {
                        context: ctx().with_absolute_path(&candidate),
                    });
                }
                Err(e) => return Err(ShareError::io(e, ctx().with_absolute_path(&candidate))),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => candidate.clone(),
            Err(e) => return Err(ShareError::io(e, ctx().with_absolute_path(&candidate))),
        };

        self.check_length(&canonical, ctx)?;

        if !canonical.starts_with(&dir.path) {
            debug!(canonical = %canonical.display(), "Leaf resolves outside its directory");
            return Err(ShareError::TraversalDenied { context: ctx() });
        }
        if canonical == self.root || canonical == dir.path {
            return Err(ShareError::ForbiddenTarget { context: ctx() });
        }

        Ok(ResolvedPath {
            path: candidate,
            canonical,
            name: name.to_string(),
        })
    }

    fn check_length(&self, path: &Path, ctx: impl FnOnce() -> ShareOpContext) -> ShareResult<()> {
        let len = path.as_os_str().len();
        if len > self.max_path_length {
            return Err(ShareError::PathTooLong {
                len,
                max: self.max_path_length,
                context: ctx(),
            });
        }
        Ok(())
    }

    fn relative_display(&self, canonical: &Path) -> String {
        let rest = canonical.strip_prefix(&self.root).unwrap_or(Path::new(""));
        let mut relative = rest
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        relative.push('/');
        relative
    }
}

/// Reject empty names and anything that is not a single path segment.
pub fn validate_name(name: &str) -> ShareResult<()> {
    let illegal = |reason| {
        Err(ShareError::IllegalName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return illegal("name must not be empty");
    }
    if name.contains(['/', '\\']) {
        return illegal("name contains a path separator");
    }
    if name.contains('\0') {
        return illegal("name contains a NUL byte");
    }
    Ok(())
}

fn has_traversal_component(path: &Path) -> bool {
    path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Returns true if the current process may read `path`.
#[cfg(unix)]
pub(crate) fn is_readable(path: &Path) -> bool {
    use nix::unistd::{AccessFlags, access};
    access(path, AccessFlags::R_OK).is_ok()
}

/// Returns true if the current process may write `path`.
#[cfg(unix)]
pub(crate) fn is_writable(path: &Path) -> bool {
    use nix::unistd::{AccessFlags, access};
    access(path, AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
pub(crate) fn is_readable(path: &Path) -> bool {
    if path.is_dir() {
        fs::read_dir(path).is_ok()
    } else {
        fs::File::open(path).is_ok()
    }
}

#[cfg(not(unix))]
pub(crate) fn is_writable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| !m.permissions().readonly())
}
