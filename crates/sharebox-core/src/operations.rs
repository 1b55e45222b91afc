//! The public operation set of a share.
//!
//! [`ShareOperations`] composes the sandbox, checksum engine, sidecar store,
//! and index bridge into one call per operation. Every call is stateless apart
//! from the per-path locks it holds while running.
//!
//! # Metadata ordering
//!
//! For anything that changes a file's identity or content:
//!
//! 1. The old identity is unindexed and its sidecar removed.
//! 2. The filesystem change happens.
//! 3. The checksum is recomputed from disk, the sidecar rewritten, and the new
//!    identity indexed if requested.
//!
//! Nothing is rolled back if a later step fails.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::checksum::{ContentDigest, digest_file};
use crate::config::ShareConfig;
use crate::error::{ShareError, ShareOpContext, ShareResult};
use crate::index::{
    IndexBridge, IndexError, IndexFailurePolicy, NoopIndex, ShareUrlTokenizer, UrlTokenizer, phrase_for,
};
use crate::listing::{DirectoryListing, EntryListing, ListingRenderer, ListingRequest};
use crate::locks::PathLockManager;
use crate::sandbox::{PathSandbox, ResolvedDir, ResolvedPath, is_readable, is_writable};
use crate::sidecar::{SidecarRecord, SidecarStore, is_sidecar_name};

/// File name used by [`ShareOperations::upload`] when the caller supplies none.
pub const DEFAULT_UPLOAD_NAME: &str = "newFile";

/// Statistics returned from delete operations
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeleteStats {
    /// Number of files deleted
    pub files_deleted: usize,
    /// Number of directories deleted
    pub directories_deleted: usize,
}

/// An open shared file, ready to stream to the caller.
#[derive(Debug)]
pub struct Download {
    file: File,
    name: String,
    checksum: String,
    len: u64,
}

impl Download {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored checksum at the time the file was opened; empty if none.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

impl Read for Download {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Sandboxed file operations over one share root.
pub struct ShareOperations {
    sandbox: PathSandbox,
    sidecars: SidecarStore,
    index: Arc<dyn IndexBridge>,
    tokenizer: Arc<dyn UrlTokenizer>,
    seed: String,
    index_failures: IndexFailurePolicy,
    locks: PathLockManager,
}

impl fmt::Debug for ShareOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareOperations")
            .field("root", &self.sandbox.root())
            .field("seed", &self.seed)
            .field("index_failures", &self.index_failures)
            .field("cached_locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl ShareOperations {
    /// Build operations for `config` with a no-op index bridge.
    #[instrument(level = "info", skip(config), fields(root = %config.root.display()))]
    pub fn new(config: &ShareConfig) -> ShareResult<Self> {
        let sandbox = PathSandbox::new(&config.root, config.max_path_length)?;
        info!(
            root = %sandbox.root().display(),
            seed = %config.seed,
            index_failures = ?config.index_failures,
            "Share opened"
        );
        Ok(Self {
            sandbox,
            sidecars: SidecarStore::new(),
            index: Arc::new(NoopIndex),
            tokenizer: Arc::new(ShareUrlTokenizer),
            seed: config.seed.clone(),
            index_failures: config.index_failures,
            locks: PathLockManager::new(),
        })
    }

    #[must_use]
    pub fn with_index(mut self, index: Arc<dyn IndexBridge>) -> Self {
        self.index = index;
        self
    }

    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn UrlTokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Canonical share root.
    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }

    pub fn sandbox(&self) -> &PathSandbox {
        &self.sandbox
    }

    /// Number of per-path locks currently cached.
    pub fn cached_lock_count(&self) -> usize {
        self.locks.len()
    }

    // ==================== Listing ====================

    /// List a directory with the default structured renderer.
    pub fn list(&self, dir: Option<&str>) -> ShareResult<DirectoryListing> {
        self.list_with(dir, &EntryListing::new())
    }

    /// List a directory with a custom renderer.
    #[instrument(level = "debug", skip(self, renderer))]
    pub fn list_with<R: ListingRenderer>(&self, dir: Option<&str>, renderer: &R) -> ShareResult<R::Output> {
        let dir = self.sandbox.resolve_directory(dir)?;
        renderer.render(&ListingRequest {
            dir: dir.path(),
            relative: dir.relative(),
        })
    }

    // ==================== Creation ====================

    /// Store `reader`'s content as a new file in `dir`.
    ///
    /// The target must not exist. The checksum is computed from the written
    /// file, stored with `comment`, and returned.
    #[instrument(level = "info", skip(self, reader, comment))]
    pub fn upload<R: Read>(
        &self,
        dir: Option<&str>,
        name: Option<&str>,
        mut reader: R,
        index: bool,
        comment: Option<&str>,
    ) -> ShareResult<ContentDigest> {
        let name = name.unwrap_or(DEFAULT_UPLOAD_NAME);
        let dir = self.sandbox.resolve_directory(dir)?;
        let leaf = self.sandbox.resolve_file(&dir, name)?;
        let ctx = || file_context(&dir, &leaf);
        let comment = comment.unwrap_or("");

        self.with_locks(&[leaf.canonical()], || {
            if leaf.exists() {
                return Err(ShareError::AlreadyExists { context: ctx() });
            }

            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(leaf.path())
                .map_err(|e| ShareError::io(e, ctx()))?;

            let written = io::copy(&mut reader, &mut file).and_then(|n| file.sync_all().map(|()| n));
            let written = match written {
                Ok(n) => n,
                Err(e) => {
                    drop(file);
                    if let Err(cleanup) = fs::remove_file(leaf.path()) {
                        warn!(error = %cleanup, "Failed to remove partial upload");
                    }
                    return Err(ShareError::io(e, ctx()));
                }
            };
            drop(file);

            let digest = digest_file(leaf.path()).map_err(|e| ShareError::io(e, ctx()))?;
            self.sidecars
                .write(leaf.path(), &digest.to_hex(), comment)
                .map_err(|e| ShareError::io(e, ctx()))?;
            if index {
                self.index_file(leaf.name(), comment, &digest, ctx)?;
            }

            info!(bytes = written, checksum = %digest, "File uploaded");
            Ok(digest)
        })
    }

    /// Create a new directory named `name` inside `dir`.
    #[instrument(level = "info", skip(self))]
    pub fn create_directory(&self, dir: Option<&str>, name: &str) -> ShareResult<()> {
        let dir = self.sandbox.resolve_directory(dir)?;
        let leaf = self.sandbox.resolve_file(&dir, name)?;
        let ctx = || file_context(&dir, &leaf);

        self.with_locks(&[leaf.canonical()], || {
            if leaf.exists() {
                return Err(ShareError::AlreadyExists { context: ctx() });
            }
            fs::create_dir(leaf.path()).map_err(|e| ShareError::io(e, ctx()))?;
            info!("Directory created");
            Ok(())
        })
    }

    // ==================== Deletion ====================

    /// Delete a file, or a directory and everything below it.
    ///
    /// Deleting a name that does not exist succeeds and deletes nothing.
    /// Directory contents are removed depth-first; each file is unindexed and
    /// loses its sidecar before it is removed. The first failure stops the
    /// walk and nothing already removed is restored.
    #[instrument(level = "info", skip(self))]
    pub fn delete(&self, dir: Option<&str>, name: &str) -> ShareResult<DeleteStats> {
        let dir = self.sandbox.resolve_directory(dir)?;
        let leaf = self.sandbox.resolve_file(&dir, name)?;
        let ctx = || file_context(&dir, &leaf);

        self.with_locks(&[leaf.canonical()], || {
            let metadata = match fs::symlink_metadata(leaf.path()) {
                Ok(m) => m,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Nothing to delete");
                    return Ok(DeleteStats::default());
                }
                Err(e) => return Err(ShareError::io(e, ctx())),
            };
            if !is_writable(leaf.path()) {
                return Err(ShareError::AccessDenied {
                    reason: "target is not writable",
                    context: ctx(),
                });
            }

            let stats = if metadata.is_dir() {
                self.delete_tree(leaf.path(), &dir)?
            } else {
                let mut stats = DeleteStats::default();
                self.delete_single(leaf.path(), leaf.name(), metadata.is_file(), ctx)?;
                stats.files_deleted += 1;
                stats
            };

            info!(
                files_deleted = stats.files_deleted,
                directories_deleted = stats.directories_deleted,
                "Delete complete"
            );
            Ok(stats)
        })
    }

    fn delete_tree(&self, target: &Path, dir: &ResolvedDir) -> ShareResult<DeleteStats> {
        let mut stats = DeleteStats::default();
        // Sorting puts `a.txt` before `a.txt.md5`, so owners are handled
        // before their sidecars are seen.
        let walker = WalkDir::new(target)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name();

        for entry in walker {
            if let Err(e) = self.delete_tree_entry(entry, target, dir, &mut stats) {
                warn!(
                    error = %e,
                    files_deleted = stats.files_deleted,
                    directories_deleted = stats.directories_deleted,
                    "Recursive delete stopped partway"
                );
                return Err(e);
            }
        }

        Ok(stats)
    }

    fn delete_tree_entry(
        &self,
        entry: walkdir::Result<walkdir::DirEntry>,
        target: &Path,
        dir: &ResolvedDir,
        stats: &mut DeleteStats,
    ) -> ShareResult<()> {
        let entry = entry.map_err(|e| {
            let context = ShareOpContext::new()
                .with_relative_path(dir.relative())
                .with_absolute_path(e.path().unwrap_or(target));
            match e.into_io_error() {
                Some(io) => ShareError::io(io, context),
                None => ShareError::Io {
                    source: io::Error::other("filesystem loop detected"),
                    context,
                },
            }
        })?;

        let path = entry.path();
        let ctx = || {
            ShareOpContext::new()
                .with_relative_path(dir.relative())
                .with_absolute_path(path)
        };
        let file_type = entry.file_type();

        let denied = || ShareError::AccessDenied {
            reason: "entry is not writable",
            context: ctx(),
        };

        if file_type.is_dir() {
            if !is_writable(path) {
                return Err(denied());
            }
            fs::remove_dir(path).map_err(|e| ShareError::io(e, ctx()))?;
            stats.directories_deleted += 1;
            debug!(path = %path.display(), "Directory removed");
            return Ok(());
        }

        if is_sidecar_name(entry.file_name()) {
            // Usually already removed together with its owner; orphans go too.
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Orphaned sidecar removed"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(ShareError::io(e, ctx())),
            }
            return Ok(());
        }

        // Symlinks are unlinked without following them.
        if file_type.is_file() && !is_writable(path) {
            return Err(denied());
        }

        let name = entry.file_name().to_string_lossy();
        let _guard = self.locks.lock(path);
        self.delete_single(path, &name, file_type.is_file(), ctx)?;
        stats.files_deleted += 1;
        Ok(())
    }

    /// Remove one non-directory entry. Regular files are unindexed and lose
    /// their sidecar first; symlinks and special files are just unlinked.
    fn delete_single(
        &self,
        path: &Path,
        name: &str,
        regular: bool,
        ctx: impl Fn() -> ShareOpContext,
    ) -> ShareResult<()> {
        if regular {
            self.unindex_file(path, name, &ctx)?;
            self.sidecars.delete(path).map_err(|e| ShareError::io(e, ctx()))?;
        }
        fs::remove_file(path).map_err(|e| ShareError::io(e, ctx()))?;
        debug!(path = %path.display(), "File removed");
        Ok(())
    }

    // ==================== Metadata reads ====================

    /// Stored comment for a file; empty if none.
    #[instrument(level = "debug", skip(self))]
    pub fn get_comment(&self, dir: Option<&str>, name: &str) -> ShareResult<String> {
        Ok(self.read_record(dir, name)?.comment)
    }

    /// Stored checksum for a file; empty if none. Not re-validated.
    #[instrument(level = "debug", skip(self))]
    pub fn get_checksum(&self, dir: Option<&str>, name: &str) -> ShareResult<String> {
        Ok(self.read_record(dir, name)?.checksum)
    }

    fn read_record(&self, dir: Option<&str>, name: &str) -> ShareResult<SidecarRecord> {
        let dir = self.sandbox.resolve_directory(dir)?;
        let leaf = self.sandbox.resolve_file(&dir, name)?;
        let ctx = || file_context(&dir, &leaf);

        self.with_locks(&[leaf.canonical()], || {
            require_readable_file(&leaf, ctx)?;
            Ok(self.sidecars.read(leaf.path()))
        })
    }

    /// Open a file for streaming, together with its stored checksum.
    #[instrument(level = "info", skip(self))]
    pub fn download(&self, dir: Option<&str>, name: &str) -> ShareResult<Download> {
        let dir = self.sandbox.resolve_directory(dir)?;
        let leaf = self.sandbox.resolve_file(&dir, name)?;
        let ctx = || file_context(&dir, &leaf);

        self.with_locks(&[leaf.canonical()], || {
            let metadata = require_readable_file(&leaf, ctx)?;
            let file = File::open(leaf.canonical()).map_err(|e| ShareError::io(e, ctx()))?;
            let record = self.sidecars.read(leaf.path());
            debug!(len = metadata.len(), "File opened for download");
            Ok(Download {
                file,
                name: leaf.name().to_string(),
                checksum: record.checksum,
                len: metadata.len(),
            })
        })
    }

    // ==================== Identity changes ====================

    /// Rename a file within one directory, carrying its comment along.
    #[instrument(level = "info", skip(self))]
    pub fn rename(&self, dir: Option<&str>, old_name: &str, new_name: &str, index: bool) -> ShareResult<()> {
        let dir = self.sandbox.resolve_directory(dir)?;
        let source = self.sandbox.resolve_file(&dir, old_name)?;
        let target = self.sandbox.resolve_file(&dir, new_name)?;

        self.relocate(&dir, &source, &dir, &target, index)?;
        info!("File renamed");
        Ok(())
    }

    /// Move a file between directories, keeping its name and comment.
    #[instrument(level = "info", skip(self))]
    pub fn move_file(&self, src_dir: Option<&str>, dst_dir: Option<&str>, name: &str, index: bool) -> ShareResult<()> {
        let src = self.sandbox.resolve_directory(src_dir)?;
        let dst = self.sandbox.resolve_directory(dst_dir)?;
        let source = self.sandbox.resolve_file(&src, name)?;
        let target = self.sandbox.resolve_file(&dst, name)?;

        self.relocate(&src, &source, &dst, &target, index)?;
        info!(from = %src.relative(), to = %dst.relative(), "File moved");
        Ok(())
    }

    fn relocate(
        &self,
        src_dir: &ResolvedDir,
        source: &ResolvedPath,
        dst_dir: &ResolvedDir,
        target: &ResolvedPath,
        index: bool,
    ) -> ShareResult<()> {
        let src_ctx = || file_context(src_dir, source);
        let dst_ctx = || file_context(dst_dir, target);

        self.with_locks(&[source.canonical(), target.canonical()], || {
            let metadata = fs::symlink_metadata(source.path()).map_err(|e| ShareError::io(e, src_ctx()))?;
            if !metadata.is_file() {
                return Err(ShareError::NotAFile { context: src_ctx() });
            }
            if target.exists() {
                return Err(ShareError::AlreadyExists { context: dst_ctx() });
            }

            let record = self.unindex_file(source.path(), source.name(), &src_ctx)?;
            self.sidecars
                .delete(source.path())
                .map_err(|e| ShareError::io(e, src_ctx()))?;

            fs::rename(source.path(), target.path()).map_err(|e| ShareError::io(e, dst_ctx()))?;

            self.reseal(target, &record.comment, index, dst_ctx)
        })
    }

    /// Replace the comment of a file.
    #[instrument(level = "info", skip(self, comment), fields(comment_len = comment.len()))]
    pub fn set_comment(&self, dir: Option<&str>, name: &str, comment: &str, index: bool) -> ShareResult<()> {
        let dir = self.sandbox.resolve_directory(dir)?;
        let leaf = self.sandbox.resolve_file(&dir, name)?;
        let ctx = || file_context(&dir, &leaf);

        self.with_locks(&[leaf.canonical()], || {
            require_readable_file(&leaf, ctx)?;

            self.unindex_file(leaf.path(), leaf.name(), &ctx)?;
            self.sidecars.delete(leaf.path()).map_err(|e| ShareError::io(e, ctx()))?;

            self.reseal(&leaf, comment, index, ctx)?;
            info!("Comment updated");
            Ok(())
        })
    }

    /// Recompute the checksum of `leaf`, store it with `comment`, and index
    /// the file if requested.
    fn reseal(
        &self,
        leaf: &ResolvedPath,
        comment: &str,
        index: bool,
        ctx: impl Fn() -> ShareOpContext,
    ) -> ShareResult<()> {
        let digest = digest_file(leaf.path()).map_err(|e| ShareError::io(e, ctx()))?;
        self.sidecars
            .write(leaf.path(), &digest.to_hex(), comment)
            .map_err(|e| ShareError::io(e, ctx()))?;
        if index {
            self.index_file(leaf.name(), comment, &digest, ctx)?;
        }
        Ok(())
    }

    // ==================== Index plumbing ====================

    fn index_file(
        &self,
        name: &str,
        comment: &str,
        digest: &ContentDigest,
        ctx: impl FnOnce() -> ShareOpContext,
    ) -> ShareResult<()> {
        let token = self.tokenizer.token(&self.seed, name, &digest.to_hex());
        let result = self
            .index
            .notify_indexed(&token, &phrase_for(name), comment, digest.as_bytes());
        self.index_outcome(result, ctx)
    }

    /// Withdraw a file's current identity from the index. Returns the sidecar
    /// record the identity was built from.
    fn unindex_file(
        &self,
        path: &Path,
        name: &str,
        ctx: impl FnOnce() -> ShareOpContext,
    ) -> ShareResult<SidecarRecord> {
        let record = self.sidecars.read(path);
        let token = self.tokenizer.token(&self.seed, name, &record.checksum);
        let result = self.index.notify_unindexed(&token, &phrase_for(name), &record.comment);
        self.index_outcome(result, ctx)?;
        Ok(record)
    }

    fn index_outcome(
        &self,
        result: Result<(), IndexError>,
        ctx: impl FnOnce() -> ShareOpContext,
    ) -> ShareResult<()> {
        match (result, self.index_failures) {
            (Ok(()), _) => Ok(()),
            (Err(source), IndexFailurePolicy::Fatal) => Err(ShareError::IndexingFailed {
                source,
                context: ctx(),
            }),
            (Err(source), IndexFailurePolicy::Warn) => {
                warn!(error = %source, context = %ctx(), "Index bridge failed, continuing");
                Ok(())
            }
        }
    }

    // ==================== Locking ====================

    fn with_locks<T>(&self, paths: &[&Path], f: impl FnOnce() -> ShareResult<T>) -> ShareResult<T> {
        let guards = self.locks.lock_many(paths);
        let result = f();
        drop(guards);
        self.locks.prune_idle();
        result
    }
}

fn file_context(dir: &ResolvedDir, leaf: &ResolvedPath) -> ShareOpContext {
    ShareOpContext::new()
        .with_relative_path(dir.relative())
        .with_name(leaf.name())
        .with_absolute_path(leaf.path())
}

fn require_readable_file(leaf: &ResolvedPath, ctx: impl Fn() -> ShareOpContext) -> ShareResult<fs::Metadata> {
    let metadata = fs::metadata(leaf.canonical()).map_err(|e| ShareError::io(e, ctx()))?;
    if !metadata.is_file() {
        return Err(ShareError::NotAFile { context: ctx() });
    }
    if !is_readable(leaf.canonical()) {
        return Err(ShareError::AccessDenied {
            reason: "file is not readable",
            context: ctx(),
        });
    }
    Ok(metadata)
}
