//! Sandboxed file sharing with checksum and comment sidecars.
//!
//! A share exposes one directory tree. Every caller-supplied path goes through
//! [`PathSandbox`] before it touches the filesystem, and every regular file
//! carries a `<file>.md5` sidecar holding its MD5 digest and a free-text
//! comment. [`ShareOperations`] is the entry point for transports:
//!
//! ```no_run
//! use sharebox_core::{ShareConfig, ShareOperations};
//!
//! let ops = ShareOperations::new(&ShareConfig::new("/srv/share"))?;
//! ops.create_directory(None, "docs")?;
//! let digest = ops.upload(Some("docs"), Some("notes.txt"), &b"hello"[..], false, Some("first draft"))?;
//! assert_eq!(ops.get_checksum(Some("docs"), "notes.txt")?, digest.to_hex());
//! # Ok::<(), sharebox_core::ShareError>(())
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod index;
pub mod listing;
pub mod locks;
pub mod operations;
pub mod sandbox;
pub mod sidecar;

pub use checksum::ContentDigest;
pub use config::ShareConfig;
pub use error::{ShareError, ShareErrorKind, ShareOpContext, ShareResult};
pub use index::{IndexBridge, IndexError, IndexFailurePolicy, NoopIndex, TracingIndex, UrlTokenizer};
pub use listing::{DirectoryListing, EntryKind, ListingEntry, ListingRenderer, ListingRequest};
pub use operations::{DEFAULT_UPLOAD_NAME, DeleteStats, Download, ShareOperations};
pub use sandbox::{PathSandbox, ResolvedDir, ResolvedPath};
pub use sidecar::{SidecarRecord, SidecarStore};
