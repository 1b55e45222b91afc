//! Error types for share operations.
//!
//! Every failure the core can report is a [`ShareError`]. Each variant carries a
//! [`ShareOpContext`] describing where the failure happened, and
//! [`ShareError::kind`] collapses the variant into a [`ShareErrorKind`] so
//! transports can map errors to status codes without destructuring.

use std::path::PathBuf;

use thiserror::Error;

use crate::index::IndexError;

/// Context for share operations, providing debugging information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareOpContext {
    /// The caller-supplied relative directory path (if applicable)
    pub relative_path: Option<String>,
    /// The leaf name being operated on (if applicable)
    pub name: Option<String>,
    /// The absolute filesystem location involved
    pub absolute_path: Option<PathBuf>,
}

impl ShareOpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relative_path(mut self, path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        self.relative_path = Some(if path.is_empty() { "<root>".to_string() } else { path.to_string() });
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_absolute_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.absolute_path = Some(path.into());
        self
    }
}

impl std::fmt::Display for ShareOpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();

        if let Some(name) = &self.name {
            parts.push(format!("name '{name}'"));
        }
        if let Some(path) = &self.relative_path {
            parts.push(format!("in '{path}'"));
        }
        if let Some(abs) = &self.absolute_path {
            parts.push(format!("at {:?}", abs.display()));
        }

        if parts.is_empty() {
            write!(f, "(no context)")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Coarse classification of a [`ShareError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareErrorKind {
    NotFound,
    AlreadyExists,
    NotADirectory,
    NotAFile,
    AccessDenied,
    IllegalName,
    PathTooLong,
    TraversalDenied,
    ForbiddenTarget,
    IndexingFailed,
    IoFailure,
}

impl ShareErrorKind {
    /// Returns true for errors caused by the caller's input rather than the
    /// environment.
    pub fn is_caller_error(self) -> bool {
        matches!(
            self,
            ShareErrorKind::IllegalName
                | ShareErrorKind::PathTooLong
                | ShareErrorKind::TraversalDenied
                | ShareErrorKind::ForbiddenTarget
        )
    }
}

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("Not found: {context}")]
    NotFound { context: ShareOpContext },

    #[error("Already exists: {context}")]
    AlreadyExists { context: ShareOpContext },

    #[error("Not a directory: {context}")]
    NotADirectory { context: ShareOpContext },

    #[error("Not a regular file: {context}")]
    NotAFile { context: ShareOpContext },

    #[error("Access denied ({reason}): {context}")]
    AccessDenied {
        reason: &'static str,
        context: ShareOpContext,
    },

    #[error("Illegal name '{name}': {reason}")]
    IllegalName { name: String, reason: &'static str },

    #[error("Path too long ({len} > {max} bytes): {context}")]
    PathTooLong {
        len: usize,
        max: usize,
        context: ShareOpContext,
    },

    #[error("Path escapes its sandbox: {context}")]
    TraversalDenied { context: ShareOpContext },

    #[error("Operation on the share root is not allowed: {context}")]
    ForbiddenTarget { context: ShareOpContext },

    #[error("Index bridge failed for {context}: {source}")]
    IndexingFailed {
        #[source]
        source: IndexError,
        context: ShareOpContext,
    },

    #[error("IO error for {context}: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        context: ShareOpContext,
    },
}

impl ShareError {
    pub fn kind(&self) -> ShareErrorKind {
        match self {
            ShareError::NotFound { .. } => ShareErrorKind::NotFound,
            ShareError::AlreadyExists { .. } => ShareErrorKind::AlreadyExists,
            ShareError::NotADirectory { .. } => ShareErrorKind::NotADirectory,
            ShareError::NotAFile { .. } => ShareErrorKind::NotAFile,
            ShareError::AccessDenied { .. } => ShareErrorKind::AccessDenied,
            ShareError::IllegalName { .. } => ShareErrorKind::IllegalName,
            ShareError::PathTooLong { .. } => ShareErrorKind::PathTooLong,
            ShareError::TraversalDenied { .. } => ShareErrorKind::TraversalDenied,
            ShareError::ForbiddenTarget { .. } => ShareErrorKind::ForbiddenTarget,
            ShareError::IndexingFailed { .. } => ShareErrorKind::IndexingFailed,
            ShareError::Io { .. } => ShareErrorKind::IoFailure,
        }
    }

    /// Wraps an IO error, promoting well-known kinds to their typed variants.
    pub(crate) fn io(source: std::io::Error, context: ShareOpContext) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => ShareError::NotFound { context },
            std::io::ErrorKind::AlreadyExists => ShareError::AlreadyExists { context },
            std::io::ErrorKind::PermissionDenied => ShareError::AccessDenied {
                reason: "permission denied",
                context,
            },
            _ => ShareError::Io { source, context },
        }
    }
}

impl From<std::io::Error> for ShareError {
    fn from(source: std::io::Error) -> Self {
        ShareError::io(source, ShareOpContext::new())
    }
}

pub type ShareResult<T> = Result<T, ShareError>;
