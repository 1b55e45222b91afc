//! Search-index notifications.
//!
//! The core never talks to an indexer directly. Instead it calls an
//! [`IndexBridge`] with an opaque URL token (built by a [`UrlTokenizer`]), a
//! search phrase derived from the file name, the comment, and the digest.
//!
//! Ordering guarantee: for every identity-changing operation the old identity
//! is unindexed before the filesystem changes and the new identity is indexed
//! afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Failure reported by an index implementation.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Indexer rejected '{url_token}': {reason}")]
    Rejected { url_token: String, reason: String },

    #[error("Indexer unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Receives add/remove events for shared files.
pub trait IndexBridge: Send + Sync {
    /// A file became visible under `url_token`.
    fn notify_indexed(
        &self,
        url_token: &str,
        phrase: &str,
        comment: &str,
        checksum: &[u8],
    ) -> Result<(), IndexError>;

    /// A file previously indexed under `url_token` is going away.
    fn notify_unindexed(&self, url_token: &str, phrase: &str, comment: &str) -> Result<(), IndexError>;
}

/// Index bridge that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIndex;

impl IndexBridge for NoopIndex {
    fn notify_indexed(&self, _: &str, _: &str, _: &str, _: &[u8]) -> Result<(), IndexError> {
        Ok(())
    }

    fn notify_unindexed(&self, _: &str, _: &str, _: &str) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Index bridge that records each event as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingIndex;

impl IndexBridge for TracingIndex {
    fn notify_indexed(
        &self,
        url_token: &str,
        phrase: &str,
        comment: &str,
        checksum: &[u8],
    ) -> Result<(), IndexError> {
        info!(
            target: "sharebox::index",
            url = url_token,
            phrase,
            comment_len = comment.len(),
            checksum = %hex::encode(checksum),
            "Indexed"
        );
        Ok(())
    }

    fn notify_unindexed(&self, url_token: &str, phrase: &str, comment: &str) -> Result<(), IndexError> {
        info!(
            target: "sharebox::index",
            url = url_token,
            phrase,
            comment_len = comment.len(),
            "Unindexed"
        );
        Ok(())
    }
}

/// Builds the URL token identifying a file to the indexer.
pub trait UrlTokenizer: Send + Sync {
    fn token(&self, seed: &str, filename: &str, checksum_hex: &str) -> String;
}

impl<F> UrlTokenizer for F
where
    F: Fn(&str, &str, &str) -> String + Send + Sync,
{
    fn token(&self, seed: &str, filename: &str, checksum_hex: &str) -> String {
        self(seed, filename, checksum_hex)
    }
}

/// Default tokenizer: `share://<seed>/<filename>?md5=<checksum>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareUrlTokenizer;

impl UrlTokenizer for ShareUrlTokenizer {
    fn token(&self, seed: &str, filename: &str, checksum_hex: &str) -> String {
        format!("share://{seed}/{filename}?md5={checksum_hex}")
    }
}

/// What to do when the index bridge reports a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFailurePolicy {
    /// Abort the operation with `ShareError::IndexingFailed`.
    #[default]
    Fatal,
    /// Log a warning and carry on.
    Warn,
}

/// Search phrase for a file name: `.`, `_` and `-` become spaces.
pub fn phrase_for(filename: &str) -> String {
    filename.replace(['.', '_', '-'], " ")
}
