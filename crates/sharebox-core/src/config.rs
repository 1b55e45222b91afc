//! Construction-time configuration for [`ShareOperations`](crate::ShareOperations).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::index::IndexFailurePolicy;
use crate::sandbox::DEFAULT_MAX_PATH_LENGTH;

/// Identity fed to the URL tokenizer when none is configured.
pub const DEFAULT_SEED: &str = "local";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Directory exposed by the share. Canonicalized when operations are built.
    pub root: PathBuf,
    /// Peer identity used when building index URL tokens.
    #[serde(default = "default_seed")]
    pub seed: String,
    /// Maximum canonical path length in bytes.
    #[serde(default = "default_max_path_length")]
    pub max_path_length: usize,
    #[serde(default)]
    pub index_failures: IndexFailurePolicy,
}

fn default_seed() -> String {
    DEFAULT_SEED.to_string()
}

fn default_max_path_length() -> usize {
    DEFAULT_MAX_PATH_LENGTH
}

impl ShareConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seed: default_seed(),
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            index_failures: IndexFailurePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    #[must_use]
    pub fn with_max_path_length(mut self, max: usize) -> Self {
        self.max_path_length = max;
        self
    }

    #[must_use]
    pub fn with_index_failures(mut self, policy: IndexFailurePolicy) -> Self {
        self.index_failures = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
