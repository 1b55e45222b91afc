use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sharebox_core::checksum::digest_bytes;
use sharebox_core::{IndexBridge, IndexFailurePolicy, ShareConfig, ShareOperations, SidecarStore};
use tempfile::TempDir;

/// A builder for test shares with known structure and content.
///
/// The share root is `<temp>/share`, so tests can place files next to the
/// root to check that nothing escapes it.
pub struct ShareBuilder {
    files: Vec<(String, Vec<u8>, Option<String>)>,
    directories: Vec<String>,
    outside: Vec<(String, Vec<u8>)>,
    index: Option<Arc<dyn IndexBridge>>,
    policy: IndexFailurePolicy,
    seed: String,
    max_path_length: Option<usize>,
}

pub struct TestShare {
    pub temp: TempDir,
    pub ops: ShareOperations,
}

impl TestShare {
    /// Canonical share root.
    pub fn root(&self) -> &Path {
        self.ops.root()
    }

    /// Absolute path of `relative` below the root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// The directory containing the share root.
    pub fn outside(&self) -> PathBuf {
        fs::canonicalize(self.temp.path()).unwrap()
    }

    pub fn sidecar_of(&self, relative: &str) -> PathBuf {
        SidecarStore::new().sidecar_path_for(&self.path(relative))
    }
}

impl ShareBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            directories: Vec::new(),
            outside: Vec::new(),
            index: None,
            policy: IndexFailurePolicy::Fatal,
            seed: "test-peer".to_string(),
            max_path_length: None,
        }
    }

    /// Add a directory (parents are created as needed).
    pub fn add_directory(mut self, path: impl Into<String>) -> Self {
        self.directories.push(path.into());
        self
    }

    /// Add a file without a sidecar.
    pub fn add_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.into(), content.into(), None));
        self
    }

    /// Add a file with a correct sidecar carrying `comment`.
    pub fn add_described_file(
        mut self,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
        comment: impl Into<String>,
    ) -> Self {
        self.files.push((path.into(), content.into(), Some(comment.into())));
        self
    }

    /// Add a file beside the share root, outside the sandbox.
    pub fn add_outside_file(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.outside.push((name.into(), content.into()));
        self
    }

    pub fn with_index(mut self, index: Arc<dyn IndexBridge>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_index_failures(mut self, policy: IndexFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_path_length(mut self, max: usize) -> Self {
        self.max_path_length = Some(max);
        self
    }

    pub fn build(self) -> TestShare {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("share");
        fs::create_dir(&root).unwrap();

        for dir in &self.directories {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for (path, content, comment) in &self.files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&full, content).unwrap();
            if let Some(comment) = comment {
                SidecarStore::new()
                    .write(&full, &digest_bytes(content).to_hex(), comment)
                    .unwrap();
            }
        }
        for (name, content) in &self.outside {
            fs::write(temp.path().join(name), content).unwrap();
        }

        let mut config = ShareConfig::new(&root)
            .with_seed(self.seed)
            .with_index_failures(self.policy);
        if let Some(max) = self.max_path_length {
            config = config.with_max_path_length(max);
        }

        let mut ops = ShareOperations::new(&config).unwrap();
        if let Some(index) = self.index {
            ops = ops.with_index(index);
        }

        TestShare { temp, ops }
    }
}
