#![allow(dead_code)]

pub mod share_builder;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use sharebox_core::{IndexBridge, IndexError, SidecarStore};

pub use share_builder::ShareBuilder;

/// One call observed by [`RecordingIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    Indexed {
        url_token: String,
        phrase: String,
        comment: String,
        checksum: Vec<u8>,
    },
    Unindexed {
        url_token: String,
        phrase: String,
        comment: String,
    },
}

impl IndexEvent {
    pub fn url_token(&self) -> &str {
        match self {
            IndexEvent::Indexed { url_token, .. } | IndexEvent::Unindexed { url_token, .. } => url_token,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, IndexEvent::Indexed { .. })
    }
}

/// Index bridge that remembers every call in order.
#[derive(Debug, Default)]
pub struct RecordingIndex {
    events: Mutex<Vec<IndexEvent>>,
}

impl RecordingIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<IndexEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl IndexBridge for RecordingIndex {
    fn notify_indexed(
        &self,
        url_token: &str,
        phrase: &str,
        comment: &str,
        checksum: &[u8],
    ) -> Result<(), IndexError> {
        self.events.lock().push(IndexEvent::Indexed {
            url_token: url_token.to_string(),
            phrase: phrase.to_string(),
            comment: comment.to_string(),
            checksum: checksum.to_vec(),
        });
        Ok(())
    }

    fn notify_unindexed(&self, url_token: &str, phrase: &str, comment: &str) -> Result<(), IndexError> {
        self.events.lock().push(IndexEvent::Unindexed {
            url_token: url_token.to_string(),
            phrase: phrase.to_string(),
            comment: comment.to_string(),
        });
        Ok(())
    }
}

/// Index bridge that checks removal order from inside `notify_unindexed`.
///
/// A tracked file must still be on disk with its sidecar when it is
/// unindexed, and every file unindexed before it must already be gone
/// together with its sidecar. Assertion failures panic out of the delete.
#[derive(Debug, Default)]
pub struct DeletionWitness {
    tracked: Mutex<HashMap<String, PathBuf>>,
    removed: Mutex<Vec<String>>,
}

impl DeletionWitness {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Watch `path`; tokens are matched by file name, so names must be unique.
    pub fn track(&self, path: PathBuf) {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.tracked.lock().insert(name, path);
    }

    /// File names in the order they were unindexed.
    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }
}

fn token_file_name(url_token: &str) -> &str {
    let (location, _) = url_token.rsplit_once("?md5=").unwrap();
    location.rsplit('/').next().unwrap()
}

impl IndexBridge for DeletionWitness {
    fn notify_indexed(&self, _: &str, _: &str, _: &str, _: &[u8]) -> Result<(), IndexError> {
        Ok(())
    }

    fn notify_unindexed(&self, url_token: &str, _: &str, _: &str) -> Result<(), IndexError> {
        let sidecars = SidecarStore::new();
        let name = token_file_name(url_token);
        let tracked = self.tracked.lock();
        let path = tracked
            .get(name)
            .unwrap_or_else(|| panic!("untracked file unindexed: {url_token}"));

        assert!(path.is_file(), "{name} removed before it was unindexed");
        assert!(
            sidecars.sidecar_path_for(path).is_file(),
            "sidecar of {name} removed before the file was unindexed"
        );

        let mut removed = self.removed.lock();
        for earlier in removed.iter() {
            let earlier_path = &tracked[earlier];
            assert!(!earlier_path.exists(), "{earlier} still present when {name} was unindexed");
            assert!(
                !sidecars.sidecar_path_for(earlier_path).exists(),
                "sidecar of {earlier} still present when {name} was unindexed"
            );
        }
        removed.push(name.to_string());
        Ok(())
    }
}

/// Index bridge whose every call fails.
#[derive(Debug, Default)]
pub struct FailingIndex;

impl IndexBridge for FailingIndex {
    fn notify_indexed(&self, url_token: &str, _: &str, _: &str, _: &[u8]) -> Result<(), IndexError> {
        Err(IndexError::Rejected {
            url_token: url_token.to_string(),
            reason: "index offline".to_string(),
        })
    }

    fn notify_unindexed(&self, _: &str, _: &str, _: &str) -> Result<(), IndexError> {
        Err(IndexError::Unavailable("index offline".to_string()))
    }
}

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Returns true when running as root, where permission checks always pass.
#[cfg(unix)]
pub fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}
