//! Configuration file support for the sharebox CLI.
//!
//! Configuration is stored at:
//! - macOS: `~/Library/Application Support/com.sharebox.sharebox/config.toml`
//! - Linux: `~/.config/sharebox/config.toml`
//!
//! `SHAREBOX_CONFIG_DIR` overrides the directory on every platform.
//!
//! Example configuration:
//! ```toml
//! [defaults]
//! root = "~/Public"
//! seed = "workstation"
//! index_failures = "warn"
//!
//! [shares.public]
//! path = "~/Public"
//!
//! [shares.music]
//! path = "/srv/music"
//! seed = "music-box"
//! max_path_length = 1024
//! ```

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sharebox_core::{IndexFailurePolicy, ShareConfig};

/// Environment variable that overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "SHAREBOX_CONFIG_DIR";

/// Root configuration structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Named share configurations
    #[serde(default)]
    pub shares: HashMap<String, ShareEntry>,
}

/// Default settings applied to all shares
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Defaults {
    /// Share used when `--root` is not given
    pub root: Option<PathBuf>,

    /// Peer identity for index URL tokens
    pub seed: Option<String>,

    /// How index bridge failures are treated
    pub index_failures: Option<IndexFailurePolicy>,

    /// Maximum canonical path length in bytes
    pub max_path_length: Option<usize>,
}

/// Configuration for a named share
#[derive(Debug, Deserialize, Serialize)]
pub struct ShareEntry {
    /// Path to the shared directory
    pub path: PathBuf,

    /// Override the default seed
    pub seed: Option<String>,

    /// Override the default index failure policy
    pub index_failures: Option<IndexFailurePolicy>,

    /// Override the default path length limit
    pub max_path_length: Option<usize>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get a share by alias
    pub fn get_share(&self, alias: &str) -> Option<&ShareEntry> {
        self.shares.get(alias)
    }

    /// List all configured share aliases, sorted
    pub fn list_share_aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.shares.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// Build the share configuration for a `--root` argument.
    ///
    /// `@alias` picks a named share, anything else is a directory path, and
    /// no argument falls back to `defaults.root`.
    pub fn share_config(&self, root_arg: Option<&str>) -> Result<ShareConfig> {
        let (path, entry) = match root_arg {
            Some(arg) => match arg.strip_prefix('@') {
                Some(alias) => {
                    let entry = self.resolve_share_alias(alias)?;
                    (entry.path.clone(), Some(entry))
                }
                None => (PathBuf::from(arg), None),
            },
            None => {
                let root = self.defaults.root.clone().ok_or_else(|| {
                    anyhow::anyhow!(
                        "No share root given.\n\n\
                         Pass --root <DIR> or --root @alias, set SHAREBOX_ROOT, \
                         or set `root` under [defaults] in the config file."
                    )
                })?;
                (root, None)
            }
        };

        let mut config = ShareConfig::new(expand_tilde(&path));
        if let Some(seed) = entry
            .and_then(|e| e.seed.clone())
            .or_else(|| self.defaults.seed.clone())
        {
            config = config.with_seed(seed);
        }
        if let Some(policy) = entry
            .and_then(|e| e.index_failures)
            .or(self.defaults.index_failures)
        {
            config = config.with_index_failures(policy);
        }
        if let Some(max) = entry
            .and_then(|e| e.max_path_length)
            .or(self.defaults.max_path_length)
        {
            config = config.with_max_path_length(max);
        }
        Ok(config)
    }

    fn resolve_share_alias(&self, alias: &str) -> Result<&ShareEntry> {
        if alias.is_empty() {
            anyhow::bail!("Empty share alias. Use @name to reference a configured share.");
        }

        if let Some(entry) = self.get_share(alias) {
            return Ok(entry);
        }

        let available = self.list_share_aliases();
        let config_location = config_path()
            .map_or_else(|_| "config file".to_string(), |p| p.display().to_string());
        if available.is_empty() {
            anyhow::bail!(
                "Unknown share alias '@{alias}'.\n\n\
                 No shares are configured. Add one to {config_location}:\n\n\
                 [shares.{alias}]\n\
                 path = \"/path/to/share\""
            );
        }
        anyhow::bail!(
            "Unknown share alias '@{alias}'.\n\nAvailable aliases: {}",
            available
                .iter()
                .map(|a| format!("@{a}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

/// Get the configuration file path.
pub fn config_path() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir).join("config.toml"));
    }

    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

    #[cfg(target_os = "macos")]
    {
        let config_dir = base_dirs
            .home_dir()
            .join("Library/Application Support/com.sharebox.sharebox");
        Ok(config_dir.join("config.toml"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        let config_dir = base_dirs.config_dir().join("sharebox");
        Ok(config_dir.join("config.toml"))
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(base_dirs) = directories::BaseDirs::new()
    {
        return base_dirs.home_dir().join(rest);
    }
    path.to_path_buf()
}
