//! # Configuration Management
//!
//! Registry configuration is a JSON document with one section per concern.
//! Every section is optional and falls back to its defaults:
//!
//! ```json
//! {
//!   "server": { "app_url": "https://git.example.com/" },
//!   "storage": { "data_dir": "/srv/registry" },
//!   "index": { "default_branch": "main", "private": false },
//!   "security": { "require_sign_in_view": false },
//!   "limits": { "max_metadata_size": 1048576, "max_crate_size": 83886080 }
//! }
//! ```
//!
//! ```rust,no_run
//! # use cargo_registry::config::Config;
//! let config = Config::load_or_default("registry.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::RegistryResult;
use crate::validation::{MAX_CRATE_SIZE, MAX_METADATA_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: IndexRepositoryConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Public address of the hosting service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL that `dl` and `api` in `config.json` are derived from
    pub app_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:3000/".to_string(),
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Package documents and crate blobs
    pub data_dir: PathBuf,
    /// Hosted index repositories, `<data_dir>/repositories` when unset
    #[serde(default)]
    pub repositories_dir: Option<PathBuf>,
    /// Parent of the temporary staging repositories, system temp when unset
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            repositories_dir: None,
            staging_dir: None,
        }
    }
}

/// Settings applied when an index repository is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRepositoryConfig {
    pub default_branch: String,
    /// Create new index repositories as private
    #[serde(default)]
    pub private: bool,
}

impl Default for IndexRepositoryConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".to_string(),
            private: false,
        }
    }
}

/// Security configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Instance-wide sign-in requirement for viewing anything
    #[serde(default)]
    pub require_sign_in_view: bool,
}

/// Upload limits configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_metadata_size")]
    pub max_metadata_size: usize,
    #[serde(default = "default_max_crate_size")]
    pub max_crate_size: u64,
    /// Total crate bytes a single owner may store
    #[serde(default)]
    pub max_owner_storage: Option<u64>,
}

fn default_max_metadata_size() -> usize {
    MAX_METADATA_SIZE
}

fn default_max_crate_size() -> u64 {
    MAX_CRATE_SIZE
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_metadata_size: MAX_METADATA_SIZE,
            max_crate_size: MAX_CRATE_SIZE,
            max_owner_storage: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not a valid configuration
    /// document.
    pub fn load<P: AsRef<Path>>(path: P) -> RegistryResult<Self> {
        let config_str = fs::read_to_string(path)?;
        let config = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    /// Load configuration from file with fallback to defaults when the file
    /// does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> RegistryResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Directory holding the hosted index repositories.
    pub fn repositories_path(&self) -> PathBuf {
        self.storage
            .repositories_dir
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join("repositories"))
    }

    /// `server.app_url` with exactly one trailing slash.
    pub fn normalized_app_url(&self) -> String {
        format!("{}/", self.server.app_url.trim_end_matches('/'))
    }
}
