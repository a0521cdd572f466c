//! Runtime configuration.
//!
//! Loaded from an optional TOML file, then overridden by `BG_REMOVER_*`
//! environment variables. Every field has a default, so an empty file (or no
//! file at all) is a valid configuration.
//!
//! ```toml
//! binary_path = "/opt/bg-remover/bin/bg-remover"
//! timeout = 120
//!
//! [github]
//! repo = "artisan-build/bg-remover"
//! version = "v1.2.0"
//!
//! [disks.uploads]
//! root = "/srv/uploads"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bgr_schema::GitHubRepo;
use serde::Deserialize;
use thiserror::Error;

use crate::installer::InstallSettings;
use crate::storage::{Disks, LocalDisk};

/// Repository the prebuilt binaries are published from.
pub const DEFAULT_REPO: &str = "artisan-build/bg-remover";

/// Release index host.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Subprocess deadline, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the binary is installed and executed from.
    pub binary_path: PathBuf,
    pub github: GitHubConfig,
    /// Platform override; `None` auto-detects.
    pub platform: Option<String>,
    /// Refuse to install when a release carries no `checksums.txt`.
    pub require_checksum: bool,
    /// Subprocess timeout in seconds.
    pub timeout: u64,
    /// Parent directory for per-request staging areas.
    pub temp_dir: PathBuf,
    pub queue: QueueConfig,
    pub disks: BTreeMap<String, DiskConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubConfig {
    pub repo: String,
    /// `latest` or an exact tag.
    pub version: String,
    pub api_url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub connection: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiskConfig {
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let mut disks = BTreeMap::new();
        disks.insert(
            "local".to_string(),
            DiskConfig {
                root: PathBuf::from("."),
            },
        );

        Self {
            binary_path: crate::default_binary_path(),
            github: GitHubConfig::default(),
            platform: None,
            require_checksum: false,
            timeout: DEFAULT_TIMEOUT_SECS,
            temp_dir: std::env::temp_dir(),
            queue: QueueConfig::default(),
            disks,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repo: DEFAULT_REPO.to_string(),
            version: "latest".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            connection: None,
            name: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// `path` is read when given and must exist. Without it the default
    /// location (`~/.bg-remover/config.toml`) is read only if present.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = crate::default_config_path();
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `BG_REMOVER_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BG_REMOVER_BINARY_PATH") {
            self.binary_path = PathBuf::from(v);
        }
        if let Some(v) = get("BG_REMOVER_REPO") {
            self.github.repo = v;
        }
        if let Some(v) = get("BG_REMOVER_VERSION") {
            self.github.version = v;
        }
        if let Some(v) = get("BG_REMOVER_API_URL") {
            self.github.api_url = v;
        }
        if let Some(v) = get("BG_REMOVER_GITHUB_TOKEN").or_else(|| get("GITHUB_TOKEN")) {
            self.github.token = Some(v);
        }
        if let Some(v) = get("BG_REMOVER_PLATFORM") {
            self.platform = Some(v);
        }
        if let Some(v) = get("BG_REMOVER_REQUIRE_CHECKSUM") {
            self.require_checksum = parse_bool("BG_REMOVER_REQUIRE_CHECKSUM", &v)?;
        }
        if let Some(v) = get("BG_REMOVER_TIMEOUT") {
            self.timeout = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "BG_REMOVER_TIMEOUT",
                message: format!("expected a number of seconds, got '{v}'"),
            })?;
        }
        if let Some(v) = get("BG_REMOVER_TEMP_DIR") {
            self.temp_dir = PathBuf::from(v);
        }
        if let Some(v) = get("BG_REMOVER_QUEUE_CONNECTION") {
            self.queue.connection = Some(v);
        }
        if let Some(v) = get("BG_REMOVER_QUEUE") {
            self.queue.name = v;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout",
                message: "must be at least one second".to_string(),
            });
        }
        if self.binary_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "binary_path",
                message: "must not be empty".to_string(),
            });
        }
        self.repo()?;
        Ok(())
    }

    pub fn repo(&self) -> Result<GitHubRepo, ConfigError> {
        GitHubRepo::new(&self.github.repo).map_err(|message| ConfigError::Invalid {
            key: "github.repo",
            message,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn install_settings(&self) -> Result<InstallSettings, ConfigError> {
        Ok(InstallSettings {
            repo: self.repo()?,
            version: self.github.version.clone(),
            binary_path: self.binary_path.clone(),
            platform: self.platform.clone(),
            require_checksum: self.require_checksum,
        })
    }

    /// Build the disk registry from `[disks.*]`. A `local` disk rooted at
    /// the working directory is always present unless configured otherwise.
    pub fn disks(&self) -> Disks {
        let mut disks = Disks::new();
        disks.insert("local", LocalDisk::new("."));
        for (name, disk) in &self.disks {
            disks.insert(name.clone(), LocalDisk::new(&disk.root));
        }
        disks
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got '{value}'"),
        }),
    }
}
