//! Store configuration
//!
//! Stored as JSON, by default in ~/.config/pagestore/config.json.
//! A missing file means defaults.

use crate::store::{FsBackend, MemoryBackend, DEFAULT_COMPRESSION_LEVEL};
use crate::{ContentStore, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which backend a configured store uses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Fs,
    Memory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory of the fs backend
    pub root: PathBuf,
    pub backend: BackendKind,
    /// zstd level for record bodies (1..=22)
    pub compression_level: i32,
    /// Sync files and directories on every mutation
    pub fsync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root: PathBuf::from("content"),
            backend: BackendKind::Fs,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            fsync: true,
        }
    }
}

impl Config {
    /// Default config file location (~/.config/pagestore/config.json)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("pagestore").join("config.json"))
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path()?)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=22).contains(&self.compression_level) {
            return Err(Error::Config(format!(
                "compression_level must be between 1 and 22, got {}",
                self.compression_level
            )));
        }
        if self.backend == BackendKind::Fs && self.root.as_os_str().is_empty() {
            return Err(Error::Config("root must not be empty".into()));
        }
        Ok(())
    }

    /// Build a store as configured
    pub fn open_store(&self) -> Result<ContentStore> {
        self.validate()?;
        let store = match self.backend {
            BackendKind::Fs => {
                ContentStore::new(FsBackend::open(&self.root)?.with_fsync(self.fsync))
            }
            BackendKind::Memory => ContentStore::new(MemoryBackend::new()),
        };
        tracing::debug!(
            backend = store.backend_name(),
            root = %self.root.display(),
            "opened store"
        );
        Ok(store.with_compression_level(self.compression_level))
    }
}
