//! Configuration management for trellis.
//!
//! A portfolio lives in a `.trellis/` directory holding `config.yaml` and the
//! JSONL snapshot. This module owns the config file structure and its
//! load/save; directory scaffolding lives in [`crate::commands::init`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Error, Result};
use crate::store::StoreBackend;

/// Name of the trellis directory
pub const TRELLIS_DIR_NAME: &str = ".trellis";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the portfolio snapshot file
pub const SNAPSHOT_FILE_NAME: &str = "portfolio.jsonl";

/// Default maximum hierarchy depth
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Configuration file structure for trellis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrellisConfig {
    /// Hierarchy limits
    pub hierarchy: HierarchyConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

/// Hierarchy configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HierarchyConfig {
    /// Maximum workstream depth (roots are depth 1)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage backend type ("snapshot" for in-memory with JSONL persistence,
    /// "memory" for volatile)
    pub backend: String,

    /// Path to the snapshot file, relative to the portfolio root
    pub data_file: String,
}

impl StorageConfig {
    /// Resolve the configured backend against the portfolio root directory.
    pub fn to_backend(&self, root_dir: &Path) -> Result<StoreBackend> {
        match self.backend.as_str() {
            "memory" => Ok(StoreBackend::InMemory),
            "snapshot" => Ok(StoreBackend::Snapshot(root_dir.join(&self.data_file))),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{other}' (expected 'snapshot' or 'memory')"
            ))),
        }
    }
}

impl TrellisConfig {
    /// Create a new configuration with the given maximum depth
    pub fn new(max_depth: u32) -> Self {
        Self {
            hierarchy: HierarchyConfig { max_depth },
            storage: StorageConfig {
                backend: "snapshot".to_string(),
                data_file: format!("{TRELLIS_DIR_NAME}/{SNAPSHOT_FILE_NAME}"),
            },
        }
    }

    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Maximum workstream depth from the hierarchy section.
    pub fn max_depth(&self) -> u32 {
        self.hierarchy.max_depth
    }

    /// Absolute path of the snapshot file under the given root.
    pub fn data_path(&self, root_dir: &Path) -> PathBuf {
        root_dir.join(&self.storage.data_file)
    }
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_new() {
        let config = TrellisConfig::new(4);
        assert_eq!(config.hierarchy.max_depth, 4);
        assert_eq!(config.storage.backend, "snapshot");
        assert_eq!(config.storage.data_file, ".trellis/portfolio.jsonl");
    }

    #[test]
    fn test_config_default() {
        let config = TrellisConfig::default();
        assert_eq!(config.max_depth(), DEFAULT_MAX_DEPTH);
    }

    #[tokio::test]
    async fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let original = TrellisConfig::new(5);
        original.save(&config_path).await.unwrap();

        let loaded = TrellisConfig::load(&config_path).await.unwrap();
        assert_eq!(original, loaded);
    }

    #[tokio::test]
    async fn test_config_yaml_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let config = TrellisConfig::default();
        config.save(&config_path).await.unwrap();

        let content = tokio::fs::read_to_string(&config_path).await.unwrap();

        assert!(content.contains("max-depth: 3"));
        assert!(content.contains("backend: snapshot"));
        assert!(content.contains("data_file: .trellis/portfolio.jsonl"));
    }

    #[test]
    fn test_to_backend_snapshot() {
        let config = TrellisConfig::default();
        let backend = config.storage.to_backend(Path::new("/work")).unwrap();
        match backend {
            StoreBackend::Snapshot(path) => {
                assert_eq!(path, Path::new("/work/.trellis/portfolio.jsonl"));
            }
            StoreBackend::InMemory => panic!("expected snapshot backend"),
        }
    }

    #[test]
    fn test_to_backend_memory() {
        let mut config = TrellisConfig::default();
        config.storage.backend = "memory".to_string();
        let backend = config.storage.to_backend(Path::new("/work")).unwrap();
        assert!(matches!(backend, StoreBackend::InMemory));
    }

    #[test]
    fn test_to_backend_unknown() {
        let mut config = TrellisConfig::default();
        config.storage.backend = "postgres".to_string();
        let result = config.storage.to_backend(Path::new("/work"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
