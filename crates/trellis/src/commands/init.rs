//! Implementation of the `init` command.
//!
//! This module handles initialization of a new trellis portfolio, creating
//! the `.trellis/` directory structure with configuration and an empty
//! snapshot file.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::config::{TrellisConfig, CONFIG_FILE_NAME, SNAPSHOT_FILE_NAME, TRELLIS_DIR_NAME};
use crate::error::{Error, Result};

/// Name of the gitignore file within .trellis
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the portfolio root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created trellis directory
    pub trellis_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created snapshot file
    pub snapshot_file: PathBuf,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
    /// The configured maximum hierarchy depth
    pub max_depth: u32,
}

/// Validate a maximum-depth setting.
///
/// Depth 1 would allow roots only, which is still a usable (flat) portfolio,
/// so the floor is 1. The ceiling guards against configs that would make
/// depth arithmetic meaningless.
pub fn validate_max_depth(max_depth: u32) -> Result<()> {
    if max_depth == 0 {
        return Err(Error::Config(
            "Maximum depth must be at least 1".to_string(),
        ));
    }

    if max_depth > 64 {
        return Err(Error::Config(
            "Maximum depth cannot exceed 64".to_string(),
        ));
    }

    Ok(())
}

/// Initialize a new trellis portfolio in the given directory.
///
/// # Arguments
///
/// * `base_dir` - The base directory where `.trellis/` will be created
/// * `max_depth` - Optional hierarchy depth limit (defaults to 3)
///
/// # Errors
///
/// Returns an error if:
/// - The `.trellis/` directory already exists
/// - The depth limit is invalid
/// - File system operations fail
pub async fn init(base_dir: &Path, max_depth: Option<u32>) -> Result<InitResult> {
    let max_depth = max_depth.unwrap_or(crate::config::DEFAULT_MAX_DEPTH);

    validate_max_depth(max_depth)?;

    let trellis_dir = base_dir.join(TRELLIS_DIR_NAME);

    // Check if already initialized
    if trellis_dir.exists() {
        return Err(Error::Config(format!(
            "Trellis is already initialized in this directory. Found existing '{TRELLIS_DIR_NAME}'"
        )));
    }

    // Create the .trellis directory
    fs::create_dir_all(&trellis_dir).await?;

    // Create config.yaml
    let config_file = trellis_dir.join(CONFIG_FILE_NAME);
    let config = TrellisConfig::new(max_depth);
    config.save(&config_file).await?;

    // Create empty portfolio.jsonl
    let snapshot_file = trellis_dir.join(SNAPSHOT_FILE_NAME);
    fs::write(&snapshot_file, "").await?;

    // Create .gitignore inside .trellis
    let gitignore_file = trellis_dir.join(GITIGNORE_FILE_NAME);
    let gitignore_content = "\
# Trellis metadata files that should not be tracked
# The portfolio.jsonl file should be tracked for collaboration
*.tmp
";
    fs::write(&gitignore_file, gitignore_content).await?;

    Ok(InitResult {
        trellis_dir,
        config_file,
        snapshot_file,
        gitignore_file,
        max_depth,
    })
}

/// Check if a directory has been initialized with trellis.
///
/// Returns `true` if the `.trellis/` directory exists.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(TRELLIS_DIR_NAME).exists()
}

/// Find the portfolio root directory by searching up the directory tree.
///
/// Starts from the given directory and traverses parent directories until a
/// `.trellis/` directory is found, the filesystem root is reached, or the
/// maximum traversal depth is exceeded.
///
/// # Returns
///
/// Returns `Some(path)` with the directory containing `.trellis/`,
/// or `None` if no portfolio is found within the depth limit.
pub fn find_trellis_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(TRELLIS_DIR_NAME).exists() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    // ========== Depth Validation Tests ==========

    #[rstest]
    #[case::floor(1)]
    #[case::default(3)]
    #[case::deep(10)]
    #[case::ceiling(64)]
    fn test_validate_max_depth_valid(#[case] depth: u32) {
        assert!(validate_max_depth(depth).is_ok());
    }

    #[rstest]
    #[case::zero(0, "at least 1")]
    #[case::too_deep(65, "cannot exceed 64")]
    fn test_validate_max_depth_invalid(#[case] depth: u32, #[case] expected_error: &str) {
        let result = validate_max_depth(depth);
        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string().to_lowercase();
        assert!(
            err_msg.contains(&expected_error.to_lowercase()),
            "Expected error to contain '{}', got: '{}'",
            expected_error,
            err_msg
        );
    }

    // ========== Init Command Tests ==========

    #[tokio::test]
    async fn test_init_creates_directory_structure() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), None).await.unwrap();

        assert!(result.trellis_dir.exists());
        assert!(result.config_file.exists());
        assert!(result.snapshot_file.exists());
        assert!(result.gitignore_file.exists());
    }

    #[tokio::test]
    async fn test_init_with_custom_depth() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), Some(5)).await.unwrap();

        assert_eq!(result.max_depth, 5);

        let config = TrellisConfig::load(&result.config_file).await.unwrap();
        assert_eq!(config.max_depth(), 5);
    }

    #[tokio::test]
    async fn test_init_with_default_depth() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), None).await.unwrap();

        assert_eq!(result.max_depth, crate::config::DEFAULT_MAX_DEPTH);
    }

    #[tokio::test]
    async fn test_init_fails_if_already_initialized() {
        let temp_dir = TempDir::new().unwrap();

        init(temp_dir.path(), None).await.unwrap();

        let result = init(temp_dir.path(), None).await;
        assert!(result.is_err());

        let err_msg = result.unwrap_err().to_string().to_lowercase();
        assert!(err_msg.contains("already initialized"));
    }

    #[tokio::test]
    async fn test_init_fails_with_invalid_depth() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), Some(0)).await;
        assert!(result.is_err());

        let err_msg = result.unwrap_err().to_string().to_lowercase();
        assert!(err_msg.contains("at least 1"));
    }

    #[tokio::test]
    async fn test_init_creates_empty_snapshot_file() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), None).await.unwrap();

        let content = tokio::fs::read_to_string(&result.snapshot_file)
            .await
            .unwrap();
        assert!(content.is_empty());
    }

    // ========== Utility Function Tests ==========

    #[test]
    fn test_is_initialized_true() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(TRELLIS_DIR_NAME)).unwrap();

        assert!(is_initialized(temp_dir.path()));
    }

    #[test]
    fn test_is_initialized_false() {
        let temp_dir = TempDir::new().unwrap();

        assert!(!is_initialized(temp_dir.path()));
    }

    #[test]
    fn test_find_trellis_root_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(TRELLIS_DIR_NAME)).unwrap();

        let found = find_trellis_root(temp_dir.path());
        assert_eq!(found, Some(temp_dir.path().to_path_buf()));
    }

    #[test]
    fn test_find_trellis_root_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();

        std::fs::create_dir(temp_dir.path().join(TRELLIS_DIR_NAME)).unwrap();

        let sub_dir = temp_dir.path().join("sub").join("nested");
        std::fs::create_dir_all(&sub_dir).unwrap();

        let found = find_trellis_root(&sub_dir);
        assert_eq!(found, Some(temp_dir.path().to_path_buf()));
    }

    #[test]
    fn test_find_trellis_root_not_found() {
        let temp_dir = TempDir::new().unwrap();

        let found = find_trellis_root(temp_dir.path());
        assert!(found.is_none());
    }
}
