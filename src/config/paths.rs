//! Platform-specific cache paths.

use crate::constants::{APP_NAME, MODELS_DIR_ENV};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the model weight cache directory.
///
/// The `CAMTRAP_MODELS_DIR` environment variable takes precedence; otherwise
/// the platform data directory is used:
///
/// - Linux: `~/.local/share/camtrap/models/`
/// - macOS: `~/Library/Application Support/camtrap/models/`
/// - Windows: `%APPDATA%\camtrap\data\models\`
pub fn models_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(MODELS_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("models"))
        .ok_or(Error::CacheDirNotFound)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, unsafe_code)]
mod tests {
    use super::*;
    use serial_test::serial;

    // std::env::set_var is unsafe in edition 2024; #[serial] keeps these
    // from racing other env-reading tests.

    #[test]
    #[serial]
    fn test_models_dir_env_override() {
        unsafe { std::env::set_var(MODELS_DIR_ENV, "/tmp/camtrap-models") };
        let dir = models_dir().unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/camtrap-models"));
        unsafe { std::env::remove_var(MODELS_DIR_ENV) };
    }

    #[test]
    #[serial]
    fn test_models_dir_platform_default() {
        unsafe { std::env::remove_var(MODELS_DIR_ENV) };
        let dir = models_dir().unwrap();
        assert!(dir.to_string_lossy().contains("camtrap"));
        assert!(dir.to_string_lossy().ends_with("models"));
    }
}
