//! Model registry for discovering and installing model weights.

pub mod installer;
pub mod types;

pub use installer::{download_file, ensure_model};
pub use types::{ComponentFiles, FileInfo, ModelEntry, Registry};

use crate::error::{Error, Result};

/// Parse the bundled registry.
pub fn load_registry() -> Result<Registry> {
    const BUNDLED_REGISTRY: &str = include_str!("../../registry.json");

    serde_json::from_str(BUNDLED_REGISTRY).map_err(|e| Error::RegistryParse { source: e })
}

/// Find a model entry by ID.
pub fn find_model<'a>(registry: &'a Registry, id: &str) -> Option<&'a ModelEntry> {
    registry.models.iter().find(|m| m.id == id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_registry_parses() {
        let registry = load_registry().unwrap();
        assert_eq!(registry.schema_version, "1.0");
        assert!(find_model(&registry, crate::constants::DEFAULT_MODEL).is_some());
    }

    #[test]
    fn test_find_model_missing() {
        let registry = load_registry().unwrap();
        assert!(find_model(&registry, "no-such-model").is_none());
    }
}
