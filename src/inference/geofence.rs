//! Geographic plausibility filtering for classification results.
//!
//! The geofence map ships with the model as a JSON object mapping species
//! labels to the ISO 3166-1 alpha-3 country codes they plausibly occur in.
//! Labels absent from the map are allowed everywhere.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Species label -> allowed country codes.
#[derive(Debug, Default)]
pub struct GeofenceMap {
    allowed: HashMap<String, HashSet<String>>,
}

impl GeofenceMap {
    /// Load the map from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let allowed: HashMap<String, HashSet<String>> =
            serde_json::from_str(&raw).map_err(|e| Error::GeofenceParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self { allowed })
    }

    /// Whether the map carries any rules at all.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Whether `label` is plausible in `country`.
    ///
    /// Unknown labels are plausible everywhere; an unknown country never
    /// rules a species out.
    pub fn is_plausible(&self, label: &str, country: &str) -> bool {
        self.allowed
            .get(label)
            .is_none_or(|countries| countries.contains(country))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_map() -> GeofenceMap {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"cervidae;odocoileus;virginianus;white-tailed deer": ["USA", "CAN"]}}"#
        )
        .unwrap();
        GeofenceMap::load(file.path()).unwrap()
    }

    #[test]
    fn test_listed_species_allowed_in_listed_country() {
        let map = sample_map();
        assert!(map.is_plausible(
            "cervidae;odocoileus;virginianus;white-tailed deer",
            "USA"
        ));
    }

    #[test]
    fn test_listed_species_blocked_elsewhere() {
        let map = sample_map();
        assert!(!map.is_plausible(
            "cervidae;odocoileus;virginianus;white-tailed deer",
            "FIN"
        ));
    }

    #[test]
    fn test_unlisted_species_allowed_everywhere() {
        let map = sample_map();
        assert!(map.is_plausible("felidae;lynx;lynx;eurasian lynx", "FIN"));
    }

    #[test]
    fn test_default_map_is_empty() {
        assert!(GeofenceMap::default().is_empty());
        assert!(!sample_map().is_empty());
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(GeofenceMap::load(file.path()).is_err());
    }
}
