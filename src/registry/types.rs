//! Data structures for the model registry.

use serde::{Deserialize, Serialize};

/// Registry schema version and model entries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Registry {
    /// Schema version string (e.g., "1.0").
    pub schema_version: String,
    /// List of available models.
    pub models: Vec<ModelEntry>,
}

/// Single model entry in the registry.
///
/// A model is a bundle of components: a detector network, a species
/// classifier, its label list, and an optional geofence map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelEntry {
    /// Unique identifier (kebab-case).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Organization/author.
    pub vendor: String,
    /// Model version string, echoed in prediction output.
    pub version: String,
    /// License information.
    pub license: LicenseInfo,
    /// Component file information.
    pub files: ComponentFiles,
}

/// License information for a model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LicenseInfo {
    /// SPDX license identifier.
    #[serde(rename = "type")]
    pub r#type: String,
    /// URL to full license text.
    pub url: String,
}

/// Download information for every component of a model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ComponentFiles {
    /// Object detector network.
    pub detector: FileInfo,
    /// Species classifier network.
    pub classifier: FileInfo,
    /// Classifier label list, one label per line.
    pub labels: FileInfo,
    /// Geofence map restricting labels by country.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geofence: Option<FileInfo>,
}

/// Single file download information.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileInfo {
    /// Direct download URL.
    pub url: String,
    /// Local filename after download.
    pub filename: String,
    /// Optional SHA256 checksum for verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}
