//! Wildlife detection and classification pipeline.
//!
//! The model itself is an external collaborator: the server only depends on
//! the [`Predictor`] seam, and [`OnnxPredictor`] is the shipped implementation
//! backed by pretrained ONNX sessions.

mod classifier;
mod detector;
mod ensemble;
pub mod geofence;

pub use classifier::{Classifier, display_name};
pub use detector::Detector;
pub use ensemble::{Ensemble, EnsembleOptions};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// One request instance: an image on disk plus optional location context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Path to the image file.
    pub filepath: String,
    /// ISO 3166-1 alpha-3 country code for geofencing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// First-level administrative region (used with `country`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin1_region: Option<String>,
    /// Recording latitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Recording longitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Any extra fields the client sent; propagated on request.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One detected object in an image.
///
/// The bounding box is normalized `[x_min, y_min, width, height]` with the
/// origin at the top-left corner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Detection category (`animal`, `human`, `vehicle`).
    pub category: String,
    /// Human-readable label drawn on annotated images.
    pub label: String,
    /// Detector confidence in `[0, 1]`.
    pub conf: f32,
    /// Normalized `[x_min, y_min, width, height]`.
    pub bbox: [f32; 4],
}

impl Detection {
    /// Whether all bbox values are finite and the box has positive area.
    ///
    /// Malformed detections are skipped (with a warning) rather than aborting
    /// the whole image's annotation.
    pub fn is_well_formed(&self) -> bool {
        self.bbox.iter().all(|v| v.is_finite()) && self.bbox[2] > 0.0 && self.bbox[3] > 0.0
    }
}

/// Classifier output: top classes with aligned scores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Classifications {
    /// Class labels, best first.
    pub classes: Vec<String>,
    /// Scores aligned with `classes`.
    pub scores: Vec<f32>,
}

/// Full prediction for one image, as returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePrediction {
    /// Path to the source image.
    pub filepath: String,
    /// Top-level prediction label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    /// Score of the top-level prediction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_score: Option<f32>,
    /// Which pipeline stage produced the top-level prediction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_source: Option<String>,
    /// Detections ordered by descending confidence.
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// Classifier output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifications: Option<Classifications>,
    /// Path of the saved annotated copy, when annotation is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_filepath: Option<String>,
    /// Model version string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Per-instance failures; never aborts the batch.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<String>,
    /// Extra fields propagated from the request instance.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ImagePrediction {
    /// An empty prediction shell for the given source path.
    pub fn for_filepath(filepath: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            prediction: None,
            prediction_score: None,
            prediction_source: None,
            detections: Vec::new(),
            classifications: None,
            annotated_filepath: None,
            model_version: None,
            failures: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// The seam between the server and the external model pipeline.
///
/// Implementations must be shareable across request handlers; per-instance
/// failures are recorded on the returned prediction, never raised.
pub trait Predictor: Send + Sync {
    /// Predict one instance.
    fn predict(&self, instance: &Instance) -> ImagePrediction;

    /// Version string reported in predictions.
    fn model_version(&self) -> &str;
}

/// Paths to the files one model is made of.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    /// Object detector ONNX file.
    pub detector: PathBuf,
    /// Species classifier ONNX file.
    pub classifier: PathBuf,
    /// Classifier labels file.
    pub labels: PathBuf,
    /// Optional geofence map.
    pub geofence: Option<PathBuf>,
}

/// ONNX-backed implementation of [`Predictor`].
pub struct OnnxPredictor {
    detector: Detector,
    classifier: Classifier,
    ensemble: Ensemble,
    version: String,
}

impl OnnxPredictor {
    /// Load detector and classifier sessions and assemble the pipeline.
    pub fn load(files: &ModelFiles, version: &str, options: EnsembleOptions) -> Result<Self> {
        let detector = Detector::load(&files.detector)?;
        let classifier = Classifier::load(&files.classifier, &files.labels)?;
        let geofence = match &files.geofence {
            Some(path) => geofence::GeofenceMap::load(path)?,
            None => geofence::GeofenceMap::default(),
        };
        if options.geofence && geofence.is_empty() {
            warn!("geofence enabled but the model ships no geofence map; geofencing is a no-op");
        }
        let ensemble = Ensemble::new(geofence, options);

        Ok(Self {
            detector,
            classifier,
            ensemble,
            version: version.to_string(),
        })
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, instance: &Instance) -> ImagePrediction {
        let mut prediction = ImagePrediction::for_filepath(&instance.filepath);
        prediction.model_version = Some(self.version.clone());

        let image = match image::open(&instance.filepath) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                warn!("failed to decode {}: {e}", instance.filepath);
                prediction.failures.push("IMAGE_DECODE".to_string());
                return prediction;
            }
        };

        match self.detector.detect(&image) {
            Ok(detections) => prediction.detections = detections,
            Err(e) => {
                warn!("detector failed on {}: {e}", instance.filepath);
                prediction.failures.push("DETECTOR".to_string());
            }
        }

        match self.classifier.classify(&image) {
            Ok(classifications) => prediction.classifications = Some(classifications),
            Err(e) => {
                warn!("classifier failed on {}: {e}", instance.filepath);
                prediction.failures.push("CLASSIFIER".to_string());
            }
        }

        self.ensemble.resolve(&mut prediction, instance);
        prediction
    }

    fn model_version(&self) -> &str {
        &self.version
    }
}
