//! Combination rules turning detector and classifier output into one
//! top-level prediction per image.

use crate::constants::{categories, detector};
use tracing::debug;

use super::classifier::display_name;
use super::geofence::GeofenceMap;
use super::{ImagePrediction, Instance};

/// Prediction-source tags reported to clients.
mod source {
    pub const DETECTOR: &str = "detector";
    pub const CLASSIFIER: &str = "classifier";
    pub const GEOFENCE: &str = "classifier+geofence";
}

/// Runtime options for the ensemble stage.
#[derive(Debug, Clone)]
pub struct EnsembleOptions {
    /// Whether geofencing is applied at all.
    pub geofence: bool,
    /// Detections below this confidence do not influence the top-level
    /// prediction (they are still reported).
    pub detector_threshold: f32,
}

impl Default for EnsembleOptions {
    fn default() -> Self {
        Self {
            geofence: true,
            detector_threshold: detector::DEFAULT_CONFIDENCE,
        }
    }
}

/// Resolves the final prediction for an image.
pub struct Ensemble {
    geofence_map: GeofenceMap,
    options: EnsembleOptions,
}

impl Ensemble {
    /// Build an ensemble over a geofence map.
    pub fn new(geofence_map: GeofenceMap, options: EnsembleOptions) -> Self {
        Self {
            geofence_map,
            options,
        }
    }

    /// Fill `prediction`/`prediction_score`/`prediction_source` on the given
    /// prediction.
    ///
    /// Rules, in order:
    /// 1. A confident human or vehicle detection decides the prediction.
    /// 2. No detection above the threshold means `blank`.
    /// 3. Otherwise the classifier's top class wins, rolled up to `animal`
    ///    when geofencing says the species is implausible for the instance's
    ///    country.
    ///
    /// When the classifier wins, animal detections are relabeled with the
    /// species' display name so annotated images carry readable labels.
    pub fn resolve(&self, prediction: &mut ImagePrediction, instance: &Instance) {
        let top = prediction.detections.first();
        let top_conf = top.map_or(0.0, |d| d.conf);

        if let Some(top) = top
            && top.category != categories::ANIMAL
            && top.conf >= detector::OVERRIDE_CONFIDENCE
        {
            prediction.prediction = Some(top.category.clone());
            prediction.prediction_score = Some(top.conf);
            prediction.prediction_source = Some(source::DETECTOR.to_string());
            return;
        }

        if top_conf < self.options.detector_threshold {
            prediction.prediction = Some(categories::BLANK.to_string());
            prediction.prediction_score = Some((1.0 - top_conf).clamp(0.0, 1.0));
            prediction.prediction_source = Some(source::DETECTOR.to_string());
            return;
        }

        let Some(classifications) = prediction.classifications.as_ref() else {
            // Classifier failed; fall back to the detector category.
            prediction.prediction = top.map(|d| d.category.clone());
            prediction.prediction_score = top.map(|d| d.conf);
            prediction.prediction_source = Some(source::DETECTOR.to_string());
            return;
        };

        let Some((label, score)) = classifications
            .classes
            .first()
            .cloned()
            .zip(classifications.scores.first().copied())
        else {
            prediction.prediction = Some(categories::ANIMAL.to_string());
            prediction.prediction_score = Some(top_conf);
            prediction.prediction_source = Some(source::DETECTOR.to_string());
            return;
        };

        if self.options.geofence
            && let Some(country) = instance.country.as_deref()
            && !self.geofence_map.is_plausible(&label, country)
        {
            debug!("geofence rollup: '{label}' implausible in {country}");
            prediction.prediction = Some(categories::ANIMAL.to_string());
            prediction.prediction_score = Some(score);
            prediction.prediction_source = Some(source::GEOFENCE.to_string());
            return;
        }

        let species = display_name(&label).to_string();
        for detection in prediction
            .detections
            .iter_mut()
            .filter(|d| d.category == categories::ANIMAL)
        {
            detection.label = species.clone();
        }

        prediction.prediction = Some(label);
        prediction.prediction_score = Some(score);
        prediction.prediction_source = Some(source::CLASSIFIER.to_string());
    }
}
