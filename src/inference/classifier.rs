//! ONNX species classifier.

use crate::constants::classifier;
use crate::error::{Error, Result};
use image::RgbImage;
use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

use super::Classifications;

/// Species classifier over a single ONNX session.
pub struct Classifier {
    session: Mutex<Session>,
    labels: Vec<String>,
    top_k: usize,
}

impl Classifier {
    /// Load the classifier session and its labels file (one label per line).
    pub fn load(model_path: &Path, labels_path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(labels_path).map_err(|e| Error::LabelsRead {
            path: labels_path.to_path_buf(),
            source: e,
        })?;
        let labels: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();

        let session = Session::builder()
            .and_then(|b| Ok(b.with_optimization_level(GraphOptimizationLevel::Level3)?))
            .and_then(|b| Ok(b.with_intra_threads(4)?))
            .and_then(|mut b| b.commit_from_file(model_path))
            .map_err(|e| Error::SessionBuild {
                path: model_path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            session: Mutex::new(session),
            labels,
            top_k: classifier::TOP_K,
        })
    }

    /// Classify the full image, returning the top classes with scores.
    pub fn classify(&self, image: &RgbImage) -> Result<Classifications> {
        let input = preprocess(image);

        let mut session = self.session.lock().map_err(|_| Error::Inference {
            reason: "classifier session lock poisoned".to_string(),
        })?;

        let value = Value::from_array(input).map_err(|e| Error::Inference {
            reason: format!("classifier input: {e}"),
        })?;
        let outputs = session
            .run(ort::inputs!["input" => value])
            .map_err(|e| Error::Inference {
                reason: format!("classifier run: {e}"),
            })?;
        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| Error::Inference {
                reason: format!("classifier output: {e}"),
            })?;

        let logits: Vec<f32> = output.iter().copied().collect();
        Ok(top_k_classes(&logits, &self.labels, self.top_k))
    }
}

/// Resize (squash) to the classifier input square and build the NCHW tensor.
fn preprocess(image: &RgbImage) -> Array4<f32> {
    let size = classifier::INPUT_SIZE;
    let resized = image::imageops::resize(image, size, size, FilterType::Triangle);

    let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = f32::from(pixel[c]) / 255.0;
        }
    }
    input
}

/// Softmax the logits and pick the top-k labels.
fn top_k_classes(logits: &[f32], labels: &[String], k: usize) -> Classifications {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max_logit).exp()).collect();
    let sum: f32 = exps.iter().sum();

    let mut indexed: Vec<(usize, f32)> = exps
        .iter()
        .map(|e| if sum > 0.0 { e / sum } else { 0.0 })
        .enumerate()
        .collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed.truncate(k);

    let mut classifications = Classifications::default();
    for (index, score) in indexed {
        let label = labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class_{index}"));
        classifications.classes.push(label);
        classifications.scores.push(score);
    }
    classifications
}

/// Human-readable name from a taxonomy label.
///
/// Labels are semicolon-separated taxonomy strings ending in a common name
/// (`...;genus;species;common name`); plain labels pass through unchanged.
pub fn display_name(label: &str) -> &str {
    label
        .rsplit(';')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .unwrap_or(label)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_orders_by_score() {
        let labels: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
        let result = top_k_classes(&[0.0, 2.0, 1.0], &labels, 2);
        assert_eq!(result.classes, vec!["b", "c"]);
        assert_eq!(result.scores.len(), 2);
        assert!(result.scores[0] > result.scores[1]);
    }

    #[test]
    fn test_top_k_scores_sum_below_one() {
        let labels: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
        let result = top_k_classes(&[1.0, 1.0, 1.0], &labels, 3);
        let sum: f32 = result.scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_display_name_taxonomy_label() {
        assert_eq!(
            display_name("mammalia;cervidae;odocoileus;virginianus;white-tailed deer"),
            "white-tailed deer"
        );
    }

    #[test]
    fn test_display_name_plain_label() {
        assert_eq!(display_name("deer"), "deer");
    }

    #[test]
    fn test_display_name_trailing_separator() {
        assert_eq!(display_name("a;b;"), "b");
    }
}
