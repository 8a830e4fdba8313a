//! ONNX object detector (animal / human / vehicle).

use crate::constants::{categories, detector};
use crate::error::{Error, Result};
use image::RgbImage;
use image::imageops::FilterType;
use ndarray::{Array4, ArrayViewD};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

use super::Detection;

/// Detector category labels, indexed by class id.
const CATEGORIES: [&str; 3] = [categories::ANIMAL, categories::HUMAN, categories::VEHICLE];

/// Letterbox geometry: scale applied to the source and padding added on each
/// axis before the image is placed on the square input canvas.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Object detector over a single ONNX session.
pub struct Detector {
    session: Mutex<Session>,
    min_confidence: f32,
}

impl Detector {
    /// Load the detector session from an ONNX file.
    pub fn load(path: &Path) -> Result<Self> {
        let session = Session::builder()
            .and_then(|b| Ok(b.with_optimization_level(GraphOptimizationLevel::Level3)?))
            .and_then(|b| Ok(b.with_intra_threads(4)?))
            .and_then(|mut b| b.commit_from_file(path))
            .map_err(|e| Error::SessionBuild {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            session: Mutex::new(session),
            min_confidence: detector::DEFAULT_CONFIDENCE,
        })
    }

    /// Run detection on an image.
    ///
    /// Returns detections ordered by descending confidence with normalized
    /// `[x_min, y_min, width, height]` boxes in source coordinates.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        let (input, letterbox) = preprocess(image);

        let mut session = self.session.lock().map_err(|_| Error::Inference {
            reason: "detector session lock poisoned".to_string(),
        })?;

        let value = Value::from_array(input).map_err(|e| Error::Inference {
            reason: format!("detector input: {e}"),
        })?;
        let outputs = session
            .run(ort::inputs!["images" => value])
            .map_err(|e| Error::Inference {
                reason: format!("detector run: {e}"),
            })?;
        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| Error::Inference {
                reason: format!("detector output: {e}"),
            })?;

        Ok(decode_output(
            &output,
            image.width(),
            image.height(),
            letterbox,
            self.min_confidence,
        ))
    }
}

/// Letterbox the image onto a gray square canvas and build the NCHW tensor.
fn preprocess(image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let size = detector::INPUT_SIZE;
    let (w, h) = (image.width(), image.height());
    let scale = (size as f32 / w as f32).min(size as f32 / h as f32);
    let new_w = ((w as f32 * scale).round() as u32).max(1);
    let new_h = ((h as f32 * scale).round() as u32).max(1);
    let pad_x = (size - new_w) as f32 / 2.0;
    let pad_y = (size - new_h) as f32 / 2.0;

    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);

    // Gray padding, matching the detector's training-time letterbox.
    let mut input = Array4::<f32>::from_elem((1, 3, size as usize, size as usize), 114.0 / 255.0);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let tx = x as usize + pad_x as usize;
        let ty = y as usize + pad_y as usize;
        for c in 0..3 {
            input[[0, c, ty, tx]] = f32::from(pixel[c]) / 255.0;
        }
    }

    (input, Letterbox { scale, pad_x, pad_y })
}

/// Decode raw detector output `[1, N, 5 + C]` rows of
/// `[cx, cy, w, h, objectness, class scores...]` in letterboxed pixel space.
fn decode_output(
    output: &ArrayViewD<'_, f32>,
    orig_w: u32,
    orig_h: u32,
    letterbox: Letterbox,
    min_confidence: f32,
) -> Vec<Detection> {
    let mut detections = Vec::new();
    let shape = output.shape();
    if shape.len() != 3 || shape[2] < 5 + CATEGORIES.len() {
        return detections;
    }

    for row in 0..shape[1] {
        let objectness = output[[0, row, 4]];
        let (class_id, class_score) = (0..CATEGORIES.len())
            .map(|c| (c, output[[0, row, 5 + c]]))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        let conf = objectness * class_score;
        if conf < min_confidence {
            continue;
        }

        let cx = output[[0, row, 0]];
        let cy = output[[0, row, 1]];
        let bw = output[[0, row, 2]];
        let bh = output[[0, row, 3]];

        // Back from the letterboxed canvas into normalized source coordinates.
        let x_min = ((cx - bw / 2.0 - letterbox.pad_x) / letterbox.scale / orig_w as f32)
            .clamp(0.0, 1.0);
        let y_min = ((cy - bh / 2.0 - letterbox.pad_y) / letterbox.scale / orig_h as f32)
            .clamp(0.0, 1.0);
        let x_max = ((cx + bw / 2.0 - letterbox.pad_x) / letterbox.scale / orig_w as f32)
            .clamp(0.0, 1.0);
        let y_max = ((cy + bh / 2.0 - letterbox.pad_y) / letterbox.scale / orig_h as f32)
            .clamp(0.0, 1.0);
        if x_max <= x_min || y_max <= y_min {
            continue;
        }

        let category = CATEGORIES[class_id].to_string();
        detections.push(Detection {
            label: category.clone(),
            category,
            conf,
            bbox: [x_min, y_min, x_max - x_min, y_max - y_min],
        });
    }

    detections.sort_by(|a, b| b.conf.total_cmp(&a.conf));
    non_max_suppression(detections, detector::NMS_IOU)
}

/// Greedy per-category NMS over confidence-sorted detections.
fn non_max_suppression(sorted: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    let mut kept: Vec<Detection> = Vec::with_capacity(sorted.len());
    for candidate in sorted {
        let suppressed = kept.iter().any(|k| {
            k.category == candidate.category && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection-over-union of two `[x, y, w, h]` boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ax2 = a[0] + a[2];
    let ay2 = a[1] + a[3];
    let bx2 = b[0] + b[2];
    let by2 = b[1] + b[3];

    let ix = (ax2.min(bx2) - a[0].max(b[0])).max(0.0);
    let iy = (ay2.min(by2) - a[1].max(b[1])).max(0.0);
    let intersection = ix * iy;
    let union = a[2] * a[3] + b[2] * b[3] - intersection;
    if union <= 0.0 { 0.0 } else { intersection / union }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn det(category: &str, conf: f32, bbox: [f32; 4]) -> Detection {
        Detection {
            category: category.to_string(),
            label: category.to_string(),
            conf,
            bbox,
        }
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        assert_eq!(iou(&[0.0, 0.0, 0.2, 0.2], &[0.5, 0.5, 0.2, 0.2]), 0.0);
    }

    #[test]
    fn test_iou_identical_is_one() {
        let b = [0.1, 0.2, 0.3, 0.4];
        assert!((iou(&b, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlap_same_category() {
        let detections = vec![
            det("animal", 0.9, [0.1, 0.1, 0.4, 0.4]),
            det("animal", 0.8, [0.12, 0.12, 0.4, 0.4]),
            det("animal", 0.7, [0.6, 0.6, 0.2, 0.2]),
        ];
        let kept = non_max_suppression(detections, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].conf, 0.9);
        assert_eq!(kept[1].conf, 0.7);
    }

    #[test]
    fn test_nms_keeps_overlap_across_categories() {
        let detections = vec![
            det("animal", 0.9, [0.1, 0.1, 0.4, 0.4]),
            det("human", 0.8, [0.1, 0.1, 0.4, 0.4]),
        ];
        let kept = non_max_suppression(detections, 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_decode_output_maps_back_to_source_coords() {
        // 200x100 source letterboxed into a 1280 canvas: scale 6.4, pad_y 320.
        let letterbox = Letterbox {
            scale: 6.4,
            pad_x: 0.0,
            pad_y: 320.0,
        };
        // One row: centered box covering the middle half of the source.
        let mut raw = Array3::<f32>::zeros((1, 1, 8));
        raw[[0, 0, 0]] = 640.0; // cx
        raw[[0, 0, 1]] = 640.0; // cy
        raw[[0, 0, 2]] = 640.0; // w
        raw[[0, 0, 3]] = 320.0; // h
        raw[[0, 0, 4]] = 0.9; // objectness
        raw[[0, 0, 5]] = 1.0; // animal

        let decoded = decode_output(&raw.view().into_dyn(), 200, 100, letterbox, 0.1);
        assert_eq!(decoded.len(), 1);
        let bbox = decoded[0].bbox;
        assert!((bbox[0] - 0.25).abs() < 1e-3);
        assert!((bbox[1] - 0.25).abs() < 1e-3);
        assert!((bbox[2] - 0.5).abs() < 1e-3);
        assert!((bbox[3] - 0.5).abs() < 1e-3);
        assert_eq!(decoded[0].category, "animal");
    }

    #[test]
    fn test_decode_output_filters_low_confidence() {
        let letterbox = Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        let mut raw = Array3::<f32>::zeros((1, 1, 8));
        raw[[0, 0, 0]] = 100.0;
        raw[[0, 0, 1]] = 100.0;
        raw[[0, 0, 2]] = 50.0;
        raw[[0, 0, 3]] = 50.0;
        raw[[0, 0, 4]] = 0.05;
        raw[[0, 0, 5]] = 1.0;

        let decoded = decode_output(&raw.view().into_dyn(), 1280, 1280, letterbox, 0.1);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_preprocess_dimensions() {
        let image = RgbImage::new(640, 320);
        let (input, letterbox) = preprocess(&image);
        assert_eq!(input.shape(), &[1, 3, 1280, 1280]);
        assert!((letterbox.scale - 2.0).abs() < 1e-6);
        assert_eq!(letterbox.pad_x, 0.0);
        assert_eq!(letterbox.pad_y, 320.0);
    }
}
