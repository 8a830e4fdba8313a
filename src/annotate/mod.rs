//! Bounding-box annotation of source images.
//!
//! The annotator is the one non-trivial piece of this server: given an image
//! and its detections it draws rectangles and labels onto a copy and writes
//! the copy next to the original under a derived filename. It holds no
//! cross-request state, never mutates the source file, and performs exactly
//! one file write per call, so concurrent calls for different images need no
//! coordination.

pub mod font;

use crate::constants::{annotation, categories};
use crate::error::{Error, Result};
use crate::inference::Detection;
use ab_glyph::{FontArc, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options controlling the drawing policy.
#[derive(Debug, Clone)]
pub struct AnnotatorOptions {
    /// Detections below this confidence are not drawn. Zero draws all.
    pub min_confidence: f32,
    /// Suffix inserted before the file extension of the annotated copy.
    pub suffix: String,
    /// Explicit label font path; system locations are probed otherwise.
    pub font: Option<PathBuf>,
}

impl Default for AnnotatorOptions {
    fn default() -> Self {
        Self {
            min_confidence: annotation::DEFAULT_MIN_CONFIDENCE,
            suffix: annotation::DEFAULT_SUFFIX.to_string(),
            font: None,
        }
    }
}

/// Draws detections onto copies of source images.
pub struct Annotator {
    min_confidence: f32,
    suffix: String,
    font: Option<FontArc>,
}

impl Annotator {
    /// Build an annotator, resolving the label font once up front.
    pub fn new(options: AnnotatorOptions) -> Self {
        Self {
            min_confidence: options.min_confidence,
            suffix: options.suffix,
            font: font::resolve(options.font.as_deref()),
        }
    }

    /// Derived output path for a source image.
    ///
    /// This is a pure function of the source path and the configured suffix:
    /// the suffix is inserted before the extension, in the same directory
    /// (`/a/b.jpg` -> `/a/b_annotated.jpg`).
    pub fn annotated_path(&self, source: &Path) -> PathBuf {
        derive_path(source, &self.suffix)
    }

    /// Draw `detections` onto a copy of `source` and write it to the derived
    /// path.
    ///
    /// Boxes are drawn in the order given, so later overlaps paint over
    /// earlier ones. Out-of-bounds coordinates are clamped; malformed
    /// detections are skipped with a warning; detections below the confidence
    /// threshold are not drawn. An empty detection list still writes a copy.
    /// The source file itself is never mutated.
    pub fn annotate(&self, source: &Path, detections: &[Detection]) -> Result<PathBuf> {
        let mut image = image::open(source)
            .map_err(|e| Error::ImageDecode {
                path: source.to_path_buf(),
                source: e,
            })?
            .to_rgb8();

        let thickness = line_thickness(&image);
        let font_px = font_height(&image);

        for detection in detections {
            if detection.conf < self.min_confidence {
                debug!(
                    "skipping {} ({:.2} below annotation threshold {:.2})",
                    detection.label, detection.conf, self.min_confidence
                );
                continue;
            }
            if !detection.is_well_formed() {
                warn!(
                    "skipping malformed detection on {}: bbox {:?}",
                    source.display(),
                    detection.bbox
                );
                continue;
            }
            self.draw_detection(&mut image, detection, thickness, font_px);
        }

        let output = self.annotated_path(source);
        write_image(&image, &output)?;
        Ok(output)
    }

    /// Draw one box plus its label onto the image.
    fn draw_detection(&self, image: &mut RgbImage, detection: &Detection, thickness: u32, font_px: f32) {
        let (w, h) = (image.width(), image.height());
        let Some(rect) = clamp_box(&detection.bbox, w, h) else {
            return;
        };
        let color = category_color(&detection.category);

        // Inset rings build up the line thickness without leaving the box.
        for inset in 0..thickness as i32 {
            let rw = rect.width().saturating_sub(2 * inset as u32);
            let rh = rect.height().saturating_sub(2 * inset as u32);
            if rw == 0 || rh == 0 {
                break;
            }
            let ring = Rect::at(rect.left() + inset, rect.top() + inset).of_size(rw, rh);
            draw_hollow_rect_mut(image, ring, color);
        }

        if let Some(font) = &self.font {
            self.draw_label(image, detection, rect, color, font, font_px);
        }
    }

    /// Render `label confidence` on a filled strip above the box (inside the
    /// image when the box touches the top edge).
    fn draw_label(
        &self,
        image: &mut RgbImage,
        detection: &Detection,
        rect: Rect,
        color: Rgb<u8>,
        font: &FontArc,
        font_px: f32,
    ) {
        let text = format!("{} {:.2}", detection.label, detection.conf);
        let scale = PxScale::from(font_px);
        let (text_w, text_h) = text_size(scale, font, &text);

        let strip_h = text_h + 4;
        let label_x = rect.left().max(0);
        let label_y = (rect.top() - strip_h as i32).max(0);
        let max_w = (image.width() as i32 - label_x).max(0) as u32;
        let strip_w = (text_w + 4).min(max_w);
        if strip_w == 0 {
            return;
        }

        draw_filled_rect_mut(
            image,
            Rect::at(label_x, label_y).of_size(strip_w, strip_h),
            color,
        );
        draw_text_mut(
            image,
            Rgb([255, 255, 255]),
            label_x + 2,
            label_y + 2,
            scale,
            font,
            &text,
        );
    }
}

/// Insert `suffix` before the extension of `path`.
pub fn derive_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().into_owned());
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

/// Clamp a normalized `[x, y, w, h]` box to image bounds.
///
/// Returns `None` when nothing of the box remains inside the image.
fn clamp_box(bbox: &[f32; 4], width: u32, height: u32) -> Option<Rect> {
    let (w, h) = (width as f32, height as f32);
    let x_min = (bbox[0] * w).floor().clamp(0.0, w - 1.0) as i32;
    let y_min = (bbox[1] * h).floor().clamp(0.0, h - 1.0) as i32;
    let x_max = ((bbox[0] + bbox[2]) * w).ceil().clamp(0.0, w - 1.0) as i32;
    let y_max = ((bbox[1] + bbox[3]) * h).ceil().clamp(0.0, h - 1.0) as i32;

    if x_max <= x_min || y_max <= y_min {
        return None;
    }
    Some(Rect::at(x_min, y_min).of_size((x_max - x_min) as u32, (y_max - y_min) as u32))
}

/// Box line thickness scaled to the image resolution.
fn line_thickness(image: &RgbImage) -> u32 {
    let edge = image.width().min(image.height());
    (edge / annotation::PIXELS_PER_THICKNESS).max(annotation::MIN_THICKNESS)
}

/// Label font height scaled to the image resolution.
fn font_height(image: &RgbImage) -> f32 {
    let edge = image.width().min(image.height());
    ((edge / annotation::PIXELS_PER_FONT_PX) as f32).max(annotation::MIN_FONT_PX)
}

/// Box color by detection category.
fn category_color(category: &str) -> Rgb<u8> {
    match category {
        categories::ANIMAL => Rgb([220, 47, 47]),
        categories::HUMAN => Rgb([47, 86, 220]),
        categories::VEHICLE => Rgb([220, 180, 47]),
        _ => Rgb([128, 128, 128]),
    }
}

/// Write the composited image, re-encoding JPEG at the configured quality.
///
/// The writer is flushed explicitly so that late I/O errors (a full disk,
/// most commonly) reach the caller instead of being dropped with the buffer.
fn write_image(image: &RgbImage, path: &Path) -> Result<()> {
    let io_err = |e: std::io::Error| Error::ImageWrite {
        path: path.to_path_buf(),
        source: image::ImageError::IoError(e),
    };
    let encode_err = |e: image::ImageError| Error::ImageWrite {
        path: path.to_path_buf(),
        source: e,
    };

    let is_jpeg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    if is_jpeg {
        JpegEncoder::new_with_quality(&mut writer, annotation::JPEG_QUALITY)
            .encode_image(image)
            .map_err(encode_err)?;
    } else {
        let format = ImageFormat::from_path(path).map_err(encode_err)?;
        image.write_to(&mut writer, format).map_err(encode_err)?;
    }

    writer.flush().map_err(io_err)
}
