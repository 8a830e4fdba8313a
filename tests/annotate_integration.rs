//! Integration tests for annotated image output.

use camtrap::annotate::{Annotator, AnnotatorOptions, derive_path};
use camtrap::inference::Detection;
use image::{Rgb, RgbImage};
use std::path::Path;

fn detection(conf: f32, bbox: [f32; 4]) -> Detection {
    Detection {
        category: "animal".to_string(),
        label: "red fox".to_string(),
        conf,
        bbox,
    }
}

fn checkerboard(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([200, 200, 200])
        } else {
            Rgb([40, 40, 40])
        }
    })
}

#[test]
fn empty_detections_produce_identical_copy() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("trap.png");
    let original = checkerboard(96, 64);
    original.save(&source).unwrap();

    let annotator = Annotator::new(AnnotatorOptions::default());
    let out = annotator.annotate(&source, &[]).unwrap();

    assert_eq!(out, dir.path().join("trap_annotated.png"));
    let copied = image::open(&out).unwrap().to_rgb8();
    assert_eq!(copied.as_raw(), original.as_raw());
}

#[test]
fn detections_change_the_output_image() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("trap.png");
    let original = checkerboard(96, 64);
    original.save(&source).unwrap();

    let annotator = Annotator::new(AnnotatorOptions::default());
    let out = annotator
        .annotate(&source, &[detection(0.85, [0.1, 0.1, 0.6, 0.6])])
        .unwrap();

    let drawn = image::open(&out).unwrap().to_rgb8();
    assert_ne!(drawn.as_raw(), original.as_raw());

    // The source image itself is untouched.
    let untouched = image::open(&source).unwrap().to_rgb8();
    assert_eq!(untouched.as_raw(), original.as_raw());
}

#[test]
fn repeated_annotation_overwrites_the_same_path() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("trap.png");
    checkerboard(48, 48).save(&source).unwrap();

    let annotator = Annotator::new(AnnotatorOptions::default());
    let first = annotator.annotate(&source, &[]).unwrap();
    let second = annotator
        .annotate(&source, &[detection(0.9, [0.2, 0.2, 0.5, 0.5])])
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn custom_suffix_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("trap.png");
    checkerboard(32, 32).save(&source).unwrap();

    let annotator = Annotator::new(AnnotatorOptions {
        suffix: "_boxed".to_string(),
        ..AnnotatorOptions::default()
    });
    let out = annotator.annotate(&source, &[]).unwrap();

    assert_eq!(out, dir.path().join("trap_boxed.png"));
}

#[test]
fn derived_path_stays_in_source_directory() {
    let out = derive_path(Path::new("/data/cameras/site-3/IMG_0042.JPG"), "_annotated");
    assert_eq!(
        out,
        Path::new("/data/cameras/site-3/IMG_0042_annotated.JPG")
    );
}

#[test]
fn out_of_bounds_boxes_are_clamped_not_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("trap.png");
    let original = checkerboard(64, 64);
    original.save(&source).unwrap();

    let annotator = Annotator::new(AnnotatorOptions::default());
    let out = annotator
        .annotate(&source, &[detection(0.9, [-0.5, -0.5, 2.0, 2.0])])
        .unwrap();

    // The clamped box is drawn: edge pixels change.
    let drawn = image::open(&out).unwrap().to_rgb8();
    assert_ne!(drawn.as_raw(), original.as_raw());
}

#[test]
fn jpeg_output_is_reencoded() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("trap.jpg");
    checkerboard(64, 64).save(&source).unwrap();

    let annotator = Annotator::new(AnnotatorOptions::default());
    let out = annotator
        .annotate(&source, &[detection(0.9, [0.25, 0.25, 0.5, 0.5])])
        .unwrap();

    assert_eq!(out.extension().unwrap(), "jpg");
    assert!(image::open(&out).is_ok());
}
