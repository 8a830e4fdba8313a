//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for cache directories and user-facing messages.
pub const APP_NAME: &str = "camtrap";

/// Default listen port for the prediction server.
pub const DEFAULT_PORT: u16 = 8000;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default model identifier resolved against the registry.
pub const DEFAULT_MODEL: &str = "speciesnet-v4";

/// URL path for the prediction endpoint.
pub const PREDICT_PATH: &str = "/predict";

/// Environment variable overriding the model weight cache directory.
pub const MODELS_DIR_ENV: &str = "CAMTRAP_MODELS_DIR";

/// Environment variable naming a TTF font for annotation labels.
pub const FONT_ENV: &str = "CAMTRAP_FONT";

/// Detector confidence defaults.
pub mod detector {
    /// Minimum confidence for a detection to be reported at all.
    pub const DEFAULT_CONFIDENCE: f32 = 0.01;

    /// Confidence above which a human or vehicle detection decides the
    /// top-level prediction on its own.
    pub const OVERRIDE_CONFIDENCE: f32 = 0.7;

    /// IoU threshold for non-maximum suppression.
    pub const NMS_IOU: f32 = 0.45;

    /// Square input edge the detector expects.
    pub const INPUT_SIZE: u32 = 1280;
}

/// Classifier defaults.
pub mod classifier {
    /// Number of top classes reported per image.
    pub const TOP_K: usize = 5;

    /// Square input edge the classifier expects.
    pub const INPUT_SIZE: u32 = 480;
}

/// Annotation drawing policy defaults.
pub mod annotation {
    /// Suffix inserted before the file extension of annotated copies.
    pub const DEFAULT_SUFFIX: &str = "_annotated";

    /// Detections below this confidence are not drawn. Zero draws everything.
    pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.0;

    /// JPEG quality for re-encoded annotated images.
    pub const JPEG_QUALITY: u8 = 90;

    /// Image edge length per pixel of box line thickness.
    pub const PIXELS_PER_THICKNESS: u32 = 400;

    /// Minimum box line thickness in pixels.
    pub const MIN_THICKNESS: u32 = 2;

    /// Image edge length per pixel of label font height.
    pub const PIXELS_PER_FONT_PX: u32 = 40;

    /// Minimum label font height in pixels.
    pub const MIN_FONT_PX: f32 = 12.0;
}

/// Pipeline category labels shared by detector and ensemble.
pub mod categories {
    /// Animal detection category.
    pub const ANIMAL: &str = "animal";
    /// Human detection category.
    pub const HUMAN: &str = "human";
    /// Vehicle detection category.
    pub const VEHICLE: &str = "vehicle";
    /// Prediction used when nothing is detected.
    pub const BLANK: &str = "blank";
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
}
