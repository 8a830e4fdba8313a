//! CLI argument definitions.

use crate::constants::{DEFAULT_MODEL, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, annotation, detector};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

/// Camera trap wildlife detection server with annotated image output.
#[derive(Debug, Parser)]
#[command(name = "camtrap")]
#[command(author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Port to run the server on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "CAMTRAP_PORT")]
    pub port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0", env = "CAMTRAP_HOST")]
    pub host: IpAddr,

    /// Timeout (in seconds) for requests.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "CAMTRAP_TIMEOUT")]
    pub timeout: u64,

    /// Model to load, by registry identifier.
    #[arg(short, long, default_value = DEFAULT_MODEL, env = "CAMTRAP_MODEL")]
    pub model: String,

    /// Whether to enable geofencing or not.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "CAMTRAP_GEOFENCE")]
    pub geofence: bool,

    /// Whether to save annotated images with bounding boxes.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "CAMTRAP_SAVE_ANNOTATED")]
    pub save_annotated: bool,

    /// Comma-separated list of extra fields to propagate from request to response.
    #[arg(long, value_delimiter = ',', env = "CAMTRAP_EXTRA_FIELDS")]
    pub extra_fields: Vec<String>,

    /// Minimum detector confidence for a detection to be reported.
    #[arg(long, value_parser = parse_confidence, default_value_t = detector::DEFAULT_CONFIDENCE,
          env = "CAMTRAP_DETECTOR_THRESHOLD")]
    pub detector_threshold: f32,

    /// Minimum confidence for a detection to be drawn on annotated images.
    #[arg(long, value_parser = parse_confidence,
          default_value_t = annotation::DEFAULT_MIN_CONFIDENCE,
          env = "CAMTRAP_ANNOTATION_THRESHOLD")]
    pub annotation_threshold: f32,

    /// Suffix inserted before the extension of annotated image filenames.
    #[arg(long, default_value = annotation::DEFAULT_SUFFIX, env = "CAMTRAP_ANNOTATION_SUFFIX")]
    pub annotation_suffix: String,

    /// Path to a TTF font used for annotation labels.
    #[arg(long, env = "CAMTRAP_FONT")]
    pub font: Option<PathBuf>,

    /// Suppress progress output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: full trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse and validate confidence value.
fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(crate::constants::confidence::MIN..=crate::constants::confidence::MAX).contains(&value) {
        return Err(format!(
            "confidence must be between 0.0 and 1.0, got {value}"
        ));
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confidence_valid() {
        assert_eq!(parse_confidence("0.5").ok(), Some(0.5));
        assert_eq!(parse_confidence("0.0").ok(), Some(0.0));
        assert_eq!(parse_confidence("1.0").ok(), Some(1.0));
    }

    #[test]
    fn test_parse_confidence_invalid() {
        assert!(parse_confidence("1.5").is_err());
        assert!(parse_confidence("-0.1").is_err());
        assert!(parse_confidence("abc").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["camtrap"]).unwrap();
        assert_eq!(cli.port, 8000);
        assert_eq!(cli.timeout, 30);
        assert!(cli.geofence);
        assert!(cli.save_annotated);
        assert_eq!(cli.annotation_suffix, "_annotated");
    }

    #[test]
    fn test_cli_disable_annotation() {
        let cli = Cli::try_parse_from(["camtrap", "--save-annotated", "false"]).unwrap();
        assert!(!cli.save_annotated);
    }

    #[test]
    fn test_cli_disable_geofence() {
        let cli = Cli::try_parse_from(["camtrap", "--geofence=false"]).unwrap();
        assert!(!cli.geofence);
    }

    #[test]
    fn test_cli_extra_fields_comma_separated() {
        let cli =
            Cli::try_parse_from(["camtrap", "--extra-fields", "deployment_id,camera_id"]).unwrap();
        assert_eq!(cli.extra_fields, vec!["deployment_id", "camera_id"]);
    }

    #[test]
    fn test_cli_thresholds() {
        let cli = Cli::try_parse_from([
            "camtrap",
            "--detector-threshold",
            "0.2",
            "--annotation-threshold",
            "0.6",
        ])
        .unwrap();
        assert_eq!(cli.detector_threshold, 0.2);
        assert_eq!(cli.annotation_threshold, 0.6);
    }

    #[test]
    fn test_cli_rejects_bad_threshold() {
        let cli = Cli::try_parse_from(["camtrap", "--detector-threshold", "1.5"]);
        assert!(cli.is_err());
    }
}
