//! Runtime configuration assembled from CLI flags.

use crate::cli::Cli;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved server configuration.
///
/// The server is flag/environment driven; there is no configuration file.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Registry identifier of the model to load.
    pub model: String,
    /// Whether geofencing is enabled.
    pub geofence: bool,
    /// Whether annotated images are saved.
    pub save_annotated: bool,
    /// Extra request fields propagated to predictions.
    pub extra_fields: Vec<String>,
    /// Minimum detector confidence for reported detections.
    pub detector_threshold: f32,
    /// Minimum confidence for drawn detections.
    pub annotation_threshold: f32,
    /// Suffix for annotated filenames.
    pub annotation_suffix: String,
    /// Optional label font path.
    pub font: Option<PathBuf>,
}

impl ServerConfig {
    /// Build the runtime configuration from parsed CLI flags.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            timeout: Duration::from_secs(cli.timeout),
            model: cli.model.clone(),
            geofence: cli.geofence,
            save_annotated: cli.save_annotated,
            extra_fields: cli.extra_fields.clone(),
            detector_threshold: cli.detector_threshold,
            annotation_threshold: cli.annotation_threshold,
            annotation_suffix: cli.annotation_suffix.clone(),
            font: cli.font.clone(),
        }
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_cli_roundtrip() {
        let cli = Cli::try_parse_from([
            "camtrap",
            "--port",
            "9090",
            "--timeout",
            "5",
            "--geofence=false",
        ])
        .unwrap();
        let config = ServerConfig::from_cli(&cli);
        assert_eq!(config.port, 9090);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.geofence);
        assert_eq!(config.bind_addr().port(), 9090);
    }
}
