//! Error types for camtrap.

/// Result type alias for camtrap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for camtrap.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model cache directory could not be determined.
    #[error("could not determine model cache directory for this platform")]
    CacheDirNotFound,

    /// Bundled model registry failed to parse.
    #[error("failed to parse model registry")]
    RegistryParse {
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Model not found in the registry.
    #[error("model '{name}' not found in registry")]
    ModelNotFound {
        /// Name of the missing model.
        name: String,
    },

    /// A model component file is missing from the cache.
    #[error("model file missing from cache: {path}")]
    ModelFileMissing {
        /// Path to the missing file.
        path: std::path::PathBuf,
    },

    /// Download failed.
    #[error("failed to download from '{url}'")]
    DownloadFailed {
        /// URL that failed.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Downloaded file failed checksum verification.
    #[error("checksum mismatch for '{path}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Path to the downloaded file.
        path: std::path::PathBuf,
        /// Expected SHA-256 checksum.
        expected: String,
        /// Actual SHA-256 checksum.
        actual: String,
    },

    /// Failed to read labels file.
    #[error("failed to read labels file '{path}'")]
    LabelsRead {
        /// Path to the labels file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the geofence map.
    #[error("failed to parse geofence map '{path}'")]
    GeofenceParse {
        /// Path to the geofence file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to build an ONNX session.
    #[error("failed to load model session from '{path}'")]
    SessionBuild {
        /// Path to the model file.
        path: std::path::PathBuf,
        /// Underlying ONNX runtime error.
        #[source]
        source: ort::Error,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Input image could not be decoded.
    #[error("failed to decode image '{path}'")]
    ImageDecode {
        /// Path to the image file.
        path: std::path::PathBuf,
        /// Underlying decode error.
        #[source]
        source: image::ImageError,
    },

    /// Annotated image could not be written.
    #[error("failed to write annotated image '{path}'")]
    ImageWrite {
        /// Path to the output file.
        path: std::path::PathBuf,
        /// Underlying encode/write error.
        #[source]
        source: image::ImageError,
    },

    /// Server failed to bind or serve.
    #[error("server error on {addr}")]
    Server {
        /// Listen address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}
