//! Request and response bodies for the prediction API.

use crate::inference::{ImagePrediction, Instance};
use serde::{Deserialize, Serialize};

/// Body of a `POST /predict` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Instances to predict, one per image.
    pub instances: Vec<Instance>,
}

/// Body of a successful `POST /predict` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// One prediction per request instance, in request order.
    pub predictions: Vec<ImagePrediction>,
}

/// Body of an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error description.
    pub detail: String,
}

/// Body of a `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is up.
    pub status: String,
    /// Version string of the loaded model.
    pub model_version: String,
}
