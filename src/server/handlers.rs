//! Request handlers for the prediction API.

use super::AppState;
use super::types::{ErrorResponse, HealthResponse, PredictRequest, PredictResponse};
use crate::inference::{ImagePrediction, Instance};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// `GET /health`: liveness probe.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_version: state.predictor.model_version().to_string(),
    })
}

/// `POST /predict`: run the pipeline over a batch of instances.
///
/// The whole request is rejected with 400 when any filepath is inaccessible,
/// before any inference runs. Past that point failures are per-instance: a
/// bad image or a failed annotation is recorded on that instance's prediction
/// and the rest of the batch completes normally.
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, (StatusCode, Json<ErrorResponse>)> {
    for instance in &request.instances {
        if !Path::new(&instance.filepath).is_file() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    detail: format!("Cannot access filepath: `{}`", instance.filepath),
                }),
            ));
        }
    }

    debug!("predicting {} instance(s)", request.instances.len());

    let mut predictions = Vec::with_capacity(request.instances.len());
    for instance in request.instances {
        predictions.push(process_instance(&state, instance).await);
    }

    Ok(Json(PredictResponse { predictions }))
}

/// Run inference, extra-field propagation, and annotation for one instance.
async fn process_instance(state: &AppState, instance: Instance) -> ImagePrediction {
    let predictor = Arc::clone(&state.predictor);
    let filepath = instance.filepath.clone();
    let task_instance = instance.clone();

    let mut prediction =
        match tokio::task::spawn_blocking(move || predictor.predict(&task_instance)).await {
            Ok(prediction) => prediction,
            Err(e) => {
                error!("inference task panicked for {filepath}: {e}");
                let mut prediction = ImagePrediction::for_filepath(&filepath);
                prediction.failures.push("INTERNAL".to_string());
                prediction
            }
        };

    for field in state.extra_fields.iter() {
        if let Some(value) = instance.extra.get(field) {
            prediction.extra.insert(field.clone(), value.clone());
        }
    }

    if let Some(annotator) = &state.annotator {
        annotate_prediction(annotator, &mut prediction).await;
    }

    prediction
}

/// Draw and save the annotated copy, recording failure on the prediction.
async fn annotate_prediction(
    annotator: &Arc<crate::annotate::Annotator>,
    prediction: &mut ImagePrediction,
) {
    let annotator = Arc::clone(annotator);
    let source = PathBuf::from(&prediction.filepath);
    let detections = prediction.detections.clone();

    match tokio::task::spawn_blocking(move || annotator.annotate(&source, &detections)).await {
        Ok(Ok(path)) => {
            prediction.annotated_filepath = Some(path.to_string_lossy().into_owned());
        }
        Ok(Err(e)) => {
            warn!("annotation failed for {}: {e}", prediction.filepath);
            prediction.failures.push("ANNOTATION".to_string());
        }
        Err(e) => {
            error!("annotation task panicked for {}: {e}", prediction.filepath);
            prediction.failures.push("INTERNAL".to_string());
        }
    }
}
