//! HTTP prediction server.
//!
//! A thin axum layer over the [`Predictor`] seam and the
//! [`Annotator`](crate::annotate::Annotator). All routing and shared state
//! lives here; request semantics live in [`handlers`].

mod handlers;
pub mod types;

use crate::annotate::{Annotator, AnnotatorOptions};
use crate::config::ServerConfig;
use crate::constants::PREDICT_PATH;
use crate::error::{Error, Result};
use crate::inference::Predictor;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// The model pipeline.
    pub predictor: Arc<dyn Predictor>,
    /// Annotator, present only when saving annotated images is enabled.
    pub annotator: Option<Arc<Annotator>>,
    /// Request fields copied verbatim onto predictions.
    pub extra_fields: Arc<[String]>,
}

impl AppState {
    /// Assemble shared state from the runtime configuration.
    pub fn new(config: &ServerConfig, predictor: Arc<dyn Predictor>) -> Self {
        let annotator = config.save_annotated.then(|| {
            Arc::new(Annotator::new(AnnotatorOptions {
                min_confidence: config.annotation_threshold,
                suffix: config.annotation_suffix.clone(),
                font: config.font.clone(),
            }))
        });

        Self {
            predictor,
            annotator,
            extra_fields: config.extra_fields.clone().into(),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PREDICT_PATH, post(handlers::predict))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until interrupted.
pub async fn serve(config: &ServerConfig, predictor: Arc<dyn Predictor>) -> Result<()> {
    let state = AppState::new(config, predictor);
    let app = router(state).layer(TimeoutLayer::new(config.timeout));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server {
            addr: addr.to_string(),
            source: e,
        })?;

    info!("listening on http://{addr}{PREDICT_PATH}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Server {
            addr: addr.to_string(),
            source: e,
        })
}

/// Resolve when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
