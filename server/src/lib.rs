//! HTTP surface of the classifier.
//!
//! - `GET /`: health check, independent of model state
//! - `POST /predict`: `{"edges": [[u, v], ...]}` -> `{"graph_class": "..."}`
//! - `GET /metrics`: prediction counters and latency percentiles

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use graphclass_core::config::ServerConfig;
use graphclass_core::error::{ErrorCode, ServiceError};
use graphclass_core::graph::GraphClass;
use graphclass_core::metrics::MetricsSnapshot;
use pipeline::{PipelineError, Predictor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(predictor: Arc<Predictor>) -> Self {
        Self { predictor }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthOut {
    pub health_check: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOut {
    pub graph_class: GraphClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    pub error_code: ErrorCode,
}

pub fn router(predictor: Arc<Predictor>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/predict", post(predict_handler))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(AppState::new(predictor))
}

/// Bind `config.bind_addr()` and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, predictor: Arc<Predictor>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(predictor, config.max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}

pub async fn health_handler() -> Json<HealthOut> {
    Json(HealthOut {
        health_check: "OK".to_string(),
    })
}

/// The body is taken as raw bytes so malformed JSON gets the same error shape
/// as a malformed edge list.
pub async fn predict_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionOut>, ApiError> {
    let predictor = state.predictor.clone();
    let graph_class = tokio::task::spawn_blocking(move || predictor.predict(&body[..]))
        .await
        .map_err(|err| ApiError::internal(format!("prediction task failed: {err}")))??;

    Ok(Json(PredictionOut { graph_class }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.predictor.metrics())
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn internal(detail: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                detail,
                error_code: ErrorCode::Internal,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let error_code = err.error_code();
        let status = match error_code {
            ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorBody {
                detail: err.to_string(),
                error_code,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "request failed: {}", self.body.detail);
        }
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnn::{GraphModel, GraphTensors, ModelError};
    use graphclass_core::config::LimitsConfig;
    use graphclass_core::metrics::MetricsCollector;
    use pipeline::ModelHandle;

    struct AlwaysCyclic;

    impl GraphModel for AlwaysCyclic {
        fn forward(&self, _graph: &GraphTensors) -> Result<Vec<f32>, ModelError> {
            Ok(vec![0.0, 0.0, 1.0])
        }
    }

    struct Broken;

    impl GraphModel for Broken {
        fn forward(&self, _graph: &GraphTensors) -> Result<Vec<f32>, ModelError> {
            Err(ModelError::EmptyGraph)
        }
    }

    fn state(model: Arc<dyn GraphModel>) -> AppState {
        AppState::new(Arc::new(Predictor::new(
            ModelHandle::new(model),
            LimitsConfig::default(),
            MetricsCollector::new(16),
        )))
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body: HealthOut = body_json(response).await;
        assert_eq!(body.health_check, "OK");
    }

    #[tokio::test]
    async fn test_predict_returns_label() {
        let body = Bytes::from_static(br#"{"edges": [[0, 1], [1, 2], [2, 0]]}"#);
        let Json(out) = predict_handler(State(state(Arc::new(AlwaysCyclic))), body)
            .await
            .unwrap();
        assert_eq!(out.graph_class, GraphClass::Cyclic);
    }

    #[tokio::test]
    async fn test_invalid_input_is_bad_request() {
        let body = Bytes::from_static(br#"{"edges": []}"#);
        let err = predict_handler(State(state(Arc::new(AlwaysCyclic))), body)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let response = err.into_response();
        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.error_code, ErrorCode::InvalidArgument);
        assert!(body.detail.contains("'edges' must not be empty"));
    }

    #[tokio::test]
    async fn test_model_failure_is_internal_error() {
        let body = Bytes::from_static(br#"{"edges": [[0, 1]]}"#);
        let err = predict_handler(State(state(Arc::new(Broken))), body)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_counts_requests() {
        let state = state(Arc::new(AlwaysCyclic));
        let _ = predict_handler(
            State(state.clone()),
            Bytes::from_static(br#"{"edges": [[0, 1]]}"#),
        )
        .await;
        let _ = predict_handler(State(state.clone()), Bytes::from_static(b"{}")).await;

        let Json(snapshot) = metrics_handler(State(state)).await;
        assert_eq!(snapshot.total_predictions, 2);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.cyclic, 1);
    }
}
