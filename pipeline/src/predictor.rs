use crate::label::{select_label, LabelError};
use crate::tensors::build_tensors;
use crate::validate::{InputError, RawInput, Validator};
use gnn::{GnnClassifier, GraphModel, ModelError};
use graphclass_core::config::{AppConfig, LimitsConfig, ModelConfig};
use graphclass_core::error::{ErrorCode, ServiceError};
use graphclass_core::graph::GraphClass;
use graphclass_core::metrics::{MetricsCollector, MetricsSnapshot};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("failed to load model: {0}")]
    ModelLoad(#[source] ModelError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        if err.is_load_error() {
            PipelineError::ModelLoad(err)
        } else {
            PipelineError::Internal(err.to_string())
        }
    }
}

impl From<LabelError> for PipelineError {
    fn from(err: LabelError) -> Self {
        PipelineError::Internal(err.to_string())
    }
}

impl ServiceError for PipelineError {
    fn error_code(&self) -> ErrorCode {
        match self {
            PipelineError::InvalidInput(_) => ErrorCode::InvalidArgument,
            PipelineError::ModelLoad(_) => ErrorCode::Unavailable,
            PipelineError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Shared, read-only access to the classifier.
pub enum ModelHandle {
    Loaded(Arc<dyn GraphModel>),
    /// Loaded from `config` on first use. A failed load is retried by the next caller.
    Lazy {
        config: ModelConfig,
        model: OnceLock<Arc<dyn GraphModel>>,
        init: Mutex<()>,
    },
}

impl ModelHandle {
    pub fn new(model: Arc<dyn GraphModel>) -> Self {
        ModelHandle::Loaded(model)
    }

    pub fn lazy(config: ModelConfig) -> Self {
        ModelHandle::Lazy {
            config,
            model: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Eager when `config.preload` is set, lazy otherwise.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        if config.preload {
            let model = GnnClassifier::from_config(config)?;
            Ok(Self::new(Arc::new(model)))
        } else {
            info!(path = %config.weights_path.display(), "deferring model load to first prediction");
            Ok(Self::lazy(config.clone()))
        }
    }

    pub fn is_loaded(&self) -> bool {
        match self {
            ModelHandle::Loaded(_) => true,
            ModelHandle::Lazy { model, .. } => model.get().is_some(),
        }
    }

    pub fn get(&self) -> Result<Arc<dyn GraphModel>, ModelError> {
        match self {
            ModelHandle::Loaded(model) => Ok(model.clone()),
            ModelHandle::Lazy {
                config,
                model,
                init,
            } => {
                if let Some(loaded) = model.get() {
                    return Ok(loaded.clone());
                }

                let _guard = init.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if let Some(loaded) = model.get() {
                    return Ok(loaded.clone());
                }

                let loaded: Arc<dyn GraphModel> = Arc::new(GnnClassifier::from_config(config)?);
                Ok(model.get_or_init(|| loaded).clone())
            }
        }
    }
}

/// validate → build tensors → forward → arg-max.
pub struct Predictor {
    model: ModelHandle,
    validator: Validator,
    metrics: MetricsCollector,
}

impl Predictor {
    pub fn new(model: ModelHandle, limits: LimitsConfig, metrics: MetricsCollector) -> Self {
        Self {
            model,
            validator: Validator::new(limits),
            metrics,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let model = ModelHandle::from_config(&config.model).map_err(PipelineError::ModelLoad)?;
        Ok(Self::new(
            model,
            config.limits.clone(),
            MetricsCollector::new(config.metrics.max_history),
        ))
    }

    pub fn predict<'a>(&self, raw: impl Into<RawInput<'a>>) -> Result<GraphClass, PipelineError> {
        let started = Instant::now();
        let result = self.run(raw.into());
        let latency_us = started.elapsed().as_micros() as u64;

        match &result {
            Ok(label) => {
                self.metrics.record_prediction(*label, latency_us);
                debug!(%label, latency_us, "prediction served");
            }
            Err(err) => {
                self.metrics.record_failure(latency_us);
                warn!(error_code = %err.error_code(), "prediction failed: {}", err);
            }
        }

        result
    }

    fn run(&self, raw: RawInput<'_>) -> Result<GraphClass, PipelineError> {
        let edges = self.validator.validate(raw)?;
        let tensors = build_tensors(&edges)?;

        let model = self.model.get().map_err(PipelineError::ModelLoad)?;
        let scores = model.forward(&tensors)?;
        let label = select_label(&scores)?;

        debug!(
            nodes = tensors.num_nodes(),
            edges = tensors.num_edges(),
            ?scores,
            %label,
            "classified graph"
        );
        Ok(label)
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn metrics_collector(&self) -> &MetricsCollector {
        &self.metrics
    }
}
