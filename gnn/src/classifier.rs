use crate::error::ModelError;
use crate::graph::GraphTensors;
use crate::layers::{mean_pool, relu, GcnConv, Linear, Propagation};
use crate::weights::{LayerWeights, ModelWeights};
use graphclass_core::config::ModelConfig;
use ndarray::{Array1, Array2};
use std::path::Path;
use tracing::info;

/// Anything that turns a graph into one raw score per class.
pub trait GraphModel: Send + Sync {
    fn forward(&self, graph: &GraphTensors) -> Result<Vec<f32>, ModelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Architecture {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub output_dim: usize,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            input_dim: 1,
            hidden_dim: 64,
            output_dim: 3,
        }
    }
}

impl From<&ModelConfig> for Architecture {
    fn from(config: &ModelConfig) -> Self {
        Self {
            input_dim: config.input_dim,
            hidden_dim: config.hidden_dim,
            output_dim: config.output_dim,
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "input_dim={} hidden_dim={} output_dim={}",
            self.input_dim, self.hidden_dim, self.output_dim
        )
    }
}

/// `conv(in→hidden) → relu → conv(hidden→hidden) → relu → mean → linear(hidden→out)`
#[derive(Debug, Clone)]
pub struct GnnClassifier {
    architecture: Architecture,
    conv1: GcnConv,
    conv2: GcnConv,
    classifier: Linear,
}

impl GnnClassifier {
    pub fn from_weights(weights: ModelWeights, expected: Architecture) -> Result<Self, ModelError> {
        weights.validate(expected)?;

        Ok(Self {
            architecture: expected,
            conv1: GcnConv::new(matrix(&weights.conv1)?, vector(&weights.conv1))?,
            conv2: GcnConv::new(matrix(&weights.conv2)?, vector(&weights.conv2))?,
            classifier: Linear::new(matrix(&weights.classifier)?, vector(&weights.classifier))?,
        })
    }

    pub fn load(path: impl AsRef<Path>, expected: Architecture) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let (weights, digest) = ModelWeights::load(path)?;
        let model = Self::from_weights(weights, expected)?;
        info!(
            path = %path.display(),
            sha256 = %digest,
            architecture = %expected,
            "loaded classifier weights"
        );
        Ok(model)
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        Self::load(&config.weights_path, Architecture::from(config))
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }
}

impl GraphModel for GnnClassifier {
    fn forward(&self, graph: &GraphTensors) -> Result<Vec<f32>, ModelError> {
        let num_nodes = graph.num_nodes();
        if num_nodes == 0 {
            return Err(ModelError::EmptyGraph);
        }

        let plan = Propagation::gcn(num_nodes, &graph.sources, &graph.targets)?;

        let h = relu(self.conv1.forward(&graph.features, &plan)?);
        let h = relu(self.conv2.forward(&h, &plan)?);
        let pooled = mean_pool(&h)?;
        let scores = self.classifier.forward(&pooled)?;

        Ok(scores.to_vec())
    }
}

fn matrix(layer: &LayerWeights) -> Result<Array2<f32>, ModelError> {
    let shape = (layer.out_features as usize, layer.in_features as usize);
    Array2::from_shape_vec(shape, layer.weight.clone()).map_err(|err| ModelError::MalformedLayer {
        layer: format!("{}x{}", shape.0, shape.1),
        reason: err.to_string(),
    })
}

fn vector(layer: &LayerWeights) -> Array1<f32> {
    Array1::from_vec(layer.bias.clone())
}
