use ndarray::Array2;

/// Model input: a `[num_nodes, features]` matrix plus a COO edge index.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTensors {
    pub features: Array2<f32>,
    pub sources: Vec<usize>,
    pub targets: Vec<usize>,
}

impl GraphTensors {
    pub fn new(features: Array2<f32>, sources: Vec<usize>, targets: Vec<usize>) -> Self {
        Self {
            features,
            sources,
            targets,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.features.nrows()
    }

    pub fn num_edges(&self) -> usize {
        self.sources.len()
    }
}
