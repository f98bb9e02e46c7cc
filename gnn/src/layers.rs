use crate::error::ModelError;
use ndarray::{Array1, Array2, Axis};

/// Symmetrically normalized message-passing plan for one graph.
///
/// Built once per forward pass and shared by every convolution: input self
/// loops are dropped, exactly one self loop per node is added, and each edge
/// `s -> t` carries `deg(s)^-1/2 * deg(t)^-1/2` where `deg` counts incoming
/// edges (self loop included).
#[derive(Debug, Clone)]
pub struct Propagation {
    num_nodes: usize,
    edges: Vec<(usize, usize, f32)>,
}

impl Propagation {
    pub fn gcn(num_nodes: usize, sources: &[usize], targets: &[usize]) -> Result<Self, ModelError> {
        if sources.len() != targets.len() {
            return Err(ModelError::RaggedEdgeIndex {
                sources: sources.len(),
                targets: targets.len(),
            });
        }

        let mut pairs = Vec::with_capacity(sources.len() + num_nodes);
        for (&s, &t) in sources.iter().zip(targets) {
            for node in [s, t] {
                if node >= num_nodes {
                    return Err(ModelError::NodeOutOfRange { node, num_nodes });
                }
            }
            if s != t {
                pairs.push((s, t));
            }
        }
        pairs.extend((0..num_nodes).map(|n| (n, n)));

        let mut degree = vec![0.0f32; num_nodes];
        for &(_, t) in &pairs {
            degree[t] += 1.0;
        }
        let inv_sqrt: Vec<f32> = degree
            .iter()
            .map(|&d| if d > 0.0 { d.powf(-0.5) } else { 0.0 })
            .collect();

        let edges = pairs
            .into_iter()
            .map(|(s, t)| (s, t, inv_sqrt[s] * inv_sqrt[t]))
            .collect();

        Ok(Self { num_nodes, edges })
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Sum normalized source rows into their targets.
    pub fn propagate(&self, h: &Array2<f32>) -> Array2<f32> {
        let mut out = Array2::zeros(h.raw_dim());
        for &(s, t, norm) in &self.edges {
            out.row_mut(t).scaled_add(norm, &h.row(s));
        }
        out
    }
}

/// Graph convolution `out = Â (X Wᵀ) + b`.
#[derive(Debug, Clone)]
pub struct GcnConv {
    /// `[out_features, in_features]`
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl GcnConv {
    pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Result<Self, ModelError> {
        check_bias("gcn", &weight, &bias)?;
        Ok(Self { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn forward(&self, x: &Array2<f32>, plan: &Propagation) -> Result<Array2<f32>, ModelError> {
        if x.ncols() != self.in_features() {
            return Err(ModelError::FeatureMismatch {
                expected: self.in_features(),
                actual: x.ncols(),
            });
        }
        if x.nrows() != plan.num_nodes() {
            return Err(ModelError::NodeCountMismatch {
                features: x.nrows(),
                graph: plan.num_nodes(),
            });
        }

        let h = x.dot(&self.weight.t());
        let mut out = plan.propagate(&h);
        out += &self.bias;
        Ok(out)
    }
}

/// Affine map `W h + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Linear {
    pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Result<Self, ModelError> {
        check_bias("linear", &weight, &bias)?;
        Ok(Self { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn forward(&self, h: &Array1<f32>) -> Result<Array1<f32>, ModelError> {
        if h.len() != self.in_features() {
            return Err(ModelError::FeatureMismatch {
                expected: self.in_features(),
                actual: h.len(),
            });
        }
        Ok(self.weight.dot(h) + &self.bias)
    }
}

pub fn relu(mut x: Array2<f32>) -> Array2<f32> {
    x.mapv_inplace(|v| v.max(0.0));
    x
}

/// Mean over nodes, `[N, F] -> [F]`.
pub fn mean_pool(h: &Array2<f32>) -> Result<Array1<f32>, ModelError> {
    h.mean_axis(Axis(0)).ok_or(ModelError::EmptyGraph)
}

fn check_bias(layer: &str, weight: &Array2<f32>, bias: &Array1<f32>) -> Result<(), ModelError> {
    if weight.nrows() != bias.len() {
        return Err(ModelError::MalformedLayer {
            layer: layer.to_string(),
            reason: format!(
                "bias has {} entries for {} output features",
                bias.len(),
                weight.nrows()
            ),
        });
    }
    Ok(())
}
