use crate::validate::InputError;
use gnn::GraphTensors;
use graphclass_core::graph::EdgeList;
use ndarray::Array2;

/// Width of the constant node feature.
pub const NODE_FEATURE_DIM: usize = 1;

/// Node features are a constant `1.0` per node; the edge index keeps the
/// caller's order, duplicates included.
pub fn build_tensors(edges: &EdgeList) -> Result<GraphTensors, InputError> {
    let num_nodes = match edges.num_nodes() {
        Some(0) => return Err(InputError::NoNodes),
        Some(count) => count,
        None => {
            return Err(InputError::TooManyNodes {
                count: usize::MAX,
                limit: usize::MAX,
            })
        }
    };

    Ok(GraphTensors::new(
        Array2::ones((num_nodes, NODE_FEATURE_DIM)),
        edges.sources(),
        edges.targets(),
    ))
}
