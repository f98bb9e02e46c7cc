use crate::classifier::Architecture;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to access weights at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt weight archive: {0}")]
    CorruptWeights(String),
    #[error("unsupported weight format version {0}")]
    UnsupportedVersion(u32),
    #[error("weight serialization failed: {0}")]
    Serialization(String),
    #[error("architecture mismatch: expected {expected}, found {found}")]
    ArchitectureMismatch {
        expected: Architecture,
        found: Architecture,
    },
    #[error("malformed layer {layer}: {reason}")]
    MalformedLayer { layer: String, reason: String },
    #[error("invalid state_dict: {0}")]
    StateDict(String),
    #[error("expected {expected} input features per node, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },
    #[error("node {node} is out of range for a graph with {num_nodes} nodes")]
    NodeOutOfRange { node: usize, num_nodes: usize },
    #[error("feature matrix has {features} rows for a graph with {graph} nodes")]
    NodeCountMismatch { features: usize, graph: usize },
    #[error("edge index has {sources} sources but {targets} targets")]
    RaggedEdgeIndex { sources: usize, targets: usize },
    #[error("graph has no nodes")]
    EmptyGraph,
}

impl ModelError {
    /// True for failures to obtain usable weights, as opposed to a failed forward pass.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            ModelError::Io { .. }
                | ModelError::CorruptWeights(_)
                | ModelError::UnsupportedVersion(_)
                | ModelError::ArchitectureMismatch { .. }
                | ModelError::MalformedLayer { .. }
                | ModelError::StateDict(_)
        )
    }
}
