//! Two-layer graph-convolution classifier over constant node features.
//!
//! The model consumes [`GraphTensors`] and returns one raw score per class.
//! Weights come from an rkyv archive (see [`weights`]) and are never mutated
//! after load, so a loaded [`GnnClassifier`] can be shared across threads.

pub mod classifier;
pub mod error;
pub mod graph;
pub mod layers;
pub mod weights;

pub use classifier::{Architecture, GnnClassifier, GraphModel};
pub use error::ModelError;
pub use graph::GraphTensors;
pub use weights::{LayerWeights, ModelWeights};
