pub mod label;
pub mod predictor;
pub mod tensors;
pub mod validate;

pub use label::{select_label, LabelError};
pub use predictor::{ModelHandle, PipelineError, Predictor};
pub use tensors::build_tensors;
pub use validate::{InputError, RawInput, Validator};
