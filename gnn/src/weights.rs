//! On-disk weight archive.
//!
//! Weights are stored as an rkyv archive of [`ModelWeights`] and validated with
//! `check_archived_root` before use. Matrices keep the PyTorch `[out, in]` row-major
//! layout so a `state_dict` exported to JSON converts without transposition.

use crate::classifier::Architecture;
use crate::error::ModelError;
use rkyv::{AlignedVec, Archive, Deserialize, Serialize};
use serde::Deserialize as SerdeDeserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

pub const FORMAT_VERSION: u32 = 1;

const CONV1_WEIGHT: &str = "conv1.lin.weight";
const CONV1_BIAS: &str = "conv1.bias";
const CONV2_WEIGHT: &str = "conv2.lin.weight";
const CONV2_BIAS: &str = "conv2.bias";
const CLASSIFIER_WEIGHT: &str = "classifier.weight";
const CLASSIFIER_BIAS: &str = "classifier.bias";

#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
#[archive(check_bytes)]
pub struct LayerWeights {
    pub out_features: u32,
    pub in_features: u32,
    /// Row-major `[out_features, in_features]`.
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

impl LayerWeights {
    pub fn new(out_features: u32, in_features: u32, weight: Vec<f32>, bias: Vec<f32>) -> Self {
        Self {
            out_features,
            in_features,
            weight,
            bias,
        }
    }

    fn check(&self, name: &str, out_features: usize, in_features: usize) -> Result<(), ModelError> {
        let malformed = |reason: String| ModelError::MalformedLayer {
            layer: name.to_string(),
            reason,
        };

        if self.out_features as usize != out_features || self.in_features as usize != in_features {
            return Err(malformed(format!(
                "shape [{}, {}], expected [{}, {}]",
                self.out_features, self.in_features, out_features, in_features
            )));
        }
        if self.weight.len() != out_features * in_features {
            return Err(malformed(format!(
                "{} weight values for shape [{}, {}]",
                self.weight.len(),
                out_features,
                in_features
            )));
        }
        if self.bias.len() != out_features {
            return Err(malformed(format!(
                "{} bias values for {} outputs",
                self.bias.len(),
                out_features
            )));
        }
        Ok(())
    }
}

#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
#[archive(check_bytes)]
pub struct ModelWeights {
    pub format_version: u32,
    pub input_dim: u32,
    pub hidden_dim: u32,
    pub output_dim: u32,
    pub conv1: LayerWeights,
    pub conv2: LayerWeights,
    pub classifier: LayerWeights,
}

impl ModelWeights {
    pub fn new(conv1: LayerWeights, conv2: LayerWeights, classifier: LayerWeights) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            input_dim: conv1.in_features,
            hidden_dim: conv1.out_features,
            output_dim: classifier.out_features,
            conv1,
            conv2,
            classifier,
        }
    }

    pub fn architecture(&self) -> Architecture {
        Architecture {
            input_dim: self.input_dim as usize,
            hidden_dim: self.hidden_dim as usize,
            output_dim: self.output_dim as usize,
        }
    }

    /// Check declared dimensions against `expected` and every layer against them.
    pub fn validate(&self, expected: Architecture) -> Result<(), ModelError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion(self.format_version));
        }
        let found = self.architecture();
        if found != expected {
            return Err(ModelError::ArchitectureMismatch { expected, found });
        }

        let Architecture {
            input_dim,
            hidden_dim,
            output_dim,
        } = expected;
        self.conv1.check("conv1", hidden_dim, input_dim)?;
        self.conv2.check("conv2", hidden_dim, hidden_dim)?;
        self.classifier.check("classifier", output_dim, hidden_dim)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<AlignedVec, ModelError> {
        rkyv::to_bytes::<_, 4096>(self).map_err(|err| ModelError::Serialization(err.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        // Archived roots must be read from aligned memory.
        let mut aligned = AlignedVec::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);

        let archived = rkyv::check_archived_root::<ModelWeights>(&aligned[..])
            .map_err(|err| ModelError::CorruptWeights(err.to_string()))?;
        let weights: ModelWeights = archived
            .deserialize(&mut rkyv::Infallible)
            .map_err(|_| ModelError::CorruptWeights("archive deserialization failed".into()))?;
        Ok(weights)
    }

    /// Write the archive next to `path` and rename it into place.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let io_err = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let bytes = self.to_bytes()?;
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, &bytes[..]).map_err(io_err)?;
        std::fs::rename(&tmp_path, path).map_err(io_err)?;
        Ok(())
    }

    /// Read an archive, returning the weights and the SHA-256 of the file.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, String), ModelError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let digest = format!("{:x}", Sha256::digest(&bytes));
        let weights = Self::from_bytes(&bytes)?;
        Ok((weights, digest))
    }

    /// Convert a JSON-exported PyTorch `state_dict`.
    ///
    /// Expects the parameter names of the reference classifier; unrelated keys
    /// are ignored.
    pub fn from_state_dict_json(raw: &str) -> Result<Self, ModelError> {
        let mut dict: HashMap<String, StateTensor> =
            serde_json::from_str(raw).map_err(|err| ModelError::StateDict(err.to_string()))?;

        let mut layer = |weight_key: &str, bias_key: &str| -> Result<LayerWeights, ModelError> {
            let weight = take(&mut dict, weight_key)?.into_matrix(weight_key)?;
            let bias = take(&mut dict, bias_key)?.into_vector(bias_key)?;
            let out_features = weight.len();
            let in_features = weight.first().map_or(0, Vec::len);
            Ok(LayerWeights::new(
                out_features as u32,
                in_features as u32,
                weight.into_iter().flatten().collect(),
                bias,
            ))
        };

        let conv1 = layer(CONV1_WEIGHT, CONV1_BIAS)?;
        let conv2 = layer(CONV2_WEIGHT, CONV2_BIAS)?;
        let classifier = layer(CLASSIFIER_WEIGHT, CLASSIFIER_BIAS)?;

        let weights = Self::new(conv1, conv2, classifier);
        weights.validate(weights.architecture())?;
        Ok(weights)
    }
}

#[derive(SerdeDeserialize)]
#[serde(untagged)]
enum StateTensor {
    Matrix(Vec<Vec<f32>>),
    Vector(Vec<f32>),
    Other(serde_json::Value),
}

impl StateTensor {
    fn into_matrix(self, key: &str) -> Result<Vec<Vec<f32>>, ModelError> {
        match self {
            StateTensor::Matrix(rows) => {
                let width = rows.first().map_or(0, Vec::len);
                if rows.is_empty() || width == 0 || rows.iter().any(|row| row.len() != width) {
                    return Err(ModelError::StateDict(format!(
                        "{key} must be a non-empty rectangular matrix"
                    )));
                }
                Ok(rows)
            }
            _ => Err(ModelError::StateDict(format!("{key} must be a matrix"))),
        }
    }

    fn into_vector(self, key: &str) -> Result<Vec<f32>, ModelError> {
        match self {
            StateTensor::Vector(values) => Ok(values),
            // `[]` matches the matrix arm first; the length check reports it.
            StateTensor::Matrix(rows) if rows.is_empty() => Ok(Vec::new()),
            _ => Err(ModelError::StateDict(format!("{key} must be a vector"))),
        }
    }
}

fn take(dict: &mut HashMap<String, StateTensor>, key: &str) -> Result<StateTensor, ModelError> {
    dict.remove(key)
        .ok_or_else(|| ModelError::StateDict(format!("missing key {key}")))
}
