use graphclass_core::config::LimitsConfig;
use graphclass_core::graph::{Edge, EdgeList};
use serde_json::Value;
use thiserror::Error;

const EDGES_KEY: &str = "edges";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("'edges' key with a list of edges is required")]
    MissingEdges,
    #[error("'edges' must be a list of edges")]
    EdgesNotAList,
    #[error("'edges' must not be empty")]
    EmptyEdges,
    #[error("edge {index} must be a pair of non-negative integers, got {value}")]
    MalformedEdge { index: usize, value: String },
    #[error("too many edges: {count} (limit {limit})")]
    TooManyEdges { count: usize, limit: usize },
    /// `count` saturates at `usize::MAX` for ids that leave no room for a count.
    #[error("too many nodes: {count} (limit {limit})")]
    TooManyNodes { count: usize, limit: usize },
    #[error("graph has no nodes")]
    NoNodes,
}

/// Input accepted by [`Validator::validate`]: raw JSON text or an already parsed value.
#[derive(Debug, Clone, Copy)]
pub enum RawInput<'a> {
    Json(&'a [u8]),
    Value(&'a Value),
}

impl<'a> From<&'a str> for RawInput<'a> {
    fn from(raw: &'a str) -> Self {
        RawInput::Json(raw.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for RawInput<'a> {
    fn from(raw: &'a [u8]) -> Self {
        RawInput::Json(raw)
    }
}

impl<'a> From<&'a Value> for RawInput<'a> {
    fn from(value: &'a Value) -> Self {
        RawInput::Value(value)
    }
}

#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(LimitsConfig::default())
    }
}

impl Validator {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Extract the `edges` list. Says nothing about whether the graph is a
    /// tree, a DAG or cyclic.
    pub fn validate<'a>(&self, raw: impl Into<RawInput<'a>>) -> Result<EdgeList, InputError> {
        match raw.into() {
            RawInput::Json(bytes) => {
                let value: Value = serde_json::from_slice(bytes)
                    .map_err(|err| InputError::InvalidJson(err.to_string()))?;
                self.validate_value(&value)
            }
            RawInput::Value(value) => self.validate_value(value),
        }
    }

    fn validate_value(&self, value: &Value) -> Result<EdgeList, InputError> {
        let object = value.as_object().ok_or(InputError::NotAnObject)?;

        let items = match object.get(EDGES_KEY) {
            None | Some(Value::Null) => return Err(InputError::MissingEdges),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(InputError::EdgesNotAList),
        };

        if items.is_empty() {
            return Err(InputError::EmptyEdges);
        }
        if items.len() > self.limits.max_edges {
            return Err(InputError::TooManyEdges {
                count: items.len(),
                limit: self.limits.max_edges,
            });
        }

        let edges = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                parse_edge(item).ok_or_else(|| InputError::MalformedEdge {
                    index,
                    value: item.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let edges = EdgeList::new(edges);
        match edges.num_nodes() {
            Some(count) if count <= self.limits.max_nodes => Ok(edges),
            count => Err(InputError::TooManyNodes {
                count: count.unwrap_or(usize::MAX),
                limit: self.limits.max_nodes,
            }),
        }
    }
}

fn parse_edge(item: &Value) -> Option<Edge> {
    match item.as_array()?.as_slice() {
        [u, v] => Some([node_id(u)?, node_id(v)?]),
        _ => None,
    }
}

fn node_id(value: &Value) -> Option<usize> {
    // `as_u64` rejects negatives and floats such as `1.0` or `1.5`.
    value.as_u64().and_then(|id| usize::try_from(id).ok())
}
