use serde::{Deserialize, Serialize};

/// Directed edge `source -> target`.
pub type Edge = [usize; 2];

/// Ordered list of directed edges over nodes `0..num_nodes`.
///
/// No deduplication or sorting is applied; the convolution aggregates every
/// occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeList {
    edges: Vec<Edge>,
}

impl EdgeList {
    pub fn new(edges: Vec<Edge>) -> Self {
        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn max_node_id(&self) -> Option<usize> {
        self.edges.iter().map(|[u, v]| (*u).max(*v)).max()
    }

    /// Highest node id plus one, or 0 for an empty list. `None` when the
    /// count does not fit in `usize`.
    pub fn num_nodes(&self) -> Option<usize> {
        match self.max_node_id() {
            Some(max_id) => max_id.checked_add(1),
            None => Some(0),
        }
    }

    pub fn sources(&self) -> Vec<usize> {
        self.edges.iter().map(|e| e[0]).collect()
    }

    pub fn targets(&self) -> Vec<usize> {
        self.edges.iter().map(|e| e[1]).collect()
    }
}

impl From<Vec<Edge>> for EdgeList {
    fn from(edges: Vec<Edge>) -> Self {
        Self::new(edges)
    }
}

/// Output classes, in the ordinal order the classifier was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphClass {
    Tree,
    Dag,
    Cyclic,
}

impl GraphClass {
    pub const ALL: [GraphClass; 3] = [GraphClass::Tree, GraphClass::Dag, GraphClass::Cyclic];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            GraphClass::Tree => 0,
            GraphClass::Dag => 1,
            GraphClass::Cyclic => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GraphClass::Tree => "tree",
            GraphClass::Dag => "dag",
            GraphClass::Cyclic => "cyclic",
        }
    }
}

impl std::fmt::Display for GraphClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
