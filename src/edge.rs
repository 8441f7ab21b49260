//! Edge records - directed relationships between node keys
//!
//! An edge is identified by its ordered `(source, target)` pair; a graph
//! holds at most one edge per pair.

use serde::{Deserialize, Serialize};

use crate::value::Attributes;

/// A directed edge with its attribute mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node key
    pub source: String,
    /// Target node key
    pub target: String,
    pub attributes: Attributes,
}

impl Edge {
    /// Create an edge without attributes
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::with_attributes(source, target, Attributes::new())
    }

    pub fn with_attributes(
        source: impl Into<String>,
        target: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            attributes,
        }
    }

    /// The `(source, target)` identity of this edge
    pub fn key(&self) -> (&str, &str) {
        (&self.source, &self.target)
    }

    /// Check if the edge starts and ends on the same node
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Create a reversed edge (swap source/target)
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}
