//! Node records returned by full-table scans

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Attributes, Value};

/// A node key together with its attribute mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: String,
    pub attributes: Attributes,
}

impl Node {
    pub fn new(key: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            key: key.into(),
            attributes,
        }
    }

    /// Look up a single attribute
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node(key='{}'", self.key)?;
        for (name, value) in &self.attributes {
            write!(f, ", {}={}", name, value)?;
        }
        write!(f, ")")
    }
}
