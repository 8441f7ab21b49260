//! # nodlite - Persistent property graph on SQLite
//!
//! A directed graph whose nodes and edges carry arbitrary attribute maps,
//! stored in a single SQLite file and accessed through a small
//! NetworkX-like API.
//!
//! nodlite provides:
//! - Upsert semantics for nodes and edges keyed by string identity
//! - Schemaless attributes stored as a compact binary payload
//! - Index-backed neighbor and predecessor lookups
//! - Lazy, restartable cursors over nodes, edges and adjacency
//!
//! ```no_run
//! use nodlite::{Attributes, Graph, Value};
//!
//! let mut graph = Graph::open("people.db")?;
//! graph.set("Mary", &Attributes::from([("age".to_string(), Value::from(32))]))?;
//! graph.add_edge("Mary", "John", &Attributes::new())?;
//!
//! for neighbor in graph.neighbors("Mary") {
//!     println!("{}", neighbor?);
//! }
//! # Ok::<(), nodlite::Error>(())
//! ```

pub mod codec;
pub mod config;
pub mod edge;
pub mod graph;
pub mod node;
pub mod storage;
pub mod ui;
pub mod value;

// Re-exports for convenient access
pub use config::{EndpointPolicy, GraphConfig, JournalMode, Synchronous};
pub use edge::Edge;
pub use graph::{Graph, GraphStats};
pub use node::Node;
pub use storage::Cursor;
pub use value::{Attributes, Value};

/// Result type alias for nodlite operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for nodlite operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Edge not found: {src} -> {dst}")]
    EdgeNotFound { src: String, dst: String },

    #[error("Edge endpoint does not exist: {0}")]
    UnknownEndpoint(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Corrupt attributes for {owner}: {reason}")]
    CorruptAttributes { owner: String, reason: String },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
