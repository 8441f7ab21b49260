//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - nodes(id, attrs)
//! - edges(src, dst, attrs), one row per ordered pair
//!
//! plus `src`/`dst` indexes for adjacency scans and `count_*` views.

pub mod cursor;
pub mod schema;

pub use cursor::Cursor;
pub use schema::{SCHEMA_VERSION, apply_pragmas, ensure_schema};
