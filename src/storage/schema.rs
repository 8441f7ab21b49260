//! Database schema definitions and verification

use rusqlite::{Connection, ErrorCode, OptionalExtension};

use crate::config::GraphConfig;
use crate::{Error, Result};

/// Value stamped into `PRAGMA user_version` by this layout
pub const SCHEMA_VERSION: i64 = 1;

/// SQL to create the nodes table
pub const CREATE_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY NOT NULL,
    attrs BLOB
)
"#;

/// SQL to create the edges table
/// One row per ordered (src, dst) pair
pub const CREATE_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS edges (
    src TEXT NOT NULL,
    dst TEXT NOT NULL,
    attrs BLOB,
    PRIMARY KEY (src, dst)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_edges_src ON edges(src)",
    "CREATE INDEX IF NOT EXISTS idx_edges_dst ON edges(dst)",
];

/// SQL to create the count views
pub const CREATE_VIEWS: &[&str] = &[
    "CREATE VIEW IF NOT EXISTS count_nodes(n_nodes) AS SELECT COUNT(*) FROM nodes",
    "CREATE VIEW IF NOT EXISTS count_edges(n_edges) AS SELECT COUNT(*) FROM edges",
];

/// Expected `(column, primary-key position)` pairs per table, in column order
const NODES_COLUMNS: &[(&str, i64)] = &[("id", 1), ("attrs", 0)];
const EDGES_COLUMNS: &[(&str, i64)] = &[("src", 1), ("dst", 2), ("attrs", 0)];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_NODES_TABLE, CREATE_EDGES_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts.extend(CREATE_VIEWS.iter().copied());
    stmts
}

/// Create the graph layout if absent, or verify an existing one.
///
/// Idempotent. Fails with `SchemaMismatch` when the file is not a SQLite
/// database or already holds a different structure.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    let tables = user_tables(conn).map_err(not_a_database)?;
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version != 0 && version != SCHEMA_VERSION {
        return Err(Error::SchemaMismatch(format!(
            "unsupported schema version {} (expected {})",
            version, SCHEMA_VERSION
        )));
    }

    if !tables.is_empty() {
        verify_table(conn, "nodes", NODES_COLUMNS)?;
        verify_table(conn, "edges", EDGES_COLUMNS)?;
    } else {
        tracing::debug!("Creating graph schema (version {})", SCHEMA_VERSION);
    }

    for stmt in all_schema_statements() {
        conn.execute(stmt, [])?;
    }
    if version == 0 {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

/// Apply the connection pragmas from the configuration
pub fn apply_pragmas(conn: &Connection, config: &GraphConfig) -> Result<()> {
    let mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.as_str(),
        |row| row.get(0),
    )?;
    tracing::debug!("journal_mode = {}", mode);
    conn.pragma_update(None, "synchronous", config.synchronous.as_str())?;
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    Ok(())
}

fn user_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let tables = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(tables)
}

fn verify_table(conn: &Connection, table: &str, expected: &[(&str, i64)]) -> Result<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !exists {
        return Err(Error::SchemaMismatch(format!(
            "database has tables but no `{}` table",
            table
        )));
    }

    let mut stmt = conn.prepare("SELECT name, pk FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let matches = columns.len() == expected.len()
        && columns
            .iter()
            .zip(expected)
            .all(|((name, pk), (want_name, want_pk))| name == want_name && pk == want_pk);

    if !matches {
        let found: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        return Err(Error::SchemaMismatch(format!(
            "table `{}` has columns ({}), expected ({})",
            table,
            found.join(", "),
            expected.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ")
        )));
    }
    Ok(())
}

fn not_a_database(err: rusqlite::Error) -> Error {
    match err.sqlite_error_code() {
        Some(ErrorCode::NotADatabase) => {
            Error::SchemaMismatch("file is not a SQLite database".to_string())
        }
        _ => Error::Storage(err),
    }
}
