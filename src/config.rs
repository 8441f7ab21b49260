//! Graph configuration, optionally loaded from `nodlite.toml`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default number of rows fetched per cursor page
pub const DEFAULT_PAGE_SIZE: usize = 256;

/// SQLite `journal_mode` applied when the graph is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    #[default]
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

/// SQLite `synchronous` level applied when the graph is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Synchronous {
    Off,
    #[default]
    Normal,
    Full,
}

impl Synchronous {
    pub fn as_str(&self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
        }
    }
}

/// What `add_edge` does when an endpoint is not yet a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointPolicy {
    /// Insert missing endpoints with empty attributes
    #[default]
    AutoCreate,
    /// Reject the edge with `Error::UnknownEndpoint`
    Strict,
}

impl fmt::Display for EndpointPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointPolicy::AutoCreate => write!(f, "auto-create"),
            EndpointPolicy::Strict => write!(f, "strict"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub journal_mode: JournalMode,
    pub synchronous: Synchronous,
    /// Write attribute payloads zlib-compressed
    pub compress: bool,
    /// Rows fetched per cursor page
    pub page_size: usize,
    pub endpoint_policy: EndpointPolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            journal_mode: JournalMode::default(),
            synchronous: Synchronous::default(),
            compress: false,
            page_size: DEFAULT_PAGE_SIZE,
            endpoint_policy: EndpointPolicy::default(),
        }
    }
}

impl GraphConfig {
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_endpoint_policy(mut self, policy: EndpointPolicy) -> Self {
        self.endpoint_policy = policy;
        self
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("nodlite.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<GraphConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: GraphConfig = toml::from_str(&contents)?;
    if config.page_size == 0 {
        anyhow::bail!("page_size must be at least 1 in {}", path.display());
    }
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &GraphConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
