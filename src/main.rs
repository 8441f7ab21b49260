//! nodlite CLI - inspect and edit a graph file from the shell

use clap::{Parser, Subcommand};
use nodlite::config::{self, GraphConfig};
use nodlite::ui::{self, Icons};
use nodlite::value::{attributes_from_json, attributes_to_json};
use nodlite::{Attributes, Graph};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "nodlite")]
#[command(version)]
#[command(about = "Persistent property graph on SQLite")]
#[command(long_about = r#"
nodlite stores a directed graph with arbitrary node and edge attributes
in a single SQLite file.

Example usage:
  nodlite add-node Mary --attrs '{"age": 32}'
  nodlite add-edge Mary John
  nodlite neighbors Mary
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to nodlite.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file
    #[arg(short, long, global = true, default_value = "nodlite.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a node, replacing its attributes if it exists
    AddNode {
        id: String,

        /// Attributes as a JSON object
        #[arg(short, long)]
        attrs: Option<String>,
    },

    /// Add a directed edge, replacing its attributes if it exists
    AddEdge {
        src: String,
        dst: String,

        /// Attributes as a JSON object
        #[arg(short, long)]
        attrs: Option<String>,
    },

    /// Print a node's attributes as JSON
    Get { id: String },

    /// Print an edge's attributes as JSON
    Edge { src: String, dst: String },

    /// List the targets of a node's outgoing edges
    Neighbors { id: String },

    /// List the sources of a node's incoming edges
    Predecessors { id: String },

    /// List node keys
    Nodes {
        /// Page to print (all nodes when omitted)
        #[arg(long)]
        page: Option<usize>,

        #[arg(long, default_value = "100")]
        size: usize,
    },

    /// List edges
    Edges {
        /// Page to print (all edges when omitted)
        #[arg(long)]
        page: Option<usize>,

        #[arg(long, default_value = "100")]
        size: usize,
    },

    /// Remove a node and its incident edges
    RemoveNode { id: String },

    /// Remove one edge
    RemoveEdge { src: String, dst: String },

    /// Show statistics about the graph
    Stats,

    /// Write a config file with the default settings
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn parse_attrs(raw: Option<&str>) -> anyhow::Result<Attributes> {
    let Some(raw) = raw else {
        return Ok(Attributes::new());
    };
    let json: serde_json::Value = serde_json::from_str(raw)?;
    attributes_from_json(json).ok_or_else(|| anyhow::anyhow!("--attrs must be a JSON object"))
}

fn open_graph(database: &Path, config: GraphConfig) -> anyhow::Result<Graph> {
    config::ensure_db_dir(database)?;
    Ok(Graph::open_with(database, config)?)
}

fn print_json(attrs: &Attributes) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&attributes_to_json(attrs))?);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Commands::InitConfig { force } = cli.command {
        let path = cli.config.unwrap_or_else(config::default_config_path);
        config::write_config(&path, &GraphConfig::default(), force)?;
        ui::success(&format!("Wrote {}", path.display()));
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let mut graph = open_graph(&cli.database, config)?;

    match cli.command {
        Commands::AddNode { id, attrs } => {
            let attrs = parse_attrs(attrs.as_deref())?;
            graph.add_node(&id, &attrs)?;
            ui::success(&format!("Node {} saved", id));
        }

        Commands::AddEdge { src, dst, attrs } => {
            let attrs = parse_attrs(attrs.as_deref())?;
            graph.add_edge(&src, &dst, &attrs)?;
            ui::success(&format!("Edge {} -> {} saved", src, dst));
        }

        Commands::Get { id } => print_json(&graph.get(&id)?)?,

        Commands::Edge { src, dst } => print_json(&graph.edge(&src, &dst)?)?,

        Commands::Neighbors { id } => {
            if !graph.has_node(&id)? {
                ui::warn(&format!("{} is not a node", id));
            }
            for neighbor in graph.neighbors(&id) {
                println!("{} {}", Icons::RIGHT, neighbor?);
            }
        }

        Commands::Predecessors { id } => {
            if !graph.has_node(&id)? {
                ui::warn(&format!("{} is not a node", id));
            }
            for predecessor in graph.predecessors(&id) {
                println!("{} {}", Icons::LEFT, predecessor?);
            }
        }

        Commands::Nodes { page, size } => match page {
            Some(page) => {
                for key in graph.nodes_page(page, size)? {
                    println!("{} {}", Icons::NODE, key);
                }
            }
            None => {
                for node in graph.node_records() {
                    println!("{} {}", Icons::NODE, node?);
                }
            }
        },

        Commands::Edges { page, size } => {
            let print = |edge: nodlite::Edge| {
                if edge.attributes.is_empty() {
                    println!("{}", edge);
                } else {
                    println!("{} {}", edge, attributes_to_json(&edge.attributes));
                }
            };
            match page {
                Some(page) => graph.edges_page(page, size)?.into_iter().for_each(print),
                None => {
                    for edge in graph.edges() {
                        print(edge?);
                    }
                }
            }
        }

        Commands::RemoveNode { id } => {
            if graph.remove_node(&id)? {
                ui::success(&format!("Removed node {}", id));
            } else {
                ui::warn(&format!("{} is not a node", id));
            }
        }

        Commands::RemoveEdge { src, dst } => {
            if graph.remove_edge(&src, &dst)? {
                ui::success(&format!("Removed edge {} -> {}", src, dst));
            } else {
                ui::warn(&format!("No edge {} -> {}", src, dst));
            }
        }

        Commands::Stats => {
            let stats = graph.stats()?;
            ui::section(Icons::STATS, "Graph Statistics");
            ui::info("Database", &format!("{} {}", Icons::DATABASE, cli.database.display()));
            ui::summary_row("Nodes:", &stats.nodes.to_string());
            ui::summary_row("Edges:", &stats.edges.to_string());
            ui::summary_row("Self-loops:", &stats.self_loops.to_string());
            ui::summary_row("Endpoint policy:", &graph.config().endpoint_policy.to_string());
        }

        Commands::InitConfig { .. } => unreachable!("handled before opening the graph"),
    }

    graph.close()?;
    Ok(())
}
