//! Route Tool
//!
//! Command-line access to a UIRoute database for operators: seeding from a
//! directory of route descriptions, inspecting a role's tree or navigation,
//! and the administrative edits normally issued by the admin UI.
//!
//! # Usage
//!
//! ```bash
//! # Seed (idempotent) and inspect
//! route-tool seed ./ui_routes
//! route-tool tree admin
//!
//! # Reorder and edit
//! route-tool move admin Profile --index 1
//! route-tool move admin Wiki --after Issues
//! route-tool move admin Issues --tail --parent Project
//! route-tool rename admin Wiki Docs
//! route-tool hide Sonarqube true
//!
//! # Wipe and reseed everything
//! route-tool reset ./ui_routes --disable sonarqube
//! ```
//!
//! The database location comes from `--db`, then `UIROUTE_DB_PATH`, then
//! `~/.uiroute/database/uiroute.db`. Logging follows `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uiroute_core::{BulkLoader, MoveTarget, PluginState, RouteService, RouteStoreConfig};

#[derive(Parser)]
#[command(name = "route-tool")]
#[command(version, about = "Inspect and edit a UIRoute database")]
struct Cli {
    /// Database file (overrides UIROUTE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON config file with store settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert every missing route described in a directory of JSON files
    Seed {
        /// Defaults to the configured seed directory
        dir: Option<PathBuf>,
    },
    /// Print a role's route tree
    Tree { role: String },
    /// Print a role's navigation routes as JSON
    Nav { role: String },
    /// Move a route
    Move {
        role: String,
        name: String,
        /// 1-based position among the current siblings
        #[arg(long, conflicts_with_all = ["after", "head", "tail"])]
        index: Option<usize>,
        /// Place directly after this route
        #[arg(long, conflicts_with_all = ["head", "tail"])]
        after: Option<String>,
        /// Make it the first child of --parent (or the first root)
        #[arg(long, conflicts_with = "tail")]
        head: bool,
        /// Make it the last child of --parent (or the last root)
        #[arg(long)]
        tail: bool,
        /// Parent for --head / --tail
        #[arg(long)]
        parent: Option<String>,
    },
    /// Delete a route and, unless --no-cascade, its descendants
    Delete {
        role: String,
        name: String,
        #[arg(long)]
        no_cascade: bool,
    },
    /// Rename a route
    Rename {
        role: String,
        old_name: String,
        new_name: String,
    },
    /// Hide or show every route with this name, in all roles
    Hide {
        name: String,
        #[arg(action = clap::ArgAction::Set)]
        hidden: bool,
    },
    /// Delete all routes and reseed from a directory
    Reset {
        dir: Option<PathBuf>,
        /// Plugin catalog keys whose routes stay hidden after the reset
        #[arg(long = "disable")]
        disabled_plugins: Vec<String>,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(cli: &Cli) -> Result<RouteStoreConfig> {
    let mut config = match &cli.config {
        Some(path) => RouteStoreConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RouteStoreConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    Ok(config)
}

fn seed_dir(config: &RouteStoreConfig, dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir.or_else(|| config.seed_dir.clone()) {
        Some(dir) => Ok(dir),
        None => bail!("No seed directory given and UIROUTE_SEED_DIR is not set"),
    }
}

fn move_target(
    index: Option<usize>,
    after: Option<String>,
    head: bool,
    tail: bool,
    parent: Option<String>,
) -> Result<MoveTarget> {
    Ok(match (index, after, head, tail) {
        (Some(index), None, false, false) => MoveTarget::Index(index),
        (None, Some(after), false, false) => MoveTarget::After(after),
        (None, None, true, false) => MoveTarget::Head { parent },
        (None, None, false, true) => MoveTarget::Tail { parent },
        _ => bail!("Choose exactly one of --index, --after, --head or --tail"),
    })
}

fn print_tree(nodes: &[uiroute_core::RouteTreeNode], depth: usize) {
    for node in nodes {
        let hidden = if node.payload.get("hidden").and_then(|h| h.as_bool()) == Some(true) {
            " (hidden)"
        } else {
            ""
        };
        println!("{}{} [{}]{}", "  ".repeat(depth), node.name, node.id, hidden);
        print_tree(&node.children, depth + 1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli).await?;
    tracing::debug!("Using database {}", config.db_path.display());
    let service = RouteService::open(config.clone())
        .await
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    match cli.command {
        Commands::Seed { dir } => {
            let dir = seed_dir(&config, dir)?;
            let report = BulkLoader::new(service).seed_from_dir(&dir).await?;
            println!(
                "Seeded {}: {} inserted, {} already present",
                dir.display(),
                report.inserted,
                report.skipped
            );
        }
        Commands::Tree { role } => {
            let tree = service.get_tree(&role).await?;
            if tree.is_empty() {
                println!("Role '{}' has no routes", role);
            }
            print_tree(&tree.routes, 0);
        }
        Commands::Nav { role } => {
            let routes = service.navigation_for(&role).await?;
            println!("{}", serde_json::to_string_pretty(&routes)?);
        }
        Commands::Move {
            role,
            name,
            index,
            after,
            head,
            tail,
            parent,
        } => {
            let target = move_target(index, after, head, tail, parent)?;
            service.move_node(&role, &name, target).await?;
            let index = service.node_index(&role, &name).await?;
            println!("Moved '{}' to position {}", name, index);
        }
        Commands::Delete {
            role,
            name,
            no_cascade,
        } => {
            service.delete_node(&role, &name, !no_cascade).await?;
            println!("Deleted '{}' from role '{}'", name, role);
        }
        Commands::Rename {
            role,
            old_name,
            new_name,
        } => {
            service.rename_node(&role, &old_name, &new_name).await?;
            println!("Renamed '{}' to '{}'", old_name, new_name);
        }
        Commands::Hide { name, hidden } => {
            let count = service.set_visibility(&name, hidden).await?;
            println!("Set hidden={} on {} route(s) named '{}'", hidden, count, name);
        }
        Commands::Reset {
            dir,
            disabled_plugins,
        } => {
            let dir = seed_dir(&config, dir)?;
            let plugins = plugin_states(&config, &disabled_plugins);
            let report = BulkLoader::new(service)
                .reset_all(&dir, &plugins)
                .await?;
            println!("Reset complete: {} route(s) inserted", report.inserted);
        }
    }

    Ok(())
}

/// Every catalog plugin, disabled when listed on the command line
fn plugin_states(config: &RouteStoreConfig, disabled: &[String]) -> Vec<PluginState> {
    config
        .plugin_routes
        .keys()
        .map(|plugin| PluginState::new(plugin.clone(), disabled.contains(plugin)))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    run(cli).await
}
