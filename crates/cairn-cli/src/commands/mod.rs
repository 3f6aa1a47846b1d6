//! CLI command definitions and dispatch.

pub mod catalog;
pub mod config;
pub mod graph;
pub mod plan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cairn_common::constants::BIN_NAME;
use cairn_graph::ResourceCatalog;
use clap::{Parser, Subcommand, ValueEnum};

/// Compose infrastructure stacks and print their provisioning plan.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Resource catalog file (.json, .yaml, .yml); defaults to the built-in AWS catalog.
    #[arg(long, global = true, env = "CAIRN_CATALOG")]
    pub catalog: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose the stacks and print the provisioning plan.
    Plan(plan::PlanArgs),
    /// Print the stack dependency graph in Graphviz DOT format.
    Graph(graph::GraphArgs),
    /// Print the attribute schema of every resource kind.
    Catalog(catalog::CatalogArgs),
}

/// Output format shared by the printing commands.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let catalog = load_catalog(cli.catalog.as_deref())?;
    match cli.command {
        Command::Plan(args) => plan::execute(args, catalog),
        Command::Graph(args) => graph::execute(args, catalog),
        Command::Catalog(args) => catalog::execute(args, &catalog),
    }
}

/// Loads the catalog file if one was given, else the built-in catalog.
///
/// # Errors
///
/// Returns an error if the catalog file cannot be loaded.
pub fn load_catalog(path: Option<&Path>) -> anyhow::Result<Arc<ResourceCatalog>> {
    let catalog = match path {
        Some(path) => ResourceCatalog::from_path(path)?,
        None => ResourceCatalog::aws(),
    };
    Ok(Arc::new(catalog))
}
