//! `cairn graph`: print the stack dependency graph in Graphviz DOT format.

use std::sync::Arc;

use cairn_graph::ResourceCatalog;
use clap::Args;

use super::config::ConfigArgs;
use crate::topology;

/// Arguments for the `graph` command.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Deployment settings.
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Label each edge with the tokens and explicit dependencies behind it.
    #[arg(long)]
    pub labels: bool,
}

/// Executes the `graph` command.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete or composition fails.
pub fn execute(args: GraphArgs, catalog: Arc<ResourceCatalog>) -> anyhow::Result<()> {
    let config = args.config.resolve()?;
    let graph = topology::compose(&config, &catalog)?;

    let dot = if args.labels {
        graph.to_dot_labelled()
    } else {
        graph.to_dot()
    };
    print!("{dot}");
    Ok(())
}
