//! `cairn plan`: compose the stacks and print the provisioning plan.

use std::sync::Arc;

use cairn_graph::{ResourceCatalog, synthesize};
use clap::Args;

use super::Format;
use super::config::ConfigArgs;
use crate::{output, topology};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Deployment settings.
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    pub format: Format,
}

/// Executes the `plan` command.
///
/// Resolves the configuration, composes the stream-lines stacks, orders and
/// validates them, and prints the resulting plan.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete, composition fails,
/// or the graph has a cycle or an unresolvable token.
pub fn execute(args: PlanArgs, catalog: Arc<ResourceCatalog>) -> anyhow::Result<()> {
    let config = args.config.resolve()?;
    let graph = topology::compose(&config, &catalog)?;
    let plan = synthesize(&graph)?;

    match args.format {
        Format::Json => println!("{}", plan.to_json()?),
        Format::Text => print!("{}", output::format_plan(&plan, &plan.fingerprint()?)),
    }
    Ok(())
}
