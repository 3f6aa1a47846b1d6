//! `cairn catalog`: print the attribute schema of every resource kind.

use cairn_graph::ResourceCatalog;
use clap::Args;

use super::Format;
use crate::output;

/// Arguments for the `catalog` command.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    pub format: Format,
}

/// Executes the `catalog` command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(args: CatalogArgs, catalog: &ResourceCatalog) -> anyhow::Result<()> {
    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(catalog)?),
        Format::Text => print!("{}", output::format_catalog(catalog)),
    }
    Ok(())
}
