//! # cairn: stack composition CLI
//!
//! Composes the stream-lines infrastructure stacks from configuration,
//! validates the dependency graph, and prints the provisioning plan.

mod commands;
mod output;
mod topology;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
