//! Command implementations

mod attributes;
mod classes;
mod config;
mod kind;
mod run;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;
use std::path::PathBuf;

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub remote: bool,
}

/// Execute a CLI command
pub fn execute(cli: Cli, output: &OutputWriter) -> Result<()> {
    let globals = GlobalOptions {
        config: cli.config,
        remote: cli.remote,
    };

    match cli.command {
        Commands::Kind(args) => kind::execute(args, &globals, output),
        Commands::Attributes(args) => attributes::execute(args, &globals, output),
        Commands::Classes(args) => classes::execute(args, &globals, output),
        Commands::Run(args) => run::execute(args, &globals, output),
        Commands::Config => config::execute(&globals, output),
    }
}
