//! heat-skin - surface heat diffuse skinning driver
//!
//! Exports OBJ meshes and a bone list to the solver's text formats, runs
//! the solver, and merges the resulting weights into JSON vertex groups.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod check;
mod export;
mod manifest;
mod obj;
mod run;
mod scene;
mod solver;

#[derive(Parser)]
#[command(name = "heat-skin")]
#[command(about = "Surface heat diffuse skinning driver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging, solver lines in the log)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Export meshes, run the solver and write the merged weights
    Run(run::RunArgs),

    /// Write the solver input files only
    Export(export::ExportArgs),

    /// Validate manifest, meshes and solver location
    Check(check::CheckArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run::execute(args),
        Commands::Export(args) => export::execute(args),
        Commands::Check(args) => check::execute(args),
    }
}
