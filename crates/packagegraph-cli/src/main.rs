//! packagegraph CLI
//!
//! - `collect`: fetch a Debian or RPM repository's metadata and write it as
//!   an RDF graph (Turtle or N-Triples).
//! - `convert`: consolidate existing graph files into one output.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod collect;
mod convert;
mod logging;

#[derive(Parser)]
#[command(name = "packagegraph")]
#[command(
    author,
    version,
    about = "Package repository metadata as a linked-data graph"
)]
struct Cli {
    /// More log output (`-v` debug, `-vv` trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect one repository into a graph file.
    Collect(collect::CollectArgs),

    /// Merge graph files into one N-Triples file (or concatenate Turtle with `--concat`).
    Convert(convert::ConvertArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(logging::Verbosity::from_flags(cli.verbose, cli.quiet));

    match cli.command {
        Commands::Collect(args) => collect::cmd_collect(&args),
        Commands::Convert(args) => convert::cmd_convert(&args),
    }
}
