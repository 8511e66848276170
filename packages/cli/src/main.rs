mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{fuzz, normalize, parse, ranges, selser, FuzzArgs, NormalizeArgs, ParseArgs, RangesArgs, SelserArgs};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Selser - selective serialization of edited documents
#[derive(Parser, Debug)]
#[command(name = "selser")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log diff and serialization decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./selser.config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse markup and print its DOM with provenance
    Parse(ParseArgs),

    /// Serialize an edited DOM, reusing unchanged source
    Selser(SelserArgs),

    /// Print the normalized form of a DOM
    Normalize(NormalizeArgs),

    /// Round-trip random edits of markup files
    Fuzz(FuzzArgs),

    /// Map a textual change back to the nodes it touches
    Ranges(RangesArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| Config::load(&cwd.display().to_string(), cli.config.as_deref()))
        .and_then(|config| match cli.command {
            Command::Parse(args) => parse(args, &config),
            Command::Selser(args) => selser(args, &config),
            Command::Normalize(args) => normalize(args, &config),
            Command::Fuzz(args) => fuzz(args, &config),
            Command::Ranges(args) => ranges(args, &config),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
