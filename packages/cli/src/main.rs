mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    block, diff, index, init, resolve, BlockArgs, DiffArgs, IndexArgs, InitArgs, ResolveArgs,
};
use tracing_subscriber::EnvFilter;

/// Onlook CLI - map rendered elements back to source and edit it
#[derive(Parser, Debug)]
#[command(name = "onlook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default onlook.config.json
    Init(InitArgs),

    /// Index a project and list its instrumented elements
    Index(IndexArgs),

    /// Show the source location of an element
    Resolve(ResolveArgs),

    /// Print an element's source
    Block(BlockArgs),

    /// Compile edit requests into code diffs
    Diff(DiffArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    tracing::debug!(command = ?cli.command, cwd = %cwd, "running");

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Index(args) => index(args, &cwd).await,
        Command::Resolve(args) => resolve(args, &cwd).await,
        Command::Block(args) => block(args, &cwd).await,
        Command::Diff(args) => diff(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
