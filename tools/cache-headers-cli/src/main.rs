//! Cache headers CLI - inspect rules and generate proxy config.
//!
//! Commands:
//! - `cache-headers check` - Validate configuration and list rules
//! - `cache-headers resolve` - Show the decision and headers for a path
//! - `cache-headers vcl` - Print the Varnish `vcl_hash` snippet
//! - `cache-headers init` - Write a default configuration file

mod commands;
mod context;
mod output;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CheckArgs, InitArgs, ResolveArgs, VclArgs};

/// Cache headers - check rules and generate reverse proxy config
#[derive(Parser)]
#[command(name = "cache-headers")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Inspect(InspectCommand),

    /// Write a default configuration file
    Init(InitArgs),
}

/// Commands that read an existing configuration.
#[derive(Subcommand)]
enum InspectCommand {
    /// Validate configuration and print the ordered rule table
    Check(CheckArgs),

    /// Show the decision and headers for a request path
    Resolve(ResolveArgs),

    /// Print the Varnish vcl_hash snippet
    Vcl(VclArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let output = output::Output::new(cli.verbose, cli.json);

    let result = match cli.command {
        // Init writes the config, so it must not require one to exist.
        Commands::Init(args) => std::env::current_dir()
            .context("Failed to get current directory")
            .and_then(|cwd| commands::init::run(args, &cwd, &output)),
        Commands::Inspect(command) => context::Context::load(cli.config.as_deref(), output.clone())
            .and_then(|ctx| dispatch(command, &ctx)),
    };

    if let Err(e) = result {
        output.fail(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

fn dispatch(command: InspectCommand, ctx: &context::Context) -> Result<()> {
    match command {
        InspectCommand::Check(args) => commands::check::run(args, ctx),
        InspectCommand::Resolve(args) => commands::resolve::run(args, ctx),
        InspectCommand::Vcl(args) => commands::vcl::run(args, ctx),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
