use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

mod commands;

use commands::convert;

#[derive(Parser)]
#[command(name = "aax-tool")]
#[command(about = "Removes Audible's AAX DRM wrapper and remuxes to plain M4A/M4B", long_about = None)]
struct Cli {
    /// Increase log verbosity (repeatable: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Suppress all but warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an Audible .aax audiobook to DRM-free .m4a/.m4b
    Convert(convert::ConvertArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Convert(args) => convert::handle(args),
    }
}
