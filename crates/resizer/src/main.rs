//! Resizer CLI - batch image resizing on a fixed pool of worker threads.
//!
//! Every supported image in the source folder becomes one task; a pool of
//! worker threads resizes them in parallel and writes the results under the
//! destination folder, mirroring the source layout.
//!
//! # Usage
//!
//! ```bash
//! # Resize a folder with the configured defaults
//! resizer run --source ./photos --dest ./thumbs
//!
//! # Override the target size and write a per-file report
//! resizer run -s ./photos -d ./thumbs --width 320 --height 240 --mode fit --report run.jsonl
//!
//! # View configuration
//! resizer config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Resizer - batch image resizing on a fixed pool of worker threads.
#[derive(Parser, Debug)]
#[command(name = "resizer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resize every supported image in the source folder
    Run(cli::run::RunArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Run(args) => args.config.clone(),
        Commands::Config(_) => None,
    };

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match cli::load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) if config_path.is_some() => return Err(e),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `resizer config path`."
            );
            resizer_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Resizer v{}", resizer_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config),
        Commands::Config(args) => cli::config::execute(args),
    }
}
