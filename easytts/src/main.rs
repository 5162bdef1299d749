//! EasyTTS CLI Entry Point

use clap::Parser;
use easytts::cli::{Cli, Commands};
use easytts::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_with_verbosity(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Synth(args) => easytts::cli::synth::execute(args, config).await,
        Commands::Endpoints(args) => easytts::cli::endpoints::execute(args, config).await,
        Commands::Import(args) => easytts::cli::import::execute(args).await,
        Commands::Discover(args) => easytts::cli::discover::execute(args).await,
        Commands::Presets(args) => easytts::cli::presets::execute(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
