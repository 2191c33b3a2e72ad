//! Fairday CLI entry point.

use clap::Parser;

use fairday::cli::context::load_config;
use fairday::cli::{handle_error, Cli, Commands};
use fairday::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };
    let _logger = match LogConfig::try_from(&config.logging).and_then(|c| LoggerImpl::init(&c)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Init(args) => fairday::cli::commands::init::execute(args, &config, cli.json).await,
        Commands::Location(args) => fairday::cli::commands::location::execute(args, &config, cli.json).await,
        Commands::Task(args) => fairday::cli::commands::task::execute(args, &config, cli.today, cli.json).await,
        Commands::Forecast(args) => {
            fairday::cli::commands::forecast::execute(args, &config, cli.today, cli.json).await
        }
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
