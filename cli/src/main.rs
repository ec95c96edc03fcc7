use anyhow::Context;
use clap::Parser;
use theme_porter::args::Cli;
use theme_porter::{commands, config, logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = match config::init_config(cli.config.as_deref()) {
        Ok(app_config) => app_config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    logger::setup_logger(app_config.logging()).context("Failed to initialize logger")?;

    if let Err(e) = commands::run(cli.command, app_config).await {
        log::error!("{e}");
        eprintln!("{e}");
        std::process::exit(1);
    }

    Ok(())
}
