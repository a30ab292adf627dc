//! CLI entry point for chromatic-harmony.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail};

use chromatic_harmony::cli::run;
use chromatic_harmony::cli_args::Cli;
use chromatic_harmony::config::AppConfig;
use chromatic_harmony::logging::init_logging;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Explicit --config must exist; the default location is optional
    let config_file = match &cli.config {
        Some(path) if !path.is_file() => bail!("Config file {} not found", path.display()),
        Some(path) => Some(path.clone()),
        None => AppConfig::default_path().filter(|p| p.is_file()),
    };
    let config = AppConfig::load_layered(config_file.as_deref(), &cli.config_overrides())
        .wrap_err("Failed to load configuration")?;

    let _guard = init_logging(
        config.logging.file.as_deref(),
        Some(config.logging.level.as_str()),
    );

    run(&cli, &config)
}
