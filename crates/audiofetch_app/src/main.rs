mod cli;
mod config;
mod platform;

use anyhow::Context;
use audiofetch_logging::{af_info, LogDestination, DEFAULT_LOG_FILE};
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, LogTarget};
use crate::config::ClientConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let destination = match cli.log {
        LogTarget::File => LogDestination::File(DEFAULT_LOG_FILE.into()),
        LogTarget::Terminal => LogDestination::Terminal,
        LogTarget::Both => LogDestination::Both(DEFAULT_LOG_FILE.into()),
    };
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    audiofetch_logging::initialize(destination, level);

    let config = ClientConfig::load(cli.config.as_deref())?.with_overrides(&cli);
    af_info!("Starting audiofetch against {}", config.server_url);

    platform::app::run_app(config).context("client stopped with an error")
}
