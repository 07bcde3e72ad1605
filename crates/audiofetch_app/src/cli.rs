use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Terminal client for the audiofetch download service.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "audiofetch", version)]
pub struct Cli {
    /// Server base URL, e.g. http://127.0.0.1:8000
    #[arg(long)]
    pub server: Option<String>,
    /// RON config file (defaults to ./audiofetch.ron when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory holding the credential and auto-download ledger
    #[arg(long)]
    pub storage: Option<PathBuf>,
    /// Directory retrieved artifacts are saved into
    #[arg(long)]
    pub downloads: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogTarget {
    Terminal,
    #[default]
    File,
    Both,
}
