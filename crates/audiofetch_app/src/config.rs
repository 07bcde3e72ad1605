use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use audiofetch_engine::{ApiSettings, DEFAULT_SERVER_URL};
use audiofetch_logging::af_info;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

pub const DEFAULT_CONFIG_FILE: &str = "audiofetch.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub storage_dir: PathBuf,
    pub download_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            storage_dir: PathBuf::from("./audiofetch_store"),
            download_dir: PathBuf::from("./downloads"),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Reads `path`, or the default file when none is given. A missing
    /// default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        let config = Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
        af_info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(server) = &cli.server {
            self.server_url = server.clone();
        }
        if let Some(storage) = &cli.storage {
            self.storage_dir = storage.clone();
        }
        if let Some(downloads) = &cli.downloads {
            self.download_dir = downloads.clone();
        }
        self
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.server_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
