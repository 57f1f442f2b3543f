//! Configuration file
//!
//! ```toml
//! [client]
//! destination = "192.168.1.20:8000"
//!
//! [server]
//! queue_capacity = 256
//! allow_list_enabled = true
//! allow_list = ["192.168.1.20:0"]
//!
//! [server.receiver]
//! endpoint = "0.0.0.0:9000"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use oscwire_server::ServerConfig;
use oscwire_transport::ClientConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl FileConfig {
    /// Read `path`, or fall back to defaults when no file was given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.server.validate()?;
        Ok(config)
    }
}
