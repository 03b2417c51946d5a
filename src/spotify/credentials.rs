//! Spotify API credential persistence
//!
//! Credentials live in `<config-dir>/playsync/credentials.json`; the `auth`
//! command writes them, everything else reads them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Client-credentials pair for the Spotify Web API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl SpotifyCredentials {
    /// Path of the credentials file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("playsync").join("credentials.json"))
    }

    /// Load stored credentials
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let contents = fs::read_to_string(&path).with_context(|| {
            format!(
                "No Spotify credentials at {} (run `playsync auth` first)",
                path.display()
            )
        })?;

        let credentials: Self =
            serde_json::from_str(&contents).context("Failed to parse credentials file")?;

        debug!("Loaded credentials from {}", path.display());
        Ok(credentials)
    }

    /// Persist the credentials for later runs
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize credentials")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write credentials to {:?}", path))?;

        debug!("Saved credentials to {}", path.display());
        Ok(())
    }
}
