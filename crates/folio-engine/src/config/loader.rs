use super::schema::FolioConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./folio.yaml
    /// 2. ~/.folio/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<FolioConfig, ConfigError> {
        let local_config = PathBuf::from("./folio.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".folio").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(FolioConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<FolioConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<FolioConfig, ConfigError> {
        if content.trim().is_empty() {
            return Ok(FolioConfig::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}
