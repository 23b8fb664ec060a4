//! Configuration port interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Port for the configuration collaborator.
///
/// The recording pipeline never reads this directly; the CLI loads a config,
/// resolves it into an `OutputConfiguration` and hands that over.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the stored config. A missing file yields an empty config.
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Write the config, creating parent directories as needed.
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    /// Location of the backing file
    fn path(&self) -> PathBuf;

    /// Whether the backing file exists
    fn exists(&self) -> bool;

    /// Write the defaults. Fails with `AlreadyExists` if a file is present.
    async fn init(&self) -> Result<(), ConfigError>;

    /// Load, treating unreadable or unparsable files as empty.
    async fn load_or_empty(&self) -> AppConfig {
        match self.load().await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %self.path().display(), "ignoring config file: {}", e);
                AppConfig::empty()
            }
        }
    }
}
