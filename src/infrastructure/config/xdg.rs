//! XDG config store adapter

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Environment variable that points at an alternative config file
pub const CONFIG_PATH_ENV: &str = "VOXMEMO_CONFIG";

/// Config file under `$XDG_CONFIG_HOME/voxmemo/config.toml`
pub struct XdgConfigStore {
    path: PathBuf,
}

/// Written at the top of a fresh config file
const HEADER: &str = "# voxmemo configuration\n# Unset keys fall back to built-in defaults.\n\n";

fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("voxmemo")
        .join("config.toml")
}

impl XdgConfigStore {
    pub fn new() -> Self {
        Self {
            path: default_path(),
        }
    }

    /// Use `$VOXMEMO_CONFIG` if set and non-empty, the XDG path otherwise
    pub fn from_env() -> Self {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => {
                debug!(path = ?path, "config path from {}", CONFIG_PATH_ENV);
                Self::with_path(path)
            }
            _ => Self::new(),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse_toml(content: &str) -> Result<AppConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn to_toml(config: &AppConfig) -> Result<String, ConfigError> {
        toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    fn write_error(&self, e: io::Error) -> ConfigError {
        ConfigError::WriteError(format!("{}: {}", self.path.display(), e))
    }

    /// Sibling file the new contents go to before replacing the real one
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn ensure_parent(&self) -> Result<(), ConfigError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e)),
            _ => Ok(()),
        }
    }
}

impl Default for XdgConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for XdgConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Self::parse_toml(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file");
                Ok(AppConfig::empty())
            }
            Err(e) => Err(ConfigError::ReadError(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Replaces the file in one rename so a crash never leaves half a config
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let body = Self::to_toml(config)?;
        self.ensure_parent().await?;

        let staging = self.staging_path();
        fs::write(&staging, format!("{}{}", HEADER, body))
            .await
            .map_err(|e| self.write_error(e))?;
        if let Err(e) = fs::rename(&staging, &self.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(self.write_error(e));
        }

        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Creates the file only if nothing is there yet
    async fn init(&self) -> Result<(), ConfigError> {
        let body = Self::to_toml(&AppConfig::defaults())?;
        self.ensure_parent().await?;

        let created = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await;
        let mut file = match created {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(ConfigError::AlreadyExists(
                    self.path.display().to_string(),
                ))
            }
            Err(e) => return Err(self.write_error(e)),
        };

        let written = async {
            file.write_all(HEADER.as_bytes()).await?;
            file.write_all(body.as_bytes()).await?;
            file.flush().await
        }
        .await;
        written.map_err(|e| self.write_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_xdg() {
        let store = XdgConfigStore::new();
        let path = store.path();
        assert!(path.to_string_lossy().contains("voxmemo"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn custom_path() {
        let store = XdgConfigStore::with_path("/custom/path/config.toml");
        assert_eq!(store.path(), PathBuf::from("/custom/path/config.toml"));
    }

    #[test]
    fn parse_toml_flat_format() {
        let content = r#"
output_folder = "~/Memos"
sample_rate = 48000
channels = 2
format = "flac"
tags = ["IDEA", "STANDUP"]
"#;

        let config = XdgConfigStore::parse_toml(content).unwrap();
        assert_eq!(config.output_folder, Some("~/Memos".to_string()));
        assert_eq!(config.sample_rate, Some(48_000));
        assert_eq!(config.channels, Some(2));
        assert_eq!(config.format, Some("flac".to_string()));
        assert_eq!(
            config.tags,
            Some(vec!["IDEA".to_string(), "STANDUP".to_string()])
        );
        assert!(config.device.is_none());
    }

    #[test]
    fn parse_toml_rejects_wrong_types() {
        let err = XdgConfigStore::parse_toml("sample_rate = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn to_toml_round_trip() {
        let config = AppConfig::defaults();
        let toml = XdgConfigStore::to_toml(&config).unwrap();
        let parsed = XdgConfigStore::parse_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("config.toml"));
        assert_eq!(store.load().await.unwrap(), AppConfig::empty());
    }

    #[tokio::test]
    async fn init_then_init_again_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("nested").join("config.toml"));

        store.init().await.unwrap();
        assert!(store.exists());
        assert_eq!(store.load().await.unwrap(), AppConfig::defaults());

        assert!(matches!(
            store.init().await,
            Err(ConfigError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn save_replaces_file_and_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sample_rate = 8000").unwrap();
        let store = XdgConfigStore::with_path(&path);

        let config = AppConfig {
            sample_rate: Some(48_000),
            ..Default::default()
        };
        store.save(&config).await.unwrap();

        assert_eq!(store.load().await.unwrap(), config);
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("# voxmemo"));
        assert!(!dir.path().join("config.toml.tmp").exists());
    }

    #[tokio::test]
    async fn directory_in_the_way_is_read_error_naming_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::create_dir(&path).unwrap();

        let store = XdgConfigStore::with_path(&path);
        assert!(!store.exists());
        match store.load().await {
            Err(ConfigError::ReadError(message)) => assert!(message.contains("config.toml")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn broken_file_loads_empty_with_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let store = XdgConfigStore::with_path(&path);
        assert!(store.load().await.is_err());
        assert_eq!(store.load_or_empty().await, AppConfig::empty());
    }
}
