//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::recording::filename::{DEFAULT_TEMPLATE, DEFAULT_TIMESTAMP_FORMAT};
use crate::domain::recording::output::{
    default_output_folder, expand_home, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, MAX_CHANNELS,
};
use crate::domain::recording::{AudioFormat, DeviceSelector, FilenameTemplate, OutputConfiguration};

/// Quick labels offered out of the box
pub const DEFAULT_TAGS: &[&str] = &["IDEA", "TODO", "NOTE", "URGENT", "MEETING", "PERSONAL"];

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub output_folder: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub format: Option<String>,
    pub device: Option<String>,
    pub filename_template: Option<String>,
    pub timestamp_format: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            output_folder: Some(default_output_folder().to_string_lossy().to_string()),
            sample_rate: Some(DEFAULT_SAMPLE_RATE),
            channels: Some(DEFAULT_CHANNELS),
            format: Some(AudioFormat::default().to_string()),
            device: Some("default".to_string()),
            filename_template: Some(DEFAULT_TEMPLATE.to_string()),
            timestamp_format: Some(DEFAULT_TIMESTAMP_FORMAT.to_string()),
            tags: Some(DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            output_folder: other.output_folder.or(self.output_folder),
            sample_rate: other.sample_rate.or(self.sample_rate),
            channels: other.channels.or(self.channels),
            format: other.format.or(self.format),
            device: other.device.or(self.device),
            filename_template: other.filename_template.or(self.filename_template),
            timestamp_format: other.timestamp_format.or(self.timestamp_format),
            tags: other.tags.or(self.tags),
        }
    }

    /// Get the output folder with `~` expanded, or the default
    pub fn output_folder_or_default(&self) -> PathBuf {
        self.output_folder
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(expand_home)
            .unwrap_or_else(default_output_folder)
    }

    /// Get configured tags, or the built-in list if not set
    pub fn tags_or_default(&self) -> Vec<String> {
        match &self.tags {
            Some(tags) => tags.clone(),
            None => DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Look up a configured tag ignoring case, returning its configured spelling
    pub fn find_tag(&self, name: &str) -> Option<String> {
        self.tags_or_default()
            .into_iter()
            .find(|t| t.eq_ignore_ascii_case(name.trim()))
    }

    /// Resolve into the settings the recording pipeline reads.
    ///
    /// Unlike the `*_or_default` accessors this rejects invalid values,
    /// since starting a recording with a silently substituted format or rate
    /// would be surprising.
    pub fn output_config(&self) -> Result<OutputConfiguration, ConfigError> {
        let sample_rate = self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
        if sample_rate == 0 {
            return Err(invalid("sample_rate", "Value must be a positive number of Hz"));
        }

        let channels = self.channels.unwrap_or(DEFAULT_CHANNELS);
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(invalid(
                "channels",
                &format!("Value must be between 1 and {}", MAX_CHANNELS),
            ));
        }

        let format = match self.format.as_deref() {
            Some(s) => s
                .parse::<AudioFormat>()
                .map_err(|e| invalid("format", &e.to_string()))?,
            None => AudioFormat::default(),
        };
        if !format.is_supported() {
            return Err(invalid(
                "format",
                &format!("'{}' has no working encoder. Supported: {}", format, supported_list()),
            ));
        }

        let device = self
            .device
            .as_deref()
            .map(|s| s.parse::<DeviceSelector>().unwrap_or_default())
            .unwrap_or_default();

        // Check the template against the stock timestamp first so each
        // failure is reported under the key that caused it.
        let template = self.filename_template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        let timestamp_format = self
            .timestamp_format
            .as_deref()
            .unwrap_or(DEFAULT_TIMESTAMP_FORMAT);
        FilenameTemplate::new(template, DEFAULT_TIMESTAMP_FORMAT)
            .map_err(|e| invalid("filename_template", &e.to_string()))?;
        let filename = FilenameTemplate::new(template, timestamp_format)
            .map_err(|e| invalid("timestamp_format", &e.to_string()))?;

        Ok(OutputConfiguration {
            output_folder: self.output_folder_or_default(),
            sample_rate,
            channels,
            format,
            device,
            filename,
        })
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn supported_list() -> String {
    AudioFormat::supported()
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.sample_rate, Some(44_100));
        assert_eq!(config.channels, Some(1));
        assert_eq!(config.format, Some("wav".to_string()));
        assert_eq!(config.device, Some("default".to_string()));
        assert_eq!(config.filename_template, Some("{timestamp}_{label}".to_string()));
        assert_eq!(config.timestamp_format, Some("%Y%m%d_%H%M%S".to_string()));
        assert_eq!(config.tags.as_ref().unwrap().len(), 6);
        assert!(config.output_folder.unwrap().contains("VoiceMemos"));
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.output_folder.is_none());
        assert!(config.sample_rate.is_none());
        assert!(config.format.is_none());
        assert!(config.tags.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            sample_rate: Some(44_100),
            format: Some("wav".to_string()),
            channels: Some(1),
            ..Default::default()
        };

        let other = AppConfig {
            sample_rate: Some(48_000),
            format: None, // Should not override
            channels: Some(2),
            ..Default::default()
        };

        let merged = base.merge(other);

        assert_eq!(merged.sample_rate, Some(48_000));
        assert_eq!(merged.format, Some("wav".to_string())); // Kept from base
        assert_eq!(merged.channels, Some(2));
    }

    #[test]
    fn merge_preserves_base_when_other_is_none() {
        let base = AppConfig {
            device: Some("USB Mic".to_string()),
            tags: Some(vec!["A".to_string()]),
            ..Default::default()
        };

        let merged = base.merge(AppConfig::empty());

        assert_eq!(merged.device, Some("USB Mic".to_string()));
        assert_eq!(merged.tags, Some(vec!["A".to_string()]));
    }

    #[test]
    fn output_config_from_defaults() {
        let output = AppConfig::defaults().output_config().unwrap();
        assert_eq!(output.sample_rate, 44_100);
        assert_eq!(output.channels, 1);
        assert_eq!(output.format, AudioFormat::Wav);
        assert_eq!(output.device, DeviceSelector::Default);
    }

    #[test]
    fn output_config_from_empty_uses_defaults() {
        let output = AppConfig::empty().output_config().unwrap();
        assert_eq!(output.format, AudioFormat::Wav);
        assert!(output.output_folder.ends_with("Inbox"));
    }

    #[test]
    fn output_config_rejects_mp3() {
        let config = AppConfig {
            format: Some("mp3".to_string()),
            ..Default::default()
        };
        let err = config.output_config().unwrap_err();
        assert!(err.to_string().contains("format"));
        assert!(err.to_string().contains("no working encoder"));
    }

    #[test]
    fn output_config_rejects_bad_channels() {
        for channels in [0, 9] {
            let config = AppConfig {
                channels: Some(channels),
                ..Default::default()
            };
            assert!(config.output_config().is_err());
        }
    }

    #[test]
    fn output_config_rejects_zero_rate() {
        let config = AppConfig {
            sample_rate: Some(0),
            ..Default::default()
        };
        assert!(config.output_config().is_err());
    }

    #[test]
    fn output_config_rejects_bad_template() {
        let config = AppConfig {
            filename_template: Some("{when}".to_string()),
            ..Default::default()
        };
        let err = config.output_config().unwrap_err();
        assert!(err.to_string().contains("filename_template"));
    }

    #[test]
    fn output_config_blames_timestamp_format() {
        for pattern in ["%Q", "%Y/%m"] {
            let config = AppConfig {
                timestamp_format: Some(pattern.to_string()),
                ..Default::default()
            };
            match config.output_config().unwrap_err() {
                ConfigError::ValidationError { key, .. } => assert_eq!(key, "timestamp_format"),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn output_config_blames_template_when_both_are_bad() {
        let config = AppConfig {
            filename_template: Some("{when}".to_string()),
            timestamp_format: Some("%Q".to_string()),
            ..Default::default()
        };
        match config.output_config().unwrap_err() {
            ConfigError::ValidationError { key, .. } => assert_eq!(key, "filename_template"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn output_config_parses_device() {
        let config = AppConfig {
            device: Some("2".to_string()),
            ..Default::default()
        };
        assert_eq!(config.output_config().unwrap().device, DeviceSelector::Index(2));
    }

    #[test]
    fn output_folder_blank_falls_back() {
        let config = AppConfig {
            output_folder: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.output_folder_or_default(), default_output_folder());
    }

    #[test]
    fn find_tag_ignores_case() {
        let config = AppConfig::empty();
        assert_eq!(config.find_tag("idea"), Some("IDEA".to_string()));
        assert_eq!(config.find_tag("nope"), None);

        let custom = AppConfig {
            tags: Some(vec!["Standup".to_string()]),
            ..Default::default()
        };
        assert_eq!(custom.find_tag("STANDUP"), Some("Standup".to_string()));
        assert_eq!(custom.find_tag("idea"), None);
    }
}
