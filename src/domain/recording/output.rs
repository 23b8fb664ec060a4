//! Resolved output settings for the recording pipeline

use std::path::PathBuf;

use super::{AudioFormat, DeviceSelector, FilenameTemplate};

/// Default sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default channel count (mono)
pub const DEFAULT_CHANNELS: u16 = 1;

/// Highest channel count accepted from configuration
pub const MAX_CHANNELS: u16 = 8;

/// Everything the pipeline reads when a recording starts.
/// Changes only take effect on the next start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfiguration {
    pub output_folder: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
    pub device: DeviceSelector,
    pub filename: FilenameTemplate,
}

impl OutputConfiguration {
    /// Defaults with the given output folder
    pub fn with_folder(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            format: AudioFormat::default(),
            device: DeviceSelector::default(),
            filename: FilenameTemplate::default(),
        }
    }
}

/// `~/VoiceMemos/Inbox`, or a relative `VoiceMemos/Inbox` without a home dir
pub fn default_output_folder() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("VoiceMemos").join("Inbox"))
        .unwrap_or_else(|| PathBuf::from("VoiceMemos").join("Inbox"))
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_folder_uses_defaults() {
        let config = OutputConfiguration::with_folder("/tmp/memos");
        assert_eq!(config.output_folder, PathBuf::from("/tmp/memos"));
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.channels, 1);
        assert_eq!(config.format, AudioFormat::Wav);
        assert_eq!(config.device, DeviceSelector::Default);
        assert_eq!(config.filename.template(), "{timestamp}_{label}");
    }

    #[test]
    fn default_folder_ends_in_inbox() {
        let folder = default_output_folder();
        assert!(folder.ends_with("VoiceMemos/Inbox"));
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/var/memos"), PathBuf::from("/var/memos"));
        assert_eq!(expand_home("rel/dir"), PathBuf::from("rel/dir"));
    }

    #[test]
    fn expand_home_replaces_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/memos"), home.join("memos"));
            assert_eq!(expand_home("~"), home);
        }
    }
}
