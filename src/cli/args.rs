//! CLI argument definitions using Clap

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::recording::{AudioFormat, Duration};

/// voxmemo - record voice memos straight to disk
#[derive(Parser, Debug)]
#[command(name = "voxmemo")]
#[command(version)]
#[command(about = "Record voice memos from the microphone to WAV, FLAC or Ogg files")]
#[command(long_about = None)]
pub struct Cli {
    /// Free-text label for the file name
    #[arg(short = 'l', long, value_name = "TEXT")]
    pub label: Option<String>,

    /// Quick label from the configured tag list (repeatable)
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Stop automatically after this long (e.g., 30s, 1m, 2m30s)
    #[arg(short = 'd', long, value_name = "TIME")]
    pub duration: Option<String>,

    /// Input device: "default", an id from `voxmemo devices`, or a name
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Output encoding
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<FormatArg>,

    /// Output folder
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<String>,

    /// Capture sample rate in Hz
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Capture channel count
    #[arg(long, value_name = "N")]
    pub channels: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List audio input devices
    Devices {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List output formats that can be recorded
    Formats,
    /// Print the output folder, creating it if needed
    Folder,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Format argument for clap ValueEnum. Only formats with an encoder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Wav,
    Flac,
    Ogg,
}

impl From<FormatArg> for AudioFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Wav => AudioFormat::Wav,
            FormatArg::Flac => AudioFormat::Flac,
            FormatArg::Ogg => AudioFormat::Ogg,
        }
    }
}

/// Parsed record options
#[derive(Debug, Clone)]
pub struct RecordOptions {
    /// Tags and free label, already composed
    pub label: String,
    /// `None` records until Ctrl+C
    pub duration: Option<Duration>,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "output_folder",
    "sample_rate",
    "channels",
    "format",
    "device",
    "filename_template",
    "timestamp_format",
    "tags",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["voxmemo"]);
        assert!(cli.label.is_none());
        assert!(cli.tags.is_empty());
        assert!(cli.duration.is_none());
        assert!(cli.device.is_none());
        assert!(cli.format.is_none());
        assert!(cli.output.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_record_options() {
        let cli = Cli::parse_from([
            "voxmemo", "-l", "standup", "-t", "idea", "--tag", "todo", "-d", "30s", "-f", "flac",
            "-o", "/tmp/memos", "--sample-rate", "48000", "--channels", "2", "--device", "USB",
        ]);
        assert_eq!(cli.label, Some("standup".to_string()));
        assert_eq!(cli.tags, vec!["idea".to_string(), "todo".to_string()]);
        assert_eq!(cli.duration, Some("30s".to_string()));
        assert_eq!(cli.format, Some(FormatArg::Flac));
        assert_eq!(cli.output, Some("/tmp/memos".to_string()));
        assert_eq!(cli.sample_rate, Some(48_000));
        assert_eq!(cli.channels, Some(2));
        assert_eq!(cli.device, Some("USB".to_string()));
    }

    #[test]
    fn cli_rejects_mp3() {
        assert!(Cli::try_parse_from(["voxmemo", "-f", "mp3"]).is_err());
    }

    #[test]
    fn cli_parses_devices_json() {
        let cli = Cli::parse_from(["voxmemo", "devices", "--json"]);
        assert!(matches!(cli.command, Some(Commands::Devices { json: true })));
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["voxmemo", "config", "set", "format", "ogg"]);
        if let Some(Commands::Config {
            action: ConfigAction::Set { key, value },
        }) = cli.command
        {
            assert_eq!(key, "format");
            assert_eq!(value, "ogg");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn format_arg_converts() {
        assert_eq!(AudioFormat::from(FormatArg::Wav), AudioFormat::Wav);
        assert_eq!(AudioFormat::from(FormatArg::Ogg), AudioFormat::Ogg);
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("output_folder"));
        assert!(is_valid_config_key("tags"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
