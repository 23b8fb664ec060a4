//! Domain error types

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use thiserror::Error;

use crate::domain::recording::AudioFormat;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format: <number>s, <number>m, or <number>m<number>s (e.g., 30s, 1m, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when an unknown audio format name is provided
#[derive(Debug, Clone, Error)]
#[error("Invalid format: \"{input}\". Valid formats are: wav, flac, ogg")]
pub struct FormatParseError {
    pub input: String,
}

/// Error when a filename template or timestamp pattern cannot produce a file name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilenameError {
    #[error("Unknown placeholder '{{{0}}}' in filename template. Valid placeholders: {{timestamp}}, {{label}}")]
    UnknownPlaceholder(String),

    #[error("Unclosed '{{' in filename template: \"{0}\"")]
    UnclosedPlaceholder(String),

    #[error("Invalid timestamp format: \"{0}\"")]
    InvalidTimestampFormat(String),

    #[error("File name must not contain path separators: \"{0}\"")]
    PathSeparator(String),

    #[error("Filename template produced an empty file name")]
    Empty,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

/// Errors raised by the recording pipeline.
///
/// `Device`, `Directory`, `FileCreate`, `UnsupportedFormat` and `Filename`
/// abort `start`. `Write` and `JoinTimeout` never abort anything: the session
/// still ends in the stopped state and they are reported as warnings.
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Cannot create output directory {}: {message}", .path.display())]
    Directory { path: PathBuf, message: String },

    #[error("Cannot create output file {}: {message}", .path.display())]
    FileCreate { path: PathBuf, message: String },

    #[error("Write failed, partial recording kept: {0}")]
    Write(String),

    #[error("Writer did not finish within {}ms; the file is still being written", .0.as_millis())]
    JoinTimeout(StdDuration),

    #[error("Format '{0}' is not supported for recording (no working encoder)")]
    UnsupportedFormat(AudioFormat),

    #[error(transparent)]
    Filename(#[from] FilenameError),
}

impl RecordingError {
    /// Whether this error is reported as a warning on a finished recording
    /// rather than failing the operation.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Write(_) | Self::JoinTimeout(_))
    }
}
