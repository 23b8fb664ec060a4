//! Encoded output file port

use std::path::Path;

use crate::domain::error::RecordingError;
use crate::domain::recording::{AudioFormat, AudioFrame};

/// Parameters for opening an output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkSpec {
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub channels: u16,
}

/// An open output file in some encoding.
///
/// Owned by the writer thread. Frames are appended in the order given.
pub trait AudioSink: Send {
    /// Append one frame's samples.
    /// Errors are reported as `RecordingError::Write`.
    fn write_frame(&mut self, frame: &AudioFrame) -> Result<(), RecordingError>;

    /// Flush, patch headers and close the file.
    fn finalize(self: Box<Self>) -> Result<(), RecordingError>;
}

/// Port for opening output files
pub trait SinkFactory: Send + Sync {
    /// Create (truncate) `path` and prepare it for writing.
    ///
    /// # Errors
    /// `RecordingError::FileCreate` if the path isn't writable,
    /// `RecordingError::UnsupportedFormat` if there is no encoder.
    fn create(&self, path: &Path, spec: &SinkSpec) -> Result<Box<dyn AudioSink>, RecordingError>;

    /// Formats `create` can produce
    fn supported_formats(&self) -> Vec<AudioFormat>;
}
