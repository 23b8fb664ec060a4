//! Output file encoders
//!
//! - WAV: hound, streamed
//! - FLAC: flacenc, one block at a time
//! - Ogg: Opus packets in an Ogg container, streamed

mod flac;
mod ogg;
mod wav;

use std::path::Path;

use crate::application::ports::{AudioSink, SinkFactory, SinkSpec};
use crate::domain::error::RecordingError;
use crate::domain::recording::AudioFormat;

pub use self::flac::FlacSink;
pub use self::ogg::OggOpusSink;
pub use self::wav::WavSink;

/// Opens the sink matching the requested format
#[derive(Debug, Default, Clone, Copy)]
pub struct EncoderSinkFactory;

impl EncoderSinkFactory {
    pub fn new() -> Self {
        Self
    }
}

impl SinkFactory for EncoderSinkFactory {
    fn create(&self, path: &Path, spec: &SinkSpec) -> Result<Box<dyn AudioSink>, RecordingError> {
        match spec.format {
            AudioFormat::Wav => Ok(Box::new(WavSink::create(path, spec)?)),
            AudioFormat::Flac => Ok(Box::new(FlacSink::create(path, spec)?)),
            AudioFormat::Ogg => Ok(Box::new(OggOpusSink::create(path, spec)?)),
            AudioFormat::Mp3 => Err(RecordingError::UnsupportedFormat(AudioFormat::Mp3)),
        }
    }

    fn supported_formats(&self) -> Vec<AudioFormat> {
        AudioFormat::supported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp3_has_no_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let spec = SinkSpec {
            format: AudioFormat::Mp3,
            sample_rate: 44_100,
            channels: 1,
        };
        let result = EncoderSinkFactory.create(&dir.path().join("memo.mp3"), &spec);
        assert!(matches!(
            result,
            Err(RecordingError::UnsupportedFormat(AudioFormat::Mp3))
        ));
        assert!(!dir.path().join("memo.mp3").exists());
    }

    #[test]
    fn every_listed_format_can_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let factory = EncoderSinkFactory::new();
        let formats = factory.supported_formats();
        assert!(!formats.contains(&AudioFormat::Mp3));

        for format in formats {
            let path = dir.path().join(format!("memo.{}", format.extension()));
            let spec = SinkSpec {
                format,
                sample_rate: 48_000,
                channels: 1,
            };
            let sink = factory.create(&path, &spec).unwrap();
            sink.finalize().unwrap();
            assert!(path.exists());
        }
    }
}
