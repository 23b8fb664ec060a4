//! WAV output via hound
//!
//! 16-bit integer PCM, written incrementally. The RIFF sizes are patched
//! when the file is finalized.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::application::ports::{AudioSink, SinkSpec};
use crate::domain::error::RecordingError;
use crate::domain::recording::AudioFrame;

const BITS_PER_SAMPLE: u16 = 16;

pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
}

impl WavSink {
    pub fn create(path: &Path, spec: &SinkSpec) -> Result<Self, RecordingError> {
        let wav_spec = WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(path, wav_spec).map_err(|e| RecordingError::FileCreate {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self { writer })
    }
}

impl AudioSink for WavSink {
    fn write_frame(&mut self, frame: &AudioFrame) -> Result<(), RecordingError> {
        for &sample in frame.samples() {
            self.writer
                .write_sample(sample)
                .map_err(|e| RecordingError::Write(e.to_string()))?;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<(), RecordingError> {
        self.writer
            .finalize()
            .map_err(|e| RecordingError::Write(format!("Failed to finalize WAV: {}", e)))
    }
}
