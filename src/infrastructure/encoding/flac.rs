//! FLAC output via flacenc
//!
//! Samples are encoded one fixed-size block at a time as they arrive and
//! each FLAC frame goes straight to disk, so memory stays at one block and
//! closing the file only encodes the final partial block. STREAMINFO is
//! written up front with unknown totals and patched when the file closes.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flacenc::bitsink::ByteSink;
use flacenc::component::{BitRepr, StreamInfo};
use flacenc::config;
use flacenc::error::{Verified, Verify};
use flacenc::source::{Fill, FrameBuf};
use tracing::debug;

use crate::application::ports::{AudioSink, SinkSpec};
use crate::domain::error::RecordingError;
use crate::domain::recording::AudioFrame;

const BITS_PER_SAMPLE: usize = 16;

const MAGIC: &[u8; 4] = b"fLaC";

const STREAMINFO_LEN: usize = 34;

/// The metadata block follows the magic
const METADATA_OFFSET: u64 = 4;

/// Largest sample count the 36-bit STREAMINFO field can hold
const MAX_TOTAL_SAMPLES: u64 = (1 << 36) - 1;

pub struct FlacSink {
    file: BufWriter<File>,
    path: PathBuf,
    config: Verified<config::Encoder>,
    stream_info: StreamInfo,
    block_size: usize,
    sample_rate: u32,
    channels: usize,
    /// Interleaved samples short of a full block
    pending: Vec<i32>,
    frame_number: usize,
    /// Samples per channel encoded so far
    total_samples: u64,
    frame_bytes: Option<(usize, usize)>,
}

impl FlacSink {
    pub fn create(path: &Path, spec: &SinkSpec) -> Result<Self, RecordingError> {
        let create_error = |message: String| RecordingError::FileCreate {
            path: path.to_path_buf(),
            message,
        };

        let config = config::Encoder::default()
            .into_verified()
            .map_err(|(_, e)| create_error(format!("FLAC config error: {:?}", e)))?;
        let stream_info = StreamInfo::new(
            spec.sample_rate as usize,
            spec.channels as usize,
            BITS_PER_SAMPLE,
        )
        .map_err(|e| create_error(format!("FLAC stream error: {:?}", e)))?;
        let block_size = config.block_size;

        let file = File::create(path).map_err(|e| create_error(e.to_string()))?;

        let mut sink = Self {
            file: BufWriter::new(file),
            path: path.to_path_buf(),
            config,
            stream_info,
            block_size,
            sample_rate: spec.sample_rate,
            channels: spec.channels as usize,
            pending: Vec::with_capacity(block_size * spec.channels as usize),
            frame_number: 0,
            total_samples: 0,
            frame_bytes: None,
        };

        let header = sink.header();
        sink.file
            .write_all(MAGIC)
            .and_then(|()| sink.file.write_all(&header))
            .map_err(|e| create_error(e.to_string()))?;

        Ok(sink)
    }

    /// Metadata block header plus STREAMINFO for what has been written so far
    fn header(&self) -> Vec<u8> {
        let (min_frame, max_frame) = self.frame_bytes.unwrap_or((0, 0));
        streaminfo_block(&StreamInfoFields {
            block_size: self.block_size as u16,
            min_frame_bytes: min_frame as u32,
            max_frame_bytes: max_frame as u32,
            sample_rate: self.sample_rate,
            channels: self.channels as u8,
            bits_per_sample: BITS_PER_SAMPLE as u8,
            total_samples: self.total_samples,
        })
    }

    /// Encode every full block sitting in `pending`
    fn encode_ready(&mut self) -> Result<(), RecordingError> {
        let block_len = self.block_size * self.channels;
        while self.pending.len() >= block_len {
            let block: Vec<i32> = self.pending.drain(..block_len).collect();
            self.encode_block(&block)?;
        }
        Ok(())
    }

    fn encode_block(&mut self, interleaved: &[i32]) -> Result<(), RecordingError> {
        let block_samples = interleaved.len() / self.channels;
        let mut framebuf = FrameBuf::with_size(self.channels, block_samples).map_err(encode_error)?;
        framebuf.fill_interleaved(interleaved).map_err(encode_error)?;

        let frame = flacenc::encode_fixed_size_frame(
            &self.config,
            &framebuf,
            self.frame_number,
            &self.stream_info,
        )
        .map_err(encode_error)?;

        let mut bits = ByteSink::new();
        frame.write(&mut bits).map_err(encode_error)?;
        let bytes = bits.into_inner();
        self.file
            .write_all(&bytes)
            .map_err(|e| RecordingError::Write(e.to_string()))?;

        self.frame_number += 1;
        self.total_samples += block_samples as u64;
        self.frame_bytes = Some(match self.frame_bytes {
            Some((min, max)) => (min.min(bytes.len()), max.max(bytes.len())),
            None => (bytes.len(), bytes.len()),
        });
        Ok(())
    }

    /// Rewrite STREAMINFO with the final totals
    fn patch_header(&mut self) -> Result<(), RecordingError> {
        let header = self.header();
        self.file
            .seek(SeekFrom::Start(METADATA_OFFSET))
            .and_then(|_| self.file.write_all(&header))
            .and_then(|()| self.file.seek(SeekFrom::End(0)).map(|_| ()))
            .and_then(|()| self.file.flush())
            .map_err(|e| RecordingError::Write(format!("Failed to finish FLAC header: {}", e)))
    }
}

impl AudioSink for FlacSink {
    fn write_frame(&mut self, frame: &AudioFrame) -> Result<(), RecordingError> {
        self.pending
            .extend(frame.samples().iter().map(|&s| i32::from(s)));
        self.encode_ready()
    }

    fn finalize(mut self: Box<Self>) -> Result<(), RecordingError> {
        let tail = std::mem::take(&mut self.pending);
        let encoded = if tail.is_empty() {
            Ok(())
        } else {
            self.encode_block(&tail)
        };

        // Patch even after a failed tail so earlier frames stay playable
        let patched = self.patch_header();
        debug!(
            path = %self.path.display(),
            frames = self.frame_number,
            samples = self.total_samples,
            "FLAC closed"
        );
        encoded.and(patched)
    }
}

struct StreamInfoFields {
    block_size: u16,
    min_frame_bytes: u32,
    max_frame_bytes: u32,
    sample_rate: u32,
    channels: u8,
    bits_per_sample: u8,
    total_samples: u64,
}

/// Last-metadata-block header followed by a 34-byte STREAMINFO body.
/// Zero frame sizes, zero total and a zero MD5 all mean "unknown".
fn streaminfo_block(fields: &StreamInfoFields) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + STREAMINFO_LEN);
    out.push(0x80); // last block, type 0
    out.extend_from_slice(&(STREAMINFO_LEN as u32).to_be_bytes()[1..]);

    out.extend_from_slice(&fields.block_size.to_be_bytes());
    out.extend_from_slice(&fields.block_size.to_be_bytes());
    out.extend_from_slice(&fields.min_frame_bytes.to_be_bytes()[1..]);
    out.extend_from_slice(&fields.max_frame_bytes.to_be_bytes()[1..]);

    let packed = (u64::from(fields.sample_rate) & 0xF_FFFF) << 44
        | (u64::from(fields.channels.saturating_sub(1)) & 0x7) << 41
        | (u64::from(fields.bits_per_sample.saturating_sub(1)) & 0x1F) << 36
        | fields.total_samples.min(MAX_TOTAL_SAMPLES);
    out.extend_from_slice(&packed.to_be_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out
}

fn encode_error<E: fmt::Debug>(e: E) -> RecordingError {
    RecordingError::Write(format!("FLAC encoding failed: {:?}", e))
}
