//! Ogg/Opus output
//!
//! Frames are encoded in 20 ms Opus packets and streamed into an Ogg
//! container as they arrive. Opus only runs at 8/12/16/24/48 kHz; other
//! capture rates are resampled to 48 kHz with rubato first.
//!
//! Granule positions are always in 48 kHz units (RFC 7845). The most recent
//! packet is held back so it can be written with the end-of-stream flag.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ogg::writing::{PacketWriteEndInfo, PacketWriter};
use rubato::{FftFixedIn, Resampler};

use crate::application::ports::{AudioSink, SinkSpec};
use crate::domain::error::RecordingError;
use crate::domain::recording::AudioFrame;

/// Rates libopus accepts directly
const OPUS_RATES: [u32; 5] = [8_000, 12_000, 16_000, 24_000, 48_000];

/// Granule positions always count 48 kHz samples
const GRANULE_RATE: u32 = 48_000;

/// Encoder lookahead at 48 kHz, signalled as pre-skip
const PRE_SKIP: u16 = 312;

/// Packets per second (20 ms frames)
const FRAMES_PER_SECOND: u32 = 50;

const BITRATE_PER_CHANNEL: i32 = 64_000;

/// Largest packet libopus produces
const MAX_PACKET_SIZE: usize = 4_000;

const RESAMPLER_CHUNK: usize = 1_024;

const VENDOR: &[u8] = b"voxmemo";

pub struct OggOpusSink {
    writer: PacketWriter<'static, BufWriter<File>>,
    encoder: opus::Encoder,
    resampler: Option<StreamResampler>,
    serial: u32,
    channels: usize,
    input_rate: u32,
    /// Samples per channel in one Opus frame, at the encoder rate
    frame_size: usize,
    /// 48 kHz samples per encoder-rate sample
    granule_scale: u64,
    /// Interleaved PCM at the encoder rate, waiting for a full frame
    pcm: Vec<i16>,
    input_frames: u64,
    encoded_frames: u64,
    held: Option<(Vec<u8>, u64)>,
}

impl OggOpusSink {
    pub fn create(path: &Path, spec: &SinkSpec) -> Result<Self, RecordingError> {
        let create_error = |message: String| RecordingError::FileCreate {
            path: path.to_path_buf(),
            message,
        };

        let opus_channels = match spec.channels {
            1 => opus::Channels::Mono,
            2 => opus::Channels::Stereo,
            n => {
                return Err(create_error(format!(
                    "Ogg/Opus output supports 1 or 2 channels, not {}",
                    n
                )))
            }
        };

        let encoder_rate = if OPUS_RATES.contains(&spec.sample_rate) {
            spec.sample_rate
        } else {
            GRANULE_RATE
        };

        let mut encoder = opus::Encoder::new(encoder_rate, opus_channels, opus::Application::Audio)
            .map_err(|e| create_error(format!("Opus init failed: {}", e)))?;
        encoder
            .set_bitrate(opus::Bitrate::Bits(
                BITRATE_PER_CHANNEL * spec.channels as i32,
            ))
            .map_err(|e| create_error(format!("Opus init failed: {}", e)))?;

        let resampler = if encoder_rate != spec.sample_rate {
            Some(
                StreamResampler::new(spec.sample_rate, encoder_rate, spec.channels as usize)
                    .map_err(create_error)?,
            )
        } else {
            None
        };

        let file = File::create(path).map_err(|e| create_error(e.to_string()))?;

        let mut sink = Self {
            writer: PacketWriter::new(BufWriter::new(file)),
            encoder,
            resampler,
            serial: rand_serial(),
            channels: spec.channels as usize,
            input_rate: spec.sample_rate,
            frame_size: (encoder_rate / FRAMES_PER_SECOND) as usize,
            granule_scale: (GRANULE_RATE / encoder_rate) as u64,
            pcm: Vec::new(),
            input_frames: 0,
            encoded_frames: 0,
            held: None,
        };
        sink.write_headers()
            .map_err(|e| create_error(e.to_string()))?;

        Ok(sink)
    }

    /// Opus identification and comment headers, each on its own page
    fn write_headers(&mut self) -> Result<(), RecordingError> {
        let mut id_header = Vec::with_capacity(19);
        id_header.extend_from_slice(b"OpusHead");
        id_header.push(1); // version
        id_header.push(self.channels as u8);
        id_header.extend_from_slice(&PRE_SKIP.to_le_bytes());
        id_header.extend_from_slice(&self.input_rate.to_le_bytes());
        id_header.extend_from_slice(&0i16.to_le_bytes()); // output gain
        id_header.push(0); // mapping family: mono/stereo

        self.writer
            .write_packet(id_header, self.serial, PacketWriteEndInfo::EndPage, 0)
            .map_err(write_error)?;

        let mut comment_header = Vec::new();
        comment_header.extend_from_slice(b"OpusTags");
        comment_header.extend_from_slice(&(VENDOR.len() as u32).to_le_bytes());
        comment_header.extend_from_slice(VENDOR);
        comment_header.extend_from_slice(&0u32.to_le_bytes()); // no user comments

        self.writer
            .write_packet(comment_header, self.serial, PacketWriteEndInfo::EndPage, 0)
            .map_err(write_error)
    }

    /// Encode every complete frame sitting in `pcm`
    fn encode_ready(&mut self) -> Result<(), RecordingError> {
        let frame_len = self.frame_size * self.channels;
        while self.pcm.len() >= frame_len {
            let frame: Vec<i16> = self.pcm.drain(..frame_len).collect();
            self.encode_frame(&frame)?;
        }
        Ok(())
    }

    fn encode_frame(&mut self, frame: &[i16]) -> Result<(), RecordingError> {
        let mut packet = vec![0u8; MAX_PACKET_SIZE];
        let len = self
            .encoder
            .encode(frame, &mut packet)
            .map_err(|e| RecordingError::Write(format!("Opus encoding failed: {}", e)))?;
        packet.truncate(len);

        self.encoded_frames += self.frame_size as u64;
        let granule = self.encoded_frames * self.granule_scale;

        if let Some((previous, previous_granule)) = self.held.replace((packet, granule)) {
            self.writer
                .write_packet(
                    previous,
                    self.serial,
                    PacketWriteEndInfo::NormalPacket,
                    previous_granule,
                )
                .map_err(write_error)?;
        }
        Ok(())
    }

    /// Input length so far, in 48 kHz samples
    fn input_48k(&self) -> u64 {
        self.input_frames * GRANULE_RATE as u64 / self.input_rate as u64
    }

    /// Granule of the last packet: pre-skip plus the real input length,
    /// so players drop the padding added to fill the final frame.
    fn end_granule(&self) -> u64 {
        let encoded_48k = self.encoded_frames * self.granule_scale;
        (PRE_SKIP as u64 + self.input_48k()).min(encoded_48k)
    }
}

impl AudioSink for OggOpusSink {
    fn write_frame(&mut self, frame: &AudioFrame) -> Result<(), RecordingError> {
        self.input_frames += frame.frame_count() as u64;

        match self.resampler.as_mut() {
            Some(resampler) => resampler.push(frame.samples(), &mut self.pcm)?,
            None => self.pcm.extend_from_slice(frame.samples()),
        }
        self.encode_ready()
    }

    fn finalize(mut self: Box<Self>) -> Result<(), RecordingError> {
        let needed_48k = PRE_SKIP as u64 + self.input_48k();

        if let Some(mut resampler) = self.resampler.take() {
            resampler.flush(&mut self.pcm)?;
            // Granules must not run past the end granule
            let keep_frames = (needed_48k / self.granule_scale).saturating_sub(self.encoded_frames);
            self.pcm.truncate(keep_frames as usize * self.channels);
        }
        self.encode_ready()?;

        // Pad with silence until the encoder lookahead is covered, so the
        // decoded output reaches the last input sample.
        let frame_len = self.frame_size * self.channels;
        while self.encoded_frames * self.granule_scale < needed_48k {
            let mut last = std::mem::take(&mut self.pcm);
            last.resize(frame_len, 0);
            self.encode_frame(&last)?;
        }

        let end_granule = self.end_granule();
        if let Some((packet, _)) = self.held.take() {
            self.writer
                .write_packet(packet, self.serial, PacketWriteEndInfo::EndStream, end_granule)
                .map_err(write_error)?;
        }

        let mut file = self.writer.into_inner();
        file.flush().map_err(write_error)
    }
}

/// Incremental resampler over interleaved 16-bit PCM
struct StreamResampler {
    inner: FftFixedIn<f32>,
    /// Deinterleaved input waiting for a full chunk
    pending: Vec<Vec<f32>>,
}

impl StreamResampler {
    fn new(from: u32, to: u32, channels: usize) -> Result<Self, String> {
        let inner = FftFixedIn::<f32>::new(
            from as usize,
            to as usize,
            RESAMPLER_CHUNK,
            2, // sub-chunks
            channels,
        )
        .map_err(|e| format!("Resampler init failed: {}", e))?;

        Ok(Self {
            inner,
            pending: vec![Vec::new(); channels],
        })
    }

    fn push(&mut self, interleaved: &[i16], out: &mut Vec<i16>) -> Result<(), RecordingError> {
        let channels = self.pending.len();
        for frame in interleaved.chunks_exact(channels) {
            for (channel, &sample) in self.pending.iter_mut().zip(frame) {
                channel.push(sample as f32 / 32768.0);
            }
        }

        while self.pending[0].len() >= self.inner.input_frames_next() {
            let needed = self.inner.input_frames_next();
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|channel| channel.drain(..needed).collect())
                .collect();
            self.process(&chunk, out)?;
        }
        Ok(())
    }

    /// Push out whatever is still buffered, plus the resampler's own delay
    fn flush(&mut self, out: &mut Vec<i16>) -> Result<(), RecordingError> {
        let needed = self.inner.input_frames_next();
        let mut chunk: Vec<Vec<f32>> = self.pending.iter_mut().map(std::mem::take).collect();
        for channel in chunk.iter_mut() {
            channel.resize(needed, 0.0);
        }
        self.process(&chunk, out)?;

        let silence = vec![vec![0.0f32; self.inner.input_frames_next()]; self.pending.len()];
        self.process(&silence, out)
    }

    fn process(&mut self, chunk: &[Vec<f32>], out: &mut Vec<i16>) -> Result<(), RecordingError> {
        let resampled = self
            .inner
            .process(chunk, None)
            .map_err(|e| RecordingError::Write(format!("Resampling failed: {}", e)))?;

        let frames = resampled.first().map_or(0, Vec::len);
        out.reserve(frames * resampled.len());
        for i in 0..frames {
            for channel in &resampled {
                out.push((channel[i].clamp(-1.0, 1.0) * 32767.0) as i16);
            }
        }
        Ok(())
    }
}

fn write_error(e: std::io::Error) -> RecordingError {
    RecordingError::Write(format!("Failed to write Ogg page: {}", e))
}

/// Pseudo-random serial number for the Ogg stream
fn rand_serial() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (duration.as_secs() as u32) ^ duration.subsec_nanos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recording::AudioFormat;

    fn spec(sample_rate: u32, channels: u16) -> SinkSpec {
        SinkSpec {
            format: AudioFormat::Ogg,
            sample_rate,
            channels,
        }
    }

    fn record(path: &Path, spec: &SinkSpec, seconds: f32) {
        let mut sink: Box<dyn AudioSink> = Box::new(OggOpusSink::create(path, spec).unwrap());
        let total = (spec.sample_rate as f32 * seconds) as usize;
        let samples: Vec<i16> = (0..total)
            .flat_map(|i| {
                let t = i as f32 / spec.sample_rate as f32;
                let s = (f32::sin(2.0 * std::f32::consts::PI * 440.0 * t) * 8_000.0) as i16;
                std::iter::repeat(s).take(spec.channels as usize)
            })
            .collect();
        for chunk in samples.chunks(512 * spec.channels as usize) {
            sink.write_frame(&AudioFrame::new(chunk.to_vec(), spec.channels))
                .unwrap();
        }
        sink.finalize().unwrap();
    }

    /// Returns (packets, granule of the last page, saw end-of-stream)
    fn read_stream(path: &Path) -> (Vec<Vec<u8>>, u64, bool) {
        let file = File::open(path).unwrap();
        let mut reader = ogg::PacketReader::new(std::io::BufReader::new(file));
        let mut packets = Vec::new();
        let mut last_granule = 0;
        let mut eos = false;
        while let Some(packet) = reader.read_packet().unwrap() {
            last_granule = packet.absgp_page();
            eos |= packet.last_in_stream();
            packets.push(packet.data);
        }
        (packets, last_granule, eos)
    }

    #[test]
    fn writes_opus_headers_and_eos() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.ogg");
        record(&path, &spec(48_000, 1), 1.0);

        let (packets, granule, eos) = read_stream(&path);
        assert!(packets[0].starts_with(b"OpusHead"));
        assert_eq!(packets[0][9], 1);
        assert!(packets[1].starts_with(b"OpusTags"));
        // 50 audio packets of 20 ms, plus one covering the lookahead
        assert_eq!(packets.len(), 2 + 51);
        assert!(eos);
        assert_eq!(granule, PRE_SKIP as u64 + 48_000);
    }

    #[test]
    fn granule_is_in_48k_units_at_16k() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.ogg");
        record(&path, &spec(16_000, 2), 0.5);

        let (packets, granule, eos) = read_stream(&path);
        assert_eq!(packets[0][9], 2);
        assert!(eos);
        assert_eq!(granule, PRE_SKIP as u64 + 24_000);
    }

    #[test]
    fn resamples_44k1() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.ogg");
        record(&path, &spec(44_100, 1), 1.0);

        let (packets, granule, eos) = read_stream(&path);
        // Input rate is recorded in the header
        assert_eq!(
            u32::from_le_bytes([packets[0][12], packets[0][13], packets[0][14], packets[0][15]]),
            44_100
        );
        assert!(eos);
        assert_eq!(granule, PRE_SKIP as u64 + 48_000);
    }

    #[test]
    fn empty_recording_still_ends_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.ogg");
        let sink: Box<dyn AudioSink> =
            Box::new(OggOpusSink::create(&path, &spec(48_000, 1)).unwrap());
        sink.finalize().unwrap();

        let (packets, _, eos) = read_stream(&path);
        assert_eq!(packets.len(), 3);
        assert!(eos);
    }

    #[test]
    fn rejects_more_than_two_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.ogg");
        assert!(matches!(
            OggOpusSink::create(&path, &spec(48_000, 4)),
            Err(RecordingError::FileCreate { .. })
        ));
    }
}
