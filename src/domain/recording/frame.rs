//! Captured audio buffer

/// One buffer of interleaved 16-bit samples, as delivered by a single
/// hardware callback.
///
/// Frames move from the capture callback through the queue to the writer
/// and are consumed exactly once, so they are never cloned on that path.
#[derive(Debug, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Vec<i16>,
    channels: u16,
}

impl AudioFrame {
    /// Wrap interleaved i16 samples
    pub fn new(samples: Vec<i16>, channels: u16) -> Self {
        Self {
            samples,
            channels: channels.max(1),
        }
    }

    /// Copy and convert normalized f32 samples
    pub fn from_f32(data: &[f32], channels: u16) -> Self {
        let samples = data
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();
        Self::new(samples, channels)
    }

    /// Copy and convert unsigned 16-bit samples (offset binary)
    pub fn from_u16(data: &[u16], channels: u16) -> Self {
        let samples = data.iter().map(|&s| (s as i32 - 32768) as i16).collect();
        Self::new(samples, channels)
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_divides_by_channels() {
        let frame = AudioFrame::new(vec![1, 2, 3, 4, 5, 6], 2);
        assert_eq!(frame.frame_count(), 3);
        assert_eq!(frame.channels(), 2);
    }

    #[test]
    fn zero_channels_treated_as_mono() {
        let frame = AudioFrame::new(vec![1, 2], 0);
        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.frame_count(), 2);
    }

    #[test]
    fn f32_conversion_clamps() {
        let frame = AudioFrame::from_f32(&[0.0, 1.0, -1.0, 2.0, -2.0], 1);
        assert_eq!(frame.samples(), &[0, 32767, -32767, 32767, -32767]);
    }

    #[test]
    fn u16_conversion_recenters() {
        let frame = AudioFrame::from_u16(&[32768, 0, 65535], 1);
        assert_eq!(frame.samples(), &[0, -32768, 32767]);
    }
}
