//! Audio capture port

use crate::application::queue::FrameProducer;
use crate::domain::error::RecordingError;
use crate::domain::recording::{DeviceDescriptor, DeviceSelector};

/// What to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub device: DeviceSelector,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Port for the audio input subsystem
pub trait CaptureBackend: Send + Sync {
    /// List input devices currently present.
    fn list_input_devices(&self) -> Result<Vec<DeviceDescriptor>, RecordingError>;

    /// Open an input stream and start delivering frames into `producer`.
    ///
    /// The registered callback may only copy the hardware buffer and call
    /// [`FrameProducer::push`]; no I/O, no locks, no waiting.
    ///
    /// # Errors
    /// `RecordingError::Device` if the device is missing, busy, or can't do
    /// the requested rate/channel count.
    fn open(
        &self,
        request: &CaptureRequest,
        producer: FrameProducer,
    ) -> Result<Box<dyn CaptureStream>, RecordingError>;
}

/// A running input stream
pub trait CaptureStream: Send {
    /// Stop delivering frames and release the device. Idempotent.
    fn close(&mut self);
}
