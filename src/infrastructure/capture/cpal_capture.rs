//! Audio input using cpal
//!
//! `cpal::Stream` is not `Send`, so each open stream lives on its own
//! keeper thread. The thread builds the stream, reports success or failure,
//! then parks until it is told to close.

use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, SizedSample, StreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::application::ports::{CaptureBackend, CaptureRequest, CaptureStream};
use crate::application::queue::FrameProducer;
use crate::domain::error::RecordingError;
use crate::domain::recording::{AudioFrame, DeviceDescriptor, DeviceSelector};

/// Sample formats we can turn into 16-bit frames, most preferred first
const PREFERRED_FORMATS: [SampleFormat; 3] = [SampleFormat::I16, SampleFormat::F32, SampleFormat::U16];

/// Capture backend for the platform's default audio host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalCapture;

impl CpalCapture {
    /// Create a new cpal-based capture backend
    pub fn new() -> Self {
        Self
    }

    fn select_device(selector: &DeviceSelector) -> Result<cpal::Device, RecordingError> {
        let host = cpal::default_host();

        if *selector == DeviceSelector::Default {
            return host
                .default_input_device()
                .ok_or_else(|| RecordingError::Device("No default input device".to_string()));
        }

        let devices = host
            .input_devices()
            .map_err(|e| RecordingError::Device(format!("Failed to list devices: {}", e)))?;

        devices
            .enumerate()
            .find(|(index, device)| {
                let name = device.name().unwrap_or_default();
                selector.matches(*index, &name)
            })
            .map(|(_, device)| device)
            .ok_or_else(|| RecordingError::Device(format!("No input device matches '{}'", selector)))
    }

    /// Pick a sample format the device supports at exactly this rate and
    /// channel count. No resampling or channel mixing happens on input.
    fn select_format(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
    ) -> Result<SampleFormat, RecordingError> {
        let ranges: Vec<SupportedStreamConfigRange> = device
            .supported_input_configs()
            .map_err(|e| RecordingError::Device(format!("Failed to get configs: {}", e)))?
            .collect();

        let fits = |range: &SupportedStreamConfigRange, format: SampleFormat| {
            range.sample_format() == format
                && range.channels() == channels
                && range.min_sample_rate().0 <= sample_rate
                && range.max_sample_rate().0 >= sample_rate
        };

        PREFERRED_FORMATS
            .into_iter()
            .find(|format| ranges.iter().any(|range| fits(range, *format)))
            .ok_or_else(|| {
                RecordingError::Device(format!(
                    "'{}' does not support {} Hz with {} channel(s)",
                    device.name().unwrap_or_default(),
                    sample_rate,
                    channels
                ))
            })
    }

    fn build_stream(
        request: &CaptureRequest,
        producer: FrameProducer,
    ) -> Result<cpal::Stream, RecordingError> {
        let device = Self::select_device(&request.device)?;
        let format = Self::select_format(&device, request.sample_rate, request.channels)?;
        let channels = request.channels;
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(request.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        debug!(
            device = %device.name().unwrap_or_default(),
            ?format,
            sample_rate = request.sample_rate,
            channels,
            "opening input stream"
        );

        let stream = match format {
            SampleFormat::I16 => build_input::<i16>(&device, &config, producer, move |data| {
                AudioFrame::new(data.to_vec(), channels)
            }),
            SampleFormat::F32 => build_input::<f32>(&device, &config, producer, move |data| {
                AudioFrame::from_f32(data, channels)
            }),
            SampleFormat::U16 => build_input::<u16>(&device, &config, producer, move |data| {
                AudioFrame::from_u16(data, channels)
            }),
            other => {
                return Err(RecordingError::Device(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| RecordingError::Device(format!("Failed to start stream: {}", e)))?;

        Ok(stream)
    }
}

/// Build an input stream whose callback only converts and enqueues
fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    producer: FrameProducer,
    convert: impl Fn(&[T]) -> AudioFrame + Send + 'static,
) -> Result<cpal::Stream, RecordingError>
where
    T: SizedSample,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let frame = convert(data);
                if !frame.is_empty() {
                    producer.push(frame);
                }
            },
            |err| warn!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| RecordingError::Device(format!("Failed to open stream: {}", e)))
}

impl CaptureBackend for CpalCapture {
    fn list_input_devices(&self) -> Result<Vec<DeviceDescriptor>, RecordingError> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(|e| RecordingError::Device(format!("Failed to list devices: {}", e)))?;

        let descriptors = devices
            .enumerate()
            .map(|(id, device)| {
                let name = device.name().unwrap_or_else(|_| format!("Device {}", id));
                let max_input_channels = device
                    .supported_input_configs()
                    .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                    .unwrap_or(0);
                let default_sample_rate = device
                    .default_input_config()
                    .map(|c| c.sample_rate().0)
                    .unwrap_or(0);
                let is_default = default_name.as_deref() == Some(name.as_str());

                DeviceDescriptor {
                    id,
                    name,
                    max_input_channels,
                    default_sample_rate,
                    is_default,
                }
            })
            .collect();

        Ok(descriptors)
    }

    fn open(
        &self,
        request: &CaptureRequest,
        producer: FrameProducer,
    ) -> Result<Box<dyn CaptureStream>, RecordingError> {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), RecordingError>>(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let request = request.clone();

        let thread = std::thread::Builder::new()
            .name("voxmemo-capture".to_string())
            .spawn(move || {
                let stream = match Self::build_stream(&request, producer) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Returns on an explicit stop or when the handle is dropped
                let _ = stop_rx.recv();

                if let Err(e) = stream.pause() {
                    debug!("pausing input stream: {}", e);
                }
                drop(stream);
                debug!("input stream released");
            })
            .map_err(|e| RecordingError::Device(format!("Failed to start capture thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("input stream running");
                Ok(Box::new(CpalStream {
                    stop_tx: Some(stop_tx),
                    thread: Some(thread),
                }))
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(RecordingError::Device(
                    "Capture thread exited before the stream opened".to_string(),
                ))
            }
        }
    }
}

/// Handle to a stream running on its keeper thread
pub struct CpalStream {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureStream for CpalStream {
    fn close(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        // Once joined, the callback (and its producer) is gone
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.close();
    }
}
