//! Recording session controller
//!
//! Ties the capture backend, the frame queue, the writer thread and the
//! filename rules together behind `start`/`stop`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::ports::{CaptureBackend, CaptureRequest, CaptureStream, SinkFactory, SinkSpec};
use super::queue::{frame_queue, QueueStats};
use super::writer::{
    FileWriterWorker, PendingWriter, WriterHandle, WriterJoin, WriterOutcome, WRITER_POLL_INTERVAL,
};
use crate::domain::error::RecordingError;
use crate::domain::recording::{
    resolve_collision, AudioFormat, DeviceDescriptor, OutputConfiguration, RecordingSession,
};

/// How long `stop` waits for the writer to drain
pub const DEFAULT_JOIN_TIMEOUT: StdDuration = StdDuration::from_secs(2);

/// Result of stopping a recording
#[derive(Debug)]
pub struct StoppedRecording {
    pub path: PathBuf,
    pub duration: StdDuration,
    pub frames_written: u64,
    /// `Write` / `JoinTimeout` problems; the file exists but may be short
    pub warnings: Vec<RecordingError>,
    /// Set when the writer was still busy at the join timeout
    pub pending: Option<PendingWriter>,
}

impl StoppedRecording {
    /// Whether the file is still being written
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Block until a writer that outlived the join timeout has closed the
    /// file. Its `JoinTimeout` warning is replaced by the real outcome.
    pub fn wait_for_writer(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.warnings
            .retain(|w| !matches!(w, RecordingError::JoinTimeout(_)));
        let outcome = pending.wait();
        debug!(
            path = %self.path.display(),
            frames = outcome.frames_written,
            "late writer finished"
        );
        self.absorb(outcome);
    }

    fn absorb(&mut self, outcome: WriterOutcome) {
        self.frames_written = outcome.frames_written;
        if let Some(e) = outcome.error {
            warn!(path = %self.path.display(), "{}", e);
            self.warnings.push(e);
        }
    }
}

struct ActiveRecording {
    session: RecordingSession,
    capture: Box<dyn CaptureStream>,
    writer: WriterHandle,
    stats: QueueStats,
}

/// Start/stop controller for one recording at a time
pub struct RecordingController<C: CaptureBackend, S: SinkFactory> {
    capture: C,
    sinks: S,
    config: Mutex<OutputConfiguration>,
    active: Mutex<Option<ActiveRecording>>,
    join_timeout: StdDuration,
}

impl<C: CaptureBackend, S: SinkFactory> RecordingController<C, S> {
    /// Create a new controller
    pub fn new(capture: C, sinks: S, config: OutputConfiguration) -> Self {
        Self {
            capture,
            sinks,
            config: Mutex::new(config),
            active: Mutex::new(None),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }

    /// Override how long `stop` waits for the writer
    pub fn with_join_timeout(mut self, timeout: StdDuration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Current output configuration
    pub fn config(&self) -> OutputConfiguration {
        self.config.lock().clone()
    }

    /// Replace the output configuration; a running recording is unaffected
    pub fn update_config(&self, config: OutputConfiguration) {
        *self.config.lock() = config;
    }

    /// Output folder, created if missing
    pub fn output_folder(&self) -> Result<PathBuf, RecordingError> {
        let folder = self.config.lock().output_folder.clone();
        ensure_dir(&folder)?;
        Ok(folder)
    }

    /// Start recording with the current local time as timestamp.
    /// Returns the output path; if already recording, returns that path.
    pub fn start(&self, label: &str) -> Result<PathBuf, RecordingError> {
        self.start_at(label, Local::now().naive_local())
    }

    /// Start recording, naming the file after `timestamp`
    pub fn start_at(
        &self,
        label: &str,
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, RecordingError> {
        let mut active = self.active.lock();
        if let Some(recording) = active.as_ref() {
            debug!("start ignored, already recording");
            return Ok(recording.session.path().to_path_buf());
        }

        let config = self.config();
        if !config.format.is_supported() {
            return Err(RecordingError::UnsupportedFormat(config.format));
        }

        ensure_dir(&config.output_folder)?;
        let file_name = config
            .filename
            .generate(&timestamp, label, config.format.extension())?;
        let path = resolve_collision(&config.output_folder, &file_name);

        let spec = SinkSpec {
            format: config.format,
            sample_rate: config.sample_rate,
            channels: config.channels,
        };
        let sink = self.sinks.create(&path, &spec)?;

        // Writer first, so the very first captured frame has somewhere to go
        let (producer, consumer) = frame_queue();
        let stats = producer.stats();
        let writer = match FileWriterWorker::spawn(sink, consumer, WRITER_POLL_INTERVAL) {
            Ok(writer) => writer,
            Err(e) => {
                discard_file(&path);
                return Err(writer_start_error(&path, e));
            }
        };

        let request = CaptureRequest {
            device: config.device.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
        };
        let capture = match self.capture.open(&request, producer) {
            Ok(capture) => capture,
            Err(e) => {
                if let WriterJoin::Pending(pending) = writer.stop_and_join(self.join_timeout) {
                    // The file must be closed before it can be removed
                    pending.wait();
                }
                discard_file(&path);
                return Err(e);
            }
        };

        info!(
            path = %path.display(),
            format = %config.format,
            sample_rate = config.sample_rate,
            channels = config.channels,
            device = %config.device,
            "recording started"
        );

        *active = Some(ActiveRecording {
            session: RecordingSession::start(
                path.clone(),
                config.sample_rate,
                config.channels,
                config.format,
            ),
            capture,
            writer,
            stats,
        });

        Ok(path)
    }

    /// Stop recording. Returns `None` if nothing was recording.
    ///
    /// Capture stops first so no new frames arrive, then the writer drains
    /// the queue and closes the file. If the writer doesn't finish within
    /// the join timeout a `JoinTimeout` warning is attached and the writer
    /// keeps going; [`StoppedRecording::wait_for_writer`] waits for it. The
    /// session is stopped either way.
    pub fn stop(&self) -> Option<StoppedRecording> {
        let mut active = self.active.lock();
        let ActiveRecording {
            mut session,
            mut capture,
            writer,
            stats,
        } = active.take()?;

        capture.close();

        let join = writer.stop_and_join(self.join_timeout);
        let rejected = stats.rejected();
        if rejected > 0 {
            warn!(rejected, "frames captured after the writer closed were not saved");
        }

        if let Err(e) = session.stop() {
            debug!("{}", e);
        }

        let mut stopped = StoppedRecording {
            path: session.path().to_path_buf(),
            duration: session.elapsed(),
            frames_written: 0,
            warnings: Vec::new(),
            pending: None,
        };
        match join {
            WriterJoin::Finished(outcome) => stopped.absorb(outcome),
            WriterJoin::Pending(pending) => {
                let e = pending.timeout_error();
                warn!(path = %stopped.path.display(), state = %pending.state(), "{}", e);
                stopped.warnings.push(e);
                stopped.pending = Some(pending);
            }
        }

        info!(
            path = %stopped.path.display(),
            frames = stopped.frames_written,
            captured = stats.pushed(),
            elapsed_ms = stopped.duration.as_millis() as u64,
            pending = stopped.is_pending(),
            "recording stopped"
        );

        Some(stopped)
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Snapshot of the running session
    pub fn active_session(&self) -> Option<RecordingSession> {
        self.active
            .lock()
            .as_ref()
            .map(|recording| recording.session.clone())
    }

    /// Input devices with at least one input channel
    pub fn list_input_devices(&self) -> Result<Vec<DeviceDescriptor>, RecordingError> {
        let devices = self.capture.list_input_devices()?;
        Ok(devices
            .into_iter()
            .filter(|d| d.max_input_channels > 0)
            .collect())
    }

    /// Formats that can be recorded right now
    pub fn list_supported_formats(&self) -> Vec<AudioFormat> {
        self.sinks
            .supported_formats()
            .into_iter()
            .filter(|f| f.is_supported())
            .collect()
    }
}

impl<C: CaptureBackend, S: SinkFactory> Drop for RecordingController<C, S> {
    fn drop(&mut self) {
        if let Some(mut stopped) = self.stop() {
            stopped.wait_for_writer();
            debug!(path = %stopped.path.display(), "recording stopped on drop");
        }
    }
}

fn ensure_dir(path: &Path) -> Result<(), RecordingError> {
    fs::create_dir_all(path).map_err(|e| RecordingError::Directory {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn writer_start_error(path: &Path, e: std::io::Error) -> RecordingError {
    RecordingError::FileCreate {
        path: path.to_path_buf(),
        message: format!("failed to start writer thread: {}", e),
    }
}

fn discard_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!(path = %path.display(), "could not remove unused output file: {}", e);
    }
}
