//! Background file writer
//!
//! State machine:
//!   IDLE -> WRITING (thread starts with an open sink)
//!   WRITING -> DRAINING (stop signal, or the capture side went away)
//!   DRAINING -> CLOSED (queue empty, file finalized)
//!   WRITING -> CLOSED (write error; the partial file is still finalized)

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, warn};

use super::ports::AudioSink;
use super::queue::{FrameConsumer, Pop};
use crate::domain::error::RecordingError;
use crate::domain::recording::AudioFrame;

/// How long one pop waits before re-checking the stop flag
pub const WRITER_POLL_INTERVAL: StdDuration = StdDuration::from_millis(100);

/// Writer states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriterState {
    #[default]
    Idle,
    Writing,
    Draining,
    Closed,
}

impl WriterState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Writing => "writing",
            Self::Draining => "draining",
            Self::Closed => "closed",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Writing,
            2 => Self::Draining,
            3 => Self::Closed,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the writer thread did
#[derive(Debug, Clone, Default)]
pub struct WriterOutcome {
    pub frames_written: u64,
    pub samples_written: u64,
    /// A write or finalize failure; the file holds whatever was written before it
    pub error: Option<RecordingError>,
}

#[derive(Clone, Default)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn set(&self, state: WriterState) {
        self.0.store(state as u8, Ordering::SeqCst);
        debug!(state = %state, "writer state");
    }

    fn get(&self) -> WriterState {
        WriterState::from_u8(self.0.load(Ordering::SeqCst))
    }
}

/// Spawns the writer thread
pub struct FileWriterWorker;

impl FileWriterWorker {
    /// Start writing frames from `consumer` into `sink` on a new thread.
    pub fn spawn(
        sink: Box<dyn AudioSink>,
        consumer: FrameConsumer,
        poll_interval: StdDuration,
    ) -> std::io::Result<WriterHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let state = SharedState::default();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        let thread_stop = Arc::clone(&stop);
        let thread_state = state.clone();
        let thread = std::thread::Builder::new()
            .name("voxmemo-writer".to_string())
            .spawn(move || {
                let outcome = run(sink, consumer, &thread_stop, &thread_state, poll_interval);
                let _ = done_tx.send(outcome);
            })?;

        Ok(WriterHandle {
            stop,
            state,
            done_rx,
            thread: Some(thread),
        })
    }
}

/// How a stop request ended
#[derive(Debug)]
pub enum WriterJoin {
    /// The file is closed
    Finished(WriterOutcome),
    /// Still draining or finalizing after the join timeout
    Pending(PendingWriter),
}

/// Control handle for a running writer thread
pub struct WriterHandle {
    stop: Arc<AtomicBool>,
    state: SharedState,
    done_rx: Receiver<WriterOutcome>,
    thread: Option<JoinHandle<()>>,
}

impl WriterHandle {
    /// Signal the writer to drain and close, then wait up to `timeout`.
    ///
    /// A writer still busy after `timeout` comes back as
    /// [`WriterJoin::Pending`]; it keeps running and closes the file on its own
    /// as long as the process lives.
    pub fn stop_and_join(mut self, timeout: StdDuration) -> WriterJoin {
        self.stop.store(true, Ordering::SeqCst);

        match self.done_rx.recv_timeout(timeout) {
            Ok(outcome) => {
                join_thread(self.thread.take());
                WriterJoin::Finished(outcome)
            }
            Err(RecvTimeoutError::Timeout) => WriterJoin::Pending(PendingWriter {
                timeout,
                state: self.state.clone(),
                done_rx: self.done_rx.clone(),
                thread: self.thread.take(),
            }),
            Err(RecvTimeoutError::Disconnected) => {
                join_thread(self.thread.take());
                WriterJoin::Finished(exited_early())
            }
        }
    }
}

/// A writer that outlived its join timeout
pub struct PendingWriter {
    timeout: StdDuration,
    state: SharedState,
    done_rx: Receiver<WriterOutcome>,
    thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for PendingWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWriter")
            .field("timeout", &self.timeout)
            .field("state", &self.state.get())
            .finish()
    }
}

impl PendingWriter {
    /// Where the writer thread is right now
    pub fn state(&self) -> WriterState {
        self.state.get()
    }

    /// The warning reported for this writer
    pub fn timeout_error(&self) -> RecordingError {
        RecordingError::JoinTimeout(self.timeout)
    }

    /// Block until the writer has closed the file
    pub fn wait(mut self) -> WriterOutcome {
        let outcome = self.done_rx.recv().unwrap_or_else(|_| exited_early());
        join_thread(self.thread.take());
        outcome
    }
}

fn join_thread(thread: Option<JoinHandle<()>>) {
    if let Some(thread) = thread {
        if thread.join().is_err() {
            warn!("writer thread panicked");
        }
    }
}

fn exited_early() -> WriterOutcome {
    WriterOutcome {
        error: Some(RecordingError::Write(
            "Writer thread exited without finishing the file".to_string(),
        )),
        ..Default::default()
    }
}

fn run(
    mut sink: Box<dyn AudioSink>,
    consumer: FrameConsumer,
    stop: &AtomicBool,
    state: &SharedState,
    poll_interval: StdDuration,
) -> WriterOutcome {
    let mut outcome = WriterOutcome::default();
    state.set(WriterState::Writing);

    while !stop.load(Ordering::SeqCst) {
        match consumer.pop(poll_interval) {
            Pop::Frame(frame) => {
                if !write(&mut *sink, &frame, &mut outcome) {
                    break;
                }
            }
            Pop::Empty => continue,
            Pop::Disconnected => break,
        }
    }

    if outcome.error.is_none() {
        state.set(WriterState::Draining);
        debug!(queued = consumer.len(), "draining");
        while let Pop::Frame(frame) = consumer.try_pop() {
            if !write(&mut *sink, &frame, &mut outcome) {
                break;
            }
        }
    }

    if let Err(e) = sink.finalize() {
        warn!("finalizing output failed: {}", e);
        outcome.error.get_or_insert(e);
    }
    state.set(WriterState::Closed);

    debug!(
        frames = outcome.frames_written,
        samples = outcome.samples_written,
        "writer finished"
    );
    outcome
}

/// Returns false once the sink has failed
fn write(sink: &mut dyn AudioSink, frame: &AudioFrame, outcome: &mut WriterOutcome) -> bool {
    match sink.write_frame(frame) {
        Ok(()) => {
            outcome.frames_written += 1;
            outcome.samples_written += frame.samples().len() as u64;
            true
        }
        Err(e) => {
            warn!("write failed, closing output early: {}", e);
            outcome.error = Some(e);
            false
        }
    }
}
