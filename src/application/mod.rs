//! Application layer - Use cases and port interfaces
//!
//! Contains the recording controller, its worker thread and queue, and the
//! trait definitions for capture, encoding and configuration.

pub mod ports;
pub mod queue;
pub mod recording;
pub mod writer;

pub use queue::{frame_queue, FrameConsumer, FrameProducer, Pop, QueueStats};
pub use recording::{RecordingController, StoppedRecording, DEFAULT_JOIN_TIMEOUT};
pub use writer::{
    FileWriterWorker, PendingWriter, WriterHandle, WriterJoin, WriterOutcome, WriterState,
};
