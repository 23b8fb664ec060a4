//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod sink;

// Re-export common types
pub use capture::{CaptureBackend, CaptureRequest, CaptureStream};
pub use config::ConfigStore;
pub use sink::{AudioSink, SinkFactory, SinkSpec};
