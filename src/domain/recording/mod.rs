//! Recording value objects and entities

pub mod device;
pub mod duration;
pub mod filename;
pub mod format;
pub mod frame;
pub mod output;
pub mod session;

pub use device::{DeviceDescriptor, DeviceSelector};
pub use duration::{format_clock, Duration};
pub use filename::{
    compose_label, generate_filename, resolve_collision, sanitize_label, FilenameTemplate,
};
pub use format::AudioFormat;
pub use frame::AudioFrame;
pub use output::OutputConfiguration;
pub use session::{RecordingSession, SessionState};
