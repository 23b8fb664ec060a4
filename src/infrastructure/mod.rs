//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with cpal, the audio encoders and the config file.

pub mod capture;
pub mod config;
pub mod encoding;

// Re-export adapters
pub use capture::CpalCapture;
pub use config::XdgConfigStore;
pub use encoding::EncoderSinkFactory;
