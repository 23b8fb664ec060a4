//! voxmemo - voice memo recorder
//!
//! This crate records microphone audio straight to disk. A hardware
//! callback pushes frames into a queue; a dedicated writer thread drains it
//! into a WAV, FLAC or Ogg/Opus file named from a timestamp and a label.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects (formats, frames, file names, sessions) and errors
//! - **Application**: Recording controller, frame queue, writer thread, port traits
//! - **Infrastructure**: Adapter implementations (cpal, hound, flacenc, Ogg/Opus, TOML config)
//! - **CLI**: Command-line interface, argument parsing, and logging setup

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
