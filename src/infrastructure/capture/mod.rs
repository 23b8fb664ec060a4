//! Audio capture infrastructure

mod cpal_capture;

pub use cpal_capture::{CpalCapture, CpalStream};
