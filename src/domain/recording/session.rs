//! Recording session entity

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Local};
use thiserror::Error;

use super::AudioFormat;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Running,
    Stopped,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when a session is stopped twice
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub action: String,
}

/// One start-to-stop recording.
///
/// State machine:
///   RUNNING -> STOPPED (stop)
#[derive(Debug, Clone)]
pub struct RecordingSession {
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
    format: AudioFormat,
    started_at: DateTime<Local>,
    started: Instant,
    stopped_after: Option<StdDuration>,
    state: SessionState,
}

impl RecordingSession {
    /// Create a running session
    pub fn start(path: PathBuf, sample_rate: u32, channels: u16, format: AudioFormat) -> Self {
        Self {
            path,
            sample_rate,
            channels,
            format,
            started_at: Local::now(),
            started: Instant::now(),
            stopped_after: None,
            state: SessionState::Running,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Wall-clock start time
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Time since start, frozen once stopped
    pub fn elapsed(&self) -> StdDuration {
        self.stopped_after
            .unwrap_or_else(|| self.started.elapsed())
    }

    /// Transition from RUNNING to STOPPED
    pub fn stop(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Running {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "stop recording".to_string(),
            });
        }
        self.stopped_after = Some(self.started.elapsed());
        self.state = SessionState::Stopped;
        Ok(())
    }
}
