//! Output encoding value object

use std::fmt;
use std::str::FromStr;

use crate::domain::error::FormatParseError;

/// Audio container/codec of a recording.
///
/// `Mp3` is recognised so that configs naming it get a clear
/// "unsupported" error instead of a parse error, but there is no MP3
/// encoder and it is never listed as supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioFormat {
    #[default]
    Wav,
    Flac,
    Ogg,
    Mp3,
}

impl AudioFormat {
    /// Every known format, supported or not
    pub const ALL: [AudioFormat; 4] = [Self::Wav, Self::Flac, Self::Ogg, Self::Mp3];

    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
        }
    }

    /// File extension (without the dot)
    pub const fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Whether a working encoder exists for this format
    pub const fn is_supported(&self) -> bool {
        !matches!(self, Self::Mp3)
    }

    /// Formats that can actually be recorded, in display order
    pub fn supported() -> Vec<AudioFormat> {
        Self::ALL.into_iter().filter(|f| f.is_supported()).collect()
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| FormatParseError {
                input: s.to_string(),
            })
    }
}
