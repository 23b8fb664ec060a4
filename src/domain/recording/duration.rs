//! Recording time limit

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// How long to record before stopping on its own (`--duration 2m30s`).
///
/// Whole seconds, never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    secs: u64,
}

impl Duration {
    /// `None` for zero
    pub const fn from_secs(secs: u64) -> Option<Self> {
        if secs == 0 {
            None
        } else {
            Some(Self { secs })
        }
    }

    pub const fn as_secs(&self) -> u64 {
        self.secs
    }

    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_secs(self.secs)
    }
}

/// Split `"12m"` into `(12, "")`, requiring at least one digit before `unit`
fn take_component(input: &str, unit: char) -> Option<(u64, &str)> {
    let end = input.find(unit)?;
    let digits = &input[..end];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, &input[end + unit.len_utf8()..]))
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Accepts `<n>s`, `<n>m` and `<n>m<n>s`, ignoring case and
    /// surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DurationParseError {
            input: s.to_string(),
        };
        let input = s.trim().to_ascii_lowercase();

        let (minutes, rest) = match take_component(&input, 'm') {
            Some((minutes, rest)) => (Some(minutes), rest),
            None => (None, input.as_str()),
        };
        let seconds = match take_component(rest, 's') {
            Some((seconds, "")) => seconds,
            None if minutes.is_some() && rest.is_empty() => 0,
            _ => return Err(invalid()),
        };
        let minutes = minutes.unwrap_or(0);

        minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(seconds))
            .and_then(Self::from_secs)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.secs / 60, self.secs % 60) {
            (0, s) => write!(f, "{}s", s),
            (m, 0) => write!(f, "{}m", m),
            (m, s) => write!(f, "{}m{}s", m, s),
        }
    }
}

/// Format an elapsed time as `mm:ss` (minutes keep growing past 59).
pub fn format_clock(elapsed: StdDuration) -> String {
    let total_secs = elapsed.as_secs();
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
