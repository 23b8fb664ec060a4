//! Input device value objects

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Snapshot of one audio input device.
///
/// `id` is the device's position in the host's input device list at the
/// time of the query; it is only stable while the hardware doesn't change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub id: usize,
    pub name: String,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
    pub is_default: bool,
}

/// Which input device to record from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    #[default]
    Default,
    Index(usize),
    Name(String),
}

impl DeviceSelector {
    /// Check whether a device at `index` named `name` is the one selected.
    /// Name matching ignores case.
    pub fn matches(&self, index: usize, name: &str) -> bool {
        match self {
            Self::Default => false,
            Self::Index(i) => *i == index,
            Self::Name(n) => n.eq_ignore_ascii_case(name),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = std::convert::Infallible;

    /// `""` and `"default"` select the host default, digits select by id,
    /// anything else selects by name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("default") {
            return Ok(Self::Default);
        }
        Ok(match s.parse::<usize>() {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Name(s.to_string()),
        })
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Index(i) => write!(f, "{}", i),
            Self::Name(n) => write!(f, "{}", n),
        }
    }
}
