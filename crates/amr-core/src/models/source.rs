use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Breakpoint table publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreakpointSource {
    Eucast,
    Clsi,
    Local,
}

impl BreakpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakpointSource::Eucast => "EUCAST",
            BreakpointSource::Clsi => "CLSI",
            BreakpointSource::Local => "LOCAL",
        }
    }
}

impl fmt::Display for BreakpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BreakpointSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUCAST" => Ok(BreakpointSource::Eucast),
            "CLSI" => Ok(BreakpointSource::Clsi),
            "LOCAL" => Ok(BreakpointSource::Local),
            other => Err(CoreError::UnknownSource(other.to_string())),
        }
    }
}
