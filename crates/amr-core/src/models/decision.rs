use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Final interpretive category for one organism/antibiotic/method triple.
///
/// The declaration order encodes increasing resistance; monotonicity checks
/// compare decisions through `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Decision {
    S,
    I,
    R,
    #[serde(rename = "RR")]
    Rr,
    #[serde(rename = "Requires Review")]
    RequiresReview,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::S => "S",
            Decision::I => "I",
            Decision::R => "R",
            Decision::Rr => "RR",
            Decision::RequiresReview => "Requires Review",
        }
    }

    /// Whether this is a determinate susceptibility call rather than a
    /// request for human review.
    pub fn is_determinate(&self) -> bool {
        !matches!(self, Decision::RequiresReview)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "S" => Ok(Decision::S),
            "I" => Ok(Decision::I),
            "R" => Ok(Decision::R),
            "RR" => Ok(Decision::Rr),
            "Requires Review" => Ok(Decision::RequiresReview),
            other => Err(CoreError::UnknownDecision(other.to_string())),
        }
    }
}
