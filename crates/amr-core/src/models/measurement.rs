use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::phenotype::PhenotypeFlag;

/// Testing method that produced a measurement.
///
/// `Gradient` is a MIC-producing strip method: it carries a `Mic` measurement
/// and is interpreted against MIC breakpoints, but the method string survives
/// into results and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MethodKind {
    Mic,
    Disc,
    Screen,
    Phenotype,
    Gradient,
}

impl MethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::Mic => "MIC",
            MethodKind::Disc => "DISC",
            MethodKind::Screen => "SCREEN",
            MethodKind::Phenotype => "PHENOTYPE",
            MethodKind::Gradient => "GRADIENT",
        }
    }

    /// Whether this method requires a numeric measurement.
    pub fn is_numeric(&self) -> bool {
        matches!(self, MethodKind::Mic | MethodKind::Disc | MethodKind::Gradient)
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MIC" => Ok(MethodKind::Mic),
            "DISC" | "DISK" | "DISK_DIFFUSION" | "DISC_DIFFUSION" => Ok(MethodKind::Disc),
            "SCREEN" => Ok(MethodKind::Screen),
            "PHENOTYPE" => Ok(MethodKind::Phenotype),
            "GRADIENT" | "ETEST" => Ok(MethodKind::Gradient),
            other => Err(CoreError::UnknownMethod(other.to_string())),
        }
    }
}

/// Comparator prefix attached to a reported numeric value (e.g. HL7 `<=0.25`).
///
/// The prefix is preserved for reporting; threshold comparison uses
/// [`MeasuredValue::effective`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueComparator {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = ">")]
    Gt,
}

impl ValueComparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueComparator::Eq => "=",
            ValueComparator::Le => "<=",
            ValueComparator::Lt => "<",
            ValueComparator::Ge => ">=",
            ValueComparator::Gt => ">",
        }
    }

    pub fn is_eq(&self) -> bool {
        matches!(self, ValueComparator::Eq)
    }
}

/// Offset used to nudge `<`/`>`-prefixed values across exactly one threshold
/// step during breakpoint comparison.
const COMPARATOR_EPSILON: f64 = 1e-9;

/// A reported numeric value with its comparator prefix preserved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasuredValue {
    pub value: f64,
    #[serde(default, skip_serializing_if = "ValueComparator::is_eq")]
    pub comparator: ValueComparator,
}

impl MeasuredValue {
    pub fn exact(value: f64) -> Self {
        Self {
            value,
            comparator: ValueComparator::Eq,
        }
    }

    pub fn with_comparator(value: f64, comparator: ValueComparator) -> Self {
        Self { value, comparator }
    }

    /// The value used for threshold comparison: `<=x` compares as `x`,
    /// `>x` as `x + ε`, `<x` as `x - ε`.
    pub fn effective(&self) -> f64 {
        match self.comparator {
            ValueComparator::Eq | ValueComparator::Le | ValueComparator::Ge => self.value,
            ValueComparator::Gt => self.value + COMPARATOR_EPSILON,
            ValueComparator::Lt => self.value - COMPARATOR_EPSILON,
        }
    }
}

impl fmt::Display for MeasuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comparator.is_eq() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}{}", self.comparator.as_str(), self.value)
        }
    }
}

/// Qualitative outcome of a screening test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScreenResult {
    Positive,
    Negative,
    Indeterminate,
}

/// Tagged measurement value.
///
/// The numeric variants carry an in-band missing sentinel (`value: None`) so
/// adapters surface an absent MIC or zone diameter instead of coercing it;
/// gating turns the sentinel into a review decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Measurement {
    Mic {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<MeasuredValue>,
    },
    Disc {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<MeasuredValue>,
    },
    Screen {
        result: ScreenResult,
    },
    Phenotype {
        flag: PhenotypeFlag,
    },
}

impl Measurement {
    pub fn mic(value: f64) -> Self {
        Measurement::Mic {
            value: Some(MeasuredValue::exact(value)),
        }
    }

    pub fn disc(value: f64) -> Self {
        Measurement::Disc {
            value: Some(MeasuredValue::exact(value)),
        }
    }

    pub fn missing_mic() -> Self {
        Measurement::Mic { value: None }
    }

    pub fn missing_disc() -> Self {
        Measurement::Disc { value: None }
    }

    /// Whether this measurement variant is the one the method requires.
    pub fn agrees_with(&self, method: MethodKind) -> bool {
        match (self, method) {
            (Measurement::Mic { .. }, MethodKind::Mic | MethodKind::Gradient) => true,
            (Measurement::Disc { .. }, MethodKind::Disc) => true,
            (Measurement::Screen { .. }, MethodKind::Screen) => true,
            (Measurement::Phenotype { .. }, MethodKind::Phenotype) => true,
            _ => false,
        }
    }

    /// The numeric value, if this is a numeric variant and the value is present.
    pub fn numeric(&self) -> Option<MeasuredValue> {
        match self {
            Measurement::Mic { value } | Measurement::Disc { value } => *value,
            _ => None,
        }
    }

    /// Whether this is a numeric variant whose value is absent.
    pub fn is_missing_numeric(&self) -> bool {
        matches!(
            self,
            Measurement::Mic { value: None } | Measurement::Disc { value: None }
        )
    }

    /// The method this measurement variant implies, used when an input
    /// arrives without an explicit method.
    pub fn implied_method(&self) -> MethodKind {
        match self {
            Measurement::Mic { .. } => MethodKind::Mic,
            Measurement::Disc { .. } => MethodKind::Disc,
            Measurement::Screen { .. } => MethodKind::Screen,
            Measurement::Phenotype { .. } => MethodKind::Phenotype,
        }
    }
}
