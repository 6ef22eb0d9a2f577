use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::measurement::{Measurement, MethodKind};
use crate::models::phenotype::PhenotypeFlag;

/// Opaque specimen/isolate reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecimenRef(String);

impl SpecimenRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Synthetic reference assigned when an input carries no specimen,
    /// derived from the input's position in its payload.
    pub fn synthetic(position: usize) -> Self {
        Self(format!("specimen-{position}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecimenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw coded or textual designator surfaced by an adapter.
///
/// Adapters never reject unknown codes; the triple is carried as-is and
/// resolved (or not) by terminology normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Designator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Designator {
    pub fn text(display: impl Into<String>) -> Self {
        Self {
            system: None,
            code: None,
            display: Some(display.into()),
        }
    }

    pub fn coded(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.system.is_none() && self.code.is_none() && self.display.is_none()
    }

    /// Best-effort human-readable form, for rationale and audit text.
    pub fn raw(&self) -> String {
        if let Some(display) = &self.display {
            return display.clone();
        }
        match (&self.system, &self.code) {
            (Some(system), Some(code)) => format!("{system}|{code}"),
            (None, Some(code)) => code.clone(),
            _ => String::new(),
        }
    }
}

/// One uniform classification input, produced by any adapter.
///
/// Rows without an antibiotic are carriers: organism identifications and
/// phenotype findings that the grouper merges into sibling susceptibility
/// rows of the same specimen, then drops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specimen: Option<SpecimenRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism: Option<Designator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antibiotic: Option<Designator>,
    /// Absent when the payload named no method; gating rejects such inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<MethodKind>,
    pub value: Measurement,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub phenotypes: BTreeSet<PhenotypeFlag>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub auxiliary: BTreeMap<String, String>,
}

impl ClassificationInput {
    /// A carrier row holds organism or phenotype context for its specimen but
    /// is not itself classified.
    pub fn is_carrier(&self) -> bool {
        self.antibiotic.is_none()
    }

    /// The declared method, falling back to the one the measurement variant
    /// implies. Used for reporting; gating still flags the missing method.
    pub fn effective_method(&self) -> MethodKind {
        self.method.unwrap_or_else(|| self.value.implied_method())
    }
}
