use serde::{Deserialize, Serialize};

use amr_core::models::{BreakpointSource, MethodKind};

/// ESBL override policy: antibiotic classes exempt from the blanket
/// beta-lactam override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsblPolicy {
    #[serde(default = "EsblPolicy::default_exception_classes")]
    pub exception_classes: Vec<String>,
}

impl EsblPolicy {
    fn default_exception_classes() -> Vec<String> {
        vec![
            "carbapenem".to_string(),
            "beta-lactam-inhibitor-combination".to_string(),
        ]
    }
}

impl Default for EsblPolicy {
    fn default() -> Self {
        Self {
            exception_classes: Self::default_exception_classes(),
        }
    }
}

/// MRSA override policy: the anti-MRSA cephalosporins that stay out of the
/// beta-lactam override, and how those exceptions are then handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MrsaPolicy {
    #[serde(default = "MrsaPolicy::default_exception_antibiotics")]
    pub exception_antibiotics: Vec<String>,
    /// When true, the exception antibiotics are forced to review instead of
    /// being interpreted against breakpoints.
    #[serde(default)]
    pub exceptions_require_review: bool,
}

impl MrsaPolicy {
    fn default_exception_antibiotics() -> Vec<String> {
        vec!["Ceftaroline".to_string(), "Ceftobiprole".to_string()]
    }
}

impl Default for MrsaPolicy {
    fn default() -> Self {
        Self {
            exception_antibiotics: Self::default_exception_antibiotics(),
            exceptions_require_review: false,
        }
    }
}

/// Catalog-carried interpretation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPolicy {
    #[serde(default)]
    pub esbl: EsblPolicy,
    #[serde(default)]
    pub mrsa: MrsaPolicy,
    /// Method preference for conflicting results. `null` disables precedence
    /// and forces review on any cross-method disagreement.
    #[serde(default = "CatalogPolicy::default_method_precedence")]
    pub method_precedence: Option<Vec<MethodKind>>,
    /// Source resolution order when the requested source has no entry.
    #[serde(default = "CatalogPolicy::default_source_fallback")]
    pub source_fallback: Vec<BreakpointSource>,
}

impl CatalogPolicy {
    fn default_method_precedence() -> Option<Vec<MethodKind>> {
        Some(vec![MethodKind::Mic, MethodKind::Disc])
    }

    fn default_source_fallback() -> Vec<BreakpointSource> {
        vec![
            BreakpointSource::Eucast,
            BreakpointSource::Clsi,
            BreakpointSource::Local,
        ]
    }
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        Self {
            esbl: EsblPolicy::default(),
            mrsa: MrsaPolicy::default(),
            method_precedence: Self::default_method_precedence(),
            source_fallback: Self::default_source_fallback(),
        }
    }
}
