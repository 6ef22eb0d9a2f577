use std::fmt;

use serde::{Deserialize, Serialize};

/// Carbapenemase enzyme family, where the reporting lab identified one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CarbapenemaseType {
    #[serde(rename = "KPC")]
    Kpc,
    #[serde(rename = "NDM")]
    Ndm,
    #[serde(rename = "OXA-48")]
    Oxa48,
    #[serde(rename = "VIM")]
    Vim,
    #[serde(rename = "IMP")]
    Imp,
    #[serde(rename = "UNSPECIFIED")]
    Unspecified,
}

impl CarbapenemaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarbapenemaseType::Kpc => "KPC",
            CarbapenemaseType::Ndm => "NDM",
            CarbapenemaseType::Oxa48 => "OXA-48",
            CarbapenemaseType::Vim => "VIM",
            CarbapenemaseType::Imp => "IMP",
            CarbapenemaseType::Unspecified => "UNSPECIFIED",
        }
    }
}

/// Resistance phenotype reported alongside susceptibility measurements.
///
/// Flags are carried per specimen and merged into every susceptibility input
/// of that specimen during grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhenotypeFlag {
    #[serde(rename = "ESBL")]
    Esbl,
    #[serde(rename = "AMPC")]
    AmpC,
    #[serde(rename = "CARBAPENEMASE")]
    Carbapenemase(CarbapenemaseType),
    #[serde(rename = "MRSA")]
    Mrsa,
    #[serde(rename = "MSSA")]
    Mssa,
    #[serde(rename = "VRE")]
    Vre,
    #[serde(rename = "VSE")]
    Vse,
    #[serde(rename = "INDUCIBLE_CLINDA")]
    InducibleClinda,
}

impl PhenotypeFlag {
    /// Human-readable label used in rationale text.
    pub fn label(&self) -> String {
        match self {
            PhenotypeFlag::Esbl => "ESBL".to_string(),
            PhenotypeFlag::AmpC => "AmpC".to_string(),
            PhenotypeFlag::Carbapenemase(CarbapenemaseType::Unspecified) => {
                "carbapenemase".to_string()
            }
            PhenotypeFlag::Carbapenemase(sub) => format!("carbapenemase ({})", sub.as_str()),
            PhenotypeFlag::Mrsa => "MRSA".to_string(),
            PhenotypeFlag::Mssa => "MSSA".to_string(),
            PhenotypeFlag::Vre => "VRE".to_string(),
            PhenotypeFlag::Vse => "VSE".to_string(),
            PhenotypeFlag::InducibleClinda => "inducible clindamycin resistance".to_string(),
        }
    }

    pub fn is_carbapenemase(&self) -> bool {
        matches!(self, PhenotypeFlag::Carbapenemase(_))
    }
}

impl fmt::Display for PhenotypeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
