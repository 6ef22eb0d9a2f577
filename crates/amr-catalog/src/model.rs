use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use amr_core::models::{BreakpointSource, Decision, MethodKind, PhenotypeFlag};

use crate::policy::CatalogPolicy;
use crate::scope::{genus_of, OrganismScope};

/// Unit a breakpoint's thresholds are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdUnit {
    #[serde(rename = "MG_PER_L")]
    MgPerL,
    #[serde(rename = "MM")]
    Mm,
}

impl ThresholdUnit {
    /// Unit text as it appears in rationale strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdUnit::MgPerL => "mg/L",
            ThresholdUnit::Mm => "mm",
        }
    }
}

/// Threshold comparison scheme. MIC entries use one of the `LE_S_*` forms;
/// DISC entries always use the inverse form (larger zones are more
/// susceptible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdComparator {
    #[serde(rename = "LE_S_GE_R")]
    LeSGeR,
    #[serde(rename = "LE_S_GT_R")]
    LeSGtR,
    #[serde(rename = "LE_S_LE_I_GT_R")]
    LeSLeIGtR,
    #[serde(rename = "INVERSE_FOR_DISC")]
    InverseForDisc,
}

/// Rarity marker: resistance this far beyond the R threshold is flagged as
/// rare rather than plain resistant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RareResistance {
    pub margin: f64,
}

/// One versioned breakpoint table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BreakpointEntry {
    pub organism: OrganismScope,
    pub antibiotic: String,
    pub method: MethodKind,
    #[serde(default = "BreakpointEntry::default_source")]
    pub source: BreakpointSource,
    #[serde(default)]
    pub version: Option<String>,
    /// S threshold: MIC upper bound / zone lower bound for susceptible.
    #[serde(default)]
    pub susceptible: Option<f64>,
    /// I threshold, where the comparator declares an explicit band.
    #[serde(default)]
    pub intermediate: Option<f64>,
    /// R threshold: MIC lower bound / zone upper bound for resistant.
    #[serde(default)]
    pub resistant: Option<f64>,
    pub comparator: ThresholdComparator,
    pub unit: ThresholdUnit,
    #[serde(default)]
    pub rare_resistance: Option<RareResistance>,
}

impl BreakpointEntry {
    fn default_source() -> BreakpointSource {
        BreakpointSource::Eucast
    }
}

/// Selects antibiotics either by name or through a catalog class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentSelector {
    Class { class: String },
    Antibiotic(String),
}

/// Organism-scoped declaration of inherent resistance; the measured value is
/// irrelevant when one of these matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IntrinsicRule {
    pub id: String,
    pub organism: OrganismScope,
    pub agents: Vec<AgentSelector>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Numeric guard on the measured value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn contains(&self, value: f64) -> bool {
        if let Some(min) = self.min {
            if value < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return false;
            }
        }
        true
    }
}

/// Predicate half of an expert rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleWhen {
    #[serde(default)]
    pub organism: Option<OrganismScope>,
    /// All listed flags must be present on the input.
    #[serde(default)]
    pub phenotypes: Vec<PhenotypeFlag>,
    /// Input antibiotic must match one selector; empty means any.
    #[serde(default)]
    pub agents: Vec<AgentSelector>,
    /// Input method must be listed; empty means any.
    #[serde(default)]
    pub methods: Vec<MethodKind>,
    #[serde(default)]
    pub value: Option<ValueRange>,
    /// Required auxiliary key/value pairs.
    #[serde(default)]
    pub auxiliary: BTreeMap<String, String>,
}

/// Effect half of an expert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleEffect {
    pub decision: Decision,
    /// Rationale template; `{organism}`, `{antibiotic}` and `{value}` are
    /// substituted at evaluation time.
    pub rationale: String,
    /// Further restricts the effect to antibiotics of this class.
    #[serde(default)]
    pub applies_to_class: Option<String>,
}

/// Catalog-defined override rule. Priority is a total order; larger wins,
/// ties broken by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExpertRule {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: i64,
    pub when: RuleWhen,
    pub effect: RuleEffect,
    /// Antibiotics exempt from this rule even when the predicate matches.
    #[serde(default)]
    pub exceptions: Vec<String>,
}

/// One catalog document as it appears on disk. A directory is loaded as the
/// union of its documents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CatalogDocument {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub breakpoints: Vec<BreakpointEntry>,
    #[serde(default)]
    pub expert_rules: Vec<ExpertRule>,
    #[serde(default)]
    pub intrinsic_resistance: Vec<IntrinsicRule>,
    #[serde(default)]
    pub organism_groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub antibiotic_classes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub policy: Option<CatalogPolicy>,
}

/// A named organism group with its nested references flattened at load time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedGroup {
    /// Lowercased exact member names.
    pub members: BTreeSet<String>,
    /// Lowercased genera admitted wholesale.
    pub genera: BTreeSet<String>,
}

impl ResolvedGroup {
    pub fn contains(&self, organism: &str) -> bool {
        let lower = organism.to_lowercase();
        if self.members.contains(&lower) {
            return true;
        }
        self.genera.contains(genus_of(&lower))
    }
}

/// The immutable published catalog. Constructed only by the loader after
/// validation; requests hold it through an `Arc` snapshot.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    version: String,
    breakpoints: Vec<BreakpointEntry>,
    /// Sorted by descending priority, then id.
    expert_rules: Vec<ExpertRule>,
    intrinsic: Vec<IntrinsicRule>,
    groups: BTreeMap<String, ResolvedGroup>,
    /// Class name to lowercased member names.
    classes: BTreeMap<String, BTreeSet<String>>,
    policy: CatalogPolicy,
}

impl RuleCatalog {
    pub(crate) fn new(
        version: String,
        breakpoints: Vec<BreakpointEntry>,
        expert_rules: Vec<ExpertRule>,
        intrinsic: Vec<IntrinsicRule>,
        groups: BTreeMap<String, ResolvedGroup>,
        classes: BTreeMap<String, BTreeSet<String>>,
        policy: CatalogPolicy,
    ) -> Self {
        Self {
            version,
            breakpoints,
            expert_rules,
            intrinsic,
            groups,
            classes,
            policy,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn policy(&self) -> &CatalogPolicy {
        &self.policy
    }

    pub fn expert_rules(&self) -> &[ExpertRule] {
        &self.expert_rules
    }

    pub fn intrinsic_rules(&self) -> &[IntrinsicRule] {
        &self.intrinsic
    }

    pub fn breakpoints(&self) -> &[BreakpointEntry] {
        &self.breakpoints
    }

    pub fn group(&self, name: &str) -> Option<&ResolvedGroup> {
        self.groups.get(name)
    }

    pub fn organism_in_group(&self, organism: &str, group: &str) -> bool {
        self.groups
            .get(group)
            .map(|g| g.contains(organism))
            .unwrap_or(false)
    }

    /// Lowercased member set of an antibiotic class.
    pub fn class_members(&self, class: &str) -> Option<&BTreeSet<String>> {
        self.classes.get(class)
    }

    pub fn antibiotic_in_class(&self, antibiotic: &str, class: &str) -> bool {
        self.classes
            .get(class)
            .map(|members| members.contains(&antibiotic.to_lowercase()))
            .unwrap_or(false)
    }

    /// Whether a scope admits the given canonical organism name.
    pub fn scope_matches(&self, scope: &OrganismScope, organism: &str) -> bool {
        match scope {
            OrganismScope::Exact { exact } | OrganismScope::Name(exact) => {
                exact.eq_ignore_ascii_case(organism)
            }
            OrganismScope::Genus { genus } => genus.eq_ignore_ascii_case(genus_of(organism)),
            OrganismScope::Group { group } => self.organism_in_group(organism, group),
        }
    }

    /// Whether the input antibiotic matches one of the selectors. An empty
    /// selector list matches any antibiotic.
    pub fn agent_matches(&self, selectors: &[AgentSelector], antibiotic: &str) -> bool {
        if selectors.is_empty() {
            return true;
        }
        selectors.iter().any(|selector| match selector {
            AgentSelector::Antibiotic(name) => name.eq_ignore_ascii_case(antibiotic),
            AgentSelector::Class { class } => self.antibiotic_in_class(antibiotic, class),
        })
    }

    /// Select the breakpoint entry for (organism, antibiotic, method):
    /// sources are tried in preference order, and within a source the most
    /// specific matching scope wins. `Gradient` consults the MIC table.
    pub fn select_breakpoint(
        &self,
        organism: &str,
        antibiotic: &str,
        method: MethodKind,
        source_order: &[BreakpointSource],
    ) -> Option<&BreakpointEntry> {
        let table_method = match method {
            MethodKind::Gradient => MethodKind::Mic,
            other => other,
        };
        for source in source_order {
            let best = self
                .breakpoints
                .iter()
                .filter(|entry| {
                    entry.source == *source
                        && entry.method == table_method
                        && entry.antibiotic.eq_ignore_ascii_case(antibiotic)
                        && self.scope_matches(&entry.organism, organism)
                })
                .max_by_key(|entry| entry.organism.specificity());
            if best.is_some() {
                return best;
            }
        }
        None
    }
}
