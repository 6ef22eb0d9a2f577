use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use amr_core::models::MethodKind;

use crate::error::Violation;
use crate::model::{
    AgentSelector, BreakpointEntry, CatalogDocument, ExpertRule, IntrinsicRule, ResolvedGroup,
    RuleCatalog, ThresholdComparator, ThresholdUnit,
};
use crate::policy::CatalogPolicy;
use crate::scope::OrganismScope;

/// Merge parsed documents into one catalog, recording every schema and
/// semantic violation found along the way. The returned catalog is only
/// published when the violation list stayed empty.
pub(crate) fn build(
    documents: Vec<(PathBuf, CatalogDocument)>,
    violations: &mut Vec<Violation>,
) -> Option<RuleCatalog> {
    if documents.is_empty() {
        return None;
    }

    let version = merged_version(&documents, violations);
    let (groups_raw, classes_raw, policy) = merged_maps(&documents, violations);

    let groups = resolve_groups(&groups_raw, violations);
    let classes = resolve_classes(&classes_raw, violations);

    let mut breakpoints: Vec<BreakpointEntry> = Vec::new();
    let mut expert_rules: Vec<ExpertRule> = Vec::new();
    let mut intrinsic: Vec<IntrinsicRule> = Vec::new();

    let mut breakpoint_keys: HashSet<String> = HashSet::new();
    let mut rule_ids: HashSet<String> = HashSet::new();

    for (path, doc) in &documents {
        let display = path.display();
        for (index, entry) in doc.breakpoints.iter().enumerate() {
            let label = format!("{display}#breakpoints[{index}]");
            check_breakpoint(entry, &label, &groups, violations);
            let key = format!(
                "{}|{}|{}|{}",
                entry.organism.describe().to_lowercase(),
                entry.antibiotic.to_lowercase(),
                entry.method,
                entry.source
            );
            if !breakpoint_keys.insert(key) {
                violations.push(Violation::semantic(
                    "duplicateBreakpoint",
                    format!(
                        "{label}: a {} entry for {} / {} already exists for source {}",
                        entry.method,
                        entry.organism.describe(),
                        entry.antibiotic,
                        entry.source
                    ),
                ));
            }
            breakpoints.push(entry.clone());
        }

        for (index, rule) in doc.expert_rules.iter().enumerate() {
            let label = format!("{display}#expertRules[{index}]");
            check_expert_rule(rule, &label, &groups, &classes, violations);
            if !rule_ids.insert(rule.id.clone()) {
                violations.push(Violation::semantic(
                    "duplicateRuleId",
                    format!("{label}: rule id {} is already defined", rule.id),
                ));
            }
            expert_rules.push(rule.clone());
        }

        for (index, rule) in doc.intrinsic_resistance.iter().enumerate() {
            let label = format!("{display}#intrinsicResistance[{index}]");
            check_intrinsic_rule(rule, &label, &groups, &classes, violations);
            if !rule_ids.insert(rule.id.clone()) {
                violations.push(Violation::semantic(
                    "duplicateRuleId",
                    format!("{label}: rule id {} is already defined", rule.id),
                ));
            }
            intrinsic.push(rule.clone());
        }
    }

    // Priority is a total order: larger wins, ties resolved by id.
    expert_rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));

    Some(RuleCatalog::new(
        version.unwrap_or_else(|| "unversioned".to_string()),
        breakpoints,
        expert_rules,
        intrinsic,
        groups,
        classes,
        policy.unwrap_or_default(),
    ))
}

fn merged_version(
    documents: &[(PathBuf, CatalogDocument)],
    violations: &mut Vec<Violation>,
) -> Option<String> {
    let declared: Vec<(&PathBuf, &String)> = documents
        .iter()
        .filter_map(|(path, doc)| doc.version.as_ref().map(|v| (path, v)))
        .collect();

    if declared.is_empty() {
        violations.push(Violation::semantic(
            "missingVersion",
            "no catalog document declares a version",
        ));
        return None;
    }

    let first = declared[0].1;
    for (path, version) in &declared[1..] {
        if *version != first {
            violations.push(Violation::semantic(
                "versionMismatch",
                format!(
                    "{} declares version {version} but {} declares {first}",
                    path.display(),
                    declared[0].0.display()
                ),
            ));
        }
    }
    Some(first.clone())
}

#[allow(clippy::type_complexity)]
fn merged_maps(
    documents: &[(PathBuf, CatalogDocument)],
    violations: &mut Vec<Violation>,
) -> (
    BTreeMap<String, Vec<String>>,
    BTreeMap<String, Vec<String>>,
    Option<CatalogPolicy>,
) {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut classes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut policy: Option<CatalogPolicy> = None;

    for (path, doc) in documents {
        for (name, members) in &doc.organism_groups {
            if groups.contains_key(name) {
                violations.push(Violation::semantic(
                    "duplicateGroup",
                    format!("{}: organism group {name} is defined twice", path.display()),
                ));
                continue;
            }
            groups.insert(name.clone(), members.clone());
        }
        for (name, members) in &doc.antibiotic_classes {
            if classes.contains_key(name) {
                violations.push(Violation::semantic(
                    "duplicateClass",
                    format!(
                        "{}: antibiotic class {name} is defined twice",
                        path.display()
                    ),
                ));
                continue;
            }
            classes.insert(name.clone(), members.clone());
        }
        if let Some(doc_policy) = &doc.policy {
            if policy.is_some() {
                violations.push(Violation::semantic(
                    "duplicatePolicy",
                    format!("{}: policy is defined by more than one document", path.display()),
                ));
            } else {
                policy = Some(doc_policy.clone());
            }
        }
    }

    (groups, classes, policy)
}

/// Flatten nested group references, rejecting cycles and dangling names.
fn resolve_groups(
    raw: &BTreeMap<String, Vec<String>>,
    violations: &mut Vec<Violation>,
) -> BTreeMap<String, ResolvedGroup> {
    #[derive(PartialEq)]
    enum State {
        Visiting,
        Done,
    }

    fn visit(
        name: &str,
        raw: &BTreeMap<String, Vec<String>>,
        resolved: &mut BTreeMap<String, ResolvedGroup>,
        states: &mut BTreeMap<String, State>,
        violations: &mut Vec<Violation>,
    ) -> ResolvedGroup {
        if let Some(done) = resolved.get(name) {
            return done.clone();
        }
        match states.get(name) {
            Some(State::Visiting) => {
                violations.push(Violation::semantic(
                    "groupCycle",
                    format!("organism group {name} participates in a reference cycle"),
                ));
                return ResolvedGroup::default();
            }
            Some(State::Done) => {}
            None => {}
        }
        states.insert(name.to_string(), State::Visiting);

        let mut group = ResolvedGroup::default();
        if let Some(members) = raw.get(name) {
            for member in members {
                if let Some(genus) = member.strip_prefix("genus:") {
                    group.genera.insert(genus.trim().to_lowercase());
                } else if let Some(nested) = member.strip_prefix("group:") {
                    let nested = nested.trim();
                    if !raw.contains_key(nested) {
                        violations.push(Violation::semantic(
                            "unknownGroup",
                            format!("organism group {name} references undefined group {nested}"),
                        ));
                        continue;
                    }
                    let inner = visit(nested, raw, resolved, states, violations);
                    group.members.extend(inner.members);
                    group.genera.extend(inner.genera);
                } else {
                    group.members.insert(member.trim().to_lowercase());
                }
            }
        }

        states.insert(name.to_string(), State::Done);
        resolved.insert(name.to_string(), group.clone());
        group
    }

    let mut resolved = BTreeMap::new();
    let mut states = BTreeMap::new();
    for name in raw.keys() {
        visit(name, raw, &mut resolved, &mut states, violations);
    }
    resolved
}

fn resolve_classes(
    raw: &BTreeMap<String, Vec<String>>,
    violations: &mut Vec<Violation>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut classes = BTreeMap::new();
    for (name, members) in raw {
        if members.is_empty() {
            violations.push(Violation::semantic(
                "emptyClass",
                format!("antibiotic class {name} has no members"),
            ));
        }
        classes.insert(
            name.clone(),
            members.iter().map(|m| m.trim().to_lowercase()).collect(),
        );
    }
    classes
}

fn check_scope(
    scope: &OrganismScope,
    label: &str,
    groups: &BTreeMap<String, ResolvedGroup>,
    violations: &mut Vec<Violation>,
) {
    if let Some(group) = scope.group_ref() {
        if !groups.contains_key(group) {
            violations.push(Violation::schema(
                label,
                format!("references undefined organism group {group}"),
            ));
        }
    }
}

fn check_agents(
    agents: &[AgentSelector],
    label: &str,
    classes: &BTreeMap<String, BTreeSet<String>>,
    violations: &mut Vec<Violation>,
) {
    for agent in agents {
        if let AgentSelector::Class { class } = agent {
            match classes.get(class) {
                None => violations.push(Violation::schema(
                    label,
                    format!("references undefined antibiotic class {class}"),
                )),
                Some(members) if members.is_empty() => violations.push(Violation::schema(
                    label,
                    format!("references empty antibiotic class {class}"),
                )),
                Some(_) => {}
            }
        }
    }
}

fn check_breakpoint(
    entry: &BreakpointEntry,
    label: &str,
    groups: &BTreeMap<String, ResolvedGroup>,
    violations: &mut Vec<Violation>,
) {
    check_scope(&entry.organism, label, groups, violations);

    match entry.method {
        MethodKind::Mic => {
            if entry.unit != ThresholdUnit::MgPerL {
                violations.push(Violation::schema(label, "MIC entries must use unit MG_PER_L"));
            }
            if entry.comparator == ThresholdComparator::InverseForDisc {
                violations.push(Violation::schema(
                    label,
                    "MIC entries cannot use the INVERSE_FOR_DISC comparator",
                ));
            }
        }
        MethodKind::Disc => {
            if entry.unit != ThresholdUnit::Mm {
                violations.push(Violation::schema(label, "DISC entries must use unit MM"));
            }
            if entry.comparator != ThresholdComparator::InverseForDisc {
                violations.push(Violation::schema(
                    label,
                    "DISC entries must use the INVERSE_FOR_DISC comparator",
                ));
            }
        }
        other => {
            violations.push(Violation::schema(
                label,
                format!("breakpoint method must be MIC or DISC, not {other}"),
            ));
            return;
        }
    }

    let (susceptible, resistant) = match (entry.susceptible, entry.resistant) {
        (Some(s), Some(r)) => (s, r),
        _ => {
            violations.push(Violation::schema(
                label,
                "susceptible and resistant thresholds are both required",
            ));
            return;
        }
    };

    match entry.comparator {
        ThresholdComparator::LeSGeR | ThresholdComparator::LeSGtR => {
            if susceptible > resistant {
                violations.push(Violation::schema(
                    label,
                    format!("susceptible {susceptible} must not exceed resistant {resistant}"),
                ));
            }
            if let Some(intermediate) = entry.intermediate {
                if intermediate < susceptible || intermediate > resistant {
                    violations.push(Violation::schema(
                        label,
                        format!(
                            "intermediate {intermediate} must lie between susceptible and resistant"
                        ),
                    ));
                }
            }
        }
        ThresholdComparator::LeSLeIGtR => match entry.intermediate {
            None => violations.push(Violation::schema(
                label,
                "LE_S_LE_I_GT_R requires an intermediate threshold",
            )),
            Some(intermediate) => {
                if susceptible > intermediate {
                    violations.push(Violation::schema(
                        label,
                        format!("susceptible {susceptible} must not exceed intermediate {intermediate}"),
                    ));
                }
                // Bands must be gap-free: R starts immediately above I.
                if (intermediate - resistant).abs() > f64::EPSILON {
                    violations.push(Violation::schema(
                        label,
                        format!(
                            "intermediate {intermediate} must equal resistant {resistant} so the \
                             bands are gap-free"
                        ),
                    ));
                }
            }
        },
        ThresholdComparator::InverseForDisc => {
            if susceptible < resistant {
                violations.push(Violation::schema(
                    label,
                    format!(
                        "DISC susceptible {susceptible} must not be below resistant {resistant}"
                    ),
                ));
            }
            if let Some(intermediate) = entry.intermediate {
                if intermediate > susceptible || intermediate < resistant {
                    violations.push(Violation::schema(
                        label,
                        format!(
                            "intermediate {intermediate} must lie between resistant and susceptible"
                        ),
                    ));
                }
            }
        }
    }

    if let Some(rare) = &entry.rare_resistance {
        if rare.margin <= 0.0 {
            violations.push(Violation::schema(
                label,
                "rareResistance.margin must be positive",
            ));
        }
    }
}

fn check_expert_rule(
    rule: &ExpertRule,
    label: &str,
    groups: &BTreeMap<String, ResolvedGroup>,
    classes: &BTreeMap<String, BTreeSet<String>>,
    violations: &mut Vec<Violation>,
) {
    if rule.id.trim().is_empty() {
        violations.push(Violation::schema(label, "rule id must not be empty"));
    }
    if rule.effect.rationale.trim().is_empty() {
        violations.push(Violation::schema(label, "effect rationale must not be empty"));
    }
    if let Some(scope) = &rule.when.organism {
        check_scope(scope, label, groups, violations);
    }
    check_agents(&rule.when.agents, label, classes, violations);
    if let Some(class) = &rule.effect.applies_to_class {
        check_agents(
            &[AgentSelector::Class {
                class: class.clone(),
            }],
            label,
            classes,
            violations,
        );
    }
}

fn check_intrinsic_rule(
    rule: &IntrinsicRule,
    label: &str,
    groups: &BTreeMap<String, ResolvedGroup>,
    classes: &BTreeMap<String, BTreeSet<String>>,
    violations: &mut Vec<Violation>,
) {
    if rule.id.trim().is_empty() {
        violations.push(Violation::schema(label, "rule id must not be empty"));
    }
    if rule.agents.is_empty() {
        violations.push(Violation::schema(
            label,
            "intrinsic rule must declare at least one agent",
        ));
    }
    check_scope(&rule.organism, label, groups, violations);
    check_agents(&rule.agents, label, classes, violations);
}
