//! Expert-rule evaluation: intrinsic resistance, then phenotype overrides,
//! then catalog-defined rules in priority order. Rules are data; this module
//! is the single evaluator driving them, so precedence and suppression stay
//! reportable.

use thiserror::Error;

use amr_catalog::scope::genus_of;
use amr_catalog::{AgentSelector, ExpertRule, RuleCatalog};
use amr_core::models::{CarbapenemaseType, Decision, MethodKind, PhenotypeFlag};

use crate::engine::{DecisionOrigin, Interpretation, NormalizedInput};

const ENTEROBACTERALES_GROUP: &str = "Enterobacterales";
const BETA_LACTAM_CLASS: &str = "beta-lactam";
const CARBAPENEM_CLASS: &str = "carbapenem";

/// Contract breach during evaluation. Unreachable when the catalog store's
/// validation contract holds; degraded to a review decision by the engine.
#[derive(Debug, Error)]
pub(crate) enum RuleEvaluationError {
    #[error("rule {rule} references antibiotic class {class} missing from the catalog")]
    MissingClass { rule: String, class: String },
}

struct Fired {
    id: String,
    rationale: String,
    decision: Decision,
}

/// Evaluate overrides for one input. `Ok(None)` hands the input to
/// breakpoint interpretation.
pub(crate) fn evaluate(
    catalog: &RuleCatalog,
    item: &NormalizedInput,
) -> Result<Option<Interpretation>, RuleEvaluationError> {
    let (organism, antibiotic) = match (item.organism.key(), item.antibiotic.key()) {
        (Some(organism), Some(antibiotic)) => (organism, antibiotic),
        // Gating already produced a review for unresolved terms.
        _ => return Ok(None),
    };

    // 1. Intrinsic resistance.
    let intrinsic: Vec<Fired> = catalog
        .intrinsic_rules()
        .iter()
        .filter(|rule| {
            catalog.scope_matches(&rule.organism, organism)
                && catalog.agent_matches(&rule.agents, antibiotic)
        })
        .map(|rule| Fired {
            id: rule.id.clone(),
            rationale: format!("intrinsic resistance per rule {}", rule.id),
            decision: Decision::R,
        })
        .collect();

    // 2. Phenotype overrides.
    let (phenotype_fired, phenotype_review) = phenotype_overrides(catalog, item, organism, antibiotic);

    if let Some(winner) = intrinsic.first() {
        let mut reason = winner.rationale.clone();
        let mut fired_rules: Vec<String> = intrinsic.iter().map(|f| f.id.clone()).collect();
        // Intrinsic outranks a same-direction phenotype override; the
        // rationales combine.
        for fired in &phenotype_fired {
            if fired.decision == winner.decision {
                reason.push_str("; ");
                reason.push_str(&fired.rationale);
                fired_rules.push(fired.id.clone());
            }
        }
        return Ok(Some(Interpretation {
            decision: winner.decision,
            reason,
            fired_rules,
            origin: DecisionOrigin::Expert,
        }));
    }

    if let Some(winner) = phenotype_fired.first() {
        let mut reason = winner.rationale.clone();
        let mut fired_rules = vec![winner.id.clone()];
        for other in &phenotype_fired[1..] {
            reason.push_str("; ");
            reason.push_str(&other.rationale);
            fired_rules.push(other.id.clone());
        }
        return Ok(Some(Interpretation {
            decision: winner.decision,
            reason,
            fired_rules,
            origin: DecisionOrigin::Expert,
        }));
    }

    if let Some(review) = phenotype_review {
        return Ok(Some(review));
    }

    // 3. Catalog-defined expert rules, pre-sorted by priority then id.
    let mut eligible: Vec<&ExpertRule> = Vec::new();
    for rule in catalog.expert_rules() {
        if rule_matches(catalog, rule, item, organism, antibiotic)? {
            eligible.push(rule);
        }
    }
    let Some(winner) = eligible.first() else {
        return Ok(None);
    };

    let mut reason = render_rationale(&winner.effect.rationale, item, organism, antibiotic);
    if eligible.len() > 1 {
        let suppressed: Vec<&str> = eligible[1..].iter().map(|r| r.id.as_str()).collect();
        reason.push_str(&format!(" (suppressed: {})", suppressed.join(", ")));
    }

    Ok(Some(Interpretation {
        decision: winner.effect.decision,
        reason,
        fired_rules: vec![winner.id.clone()],
        origin: DecisionOrigin::Expert,
    }))
}

/// The built-in phenotype overrides, parameterized by catalog policy.
/// Returns the fired overrides plus an optional forced-review outcome for
/// MRSA exception antibiotics.
fn phenotype_overrides(
    catalog: &RuleCatalog,
    item: &NormalizedInput,
    organism: &str,
    antibiotic: &str,
) -> (Vec<Fired>, Option<Interpretation>) {
    let flags = &item.input.phenotypes;
    let policy = catalog.policy();
    let mut fired: Vec<Fired> = Vec::new();
    let mut review: Option<Interpretation> = None;

    let in_class = |class: &str| {
        if catalog.class_members(class).is_none() {
            tracing::warn!(class, "catalog defines no such antibiotic class; override skipped");
            return false;
        }
        catalog.antibiotic_in_class(antibiotic, class)
    };

    // ESBL on Enterobacterales: beta-lactams resist, minus the policy's
    // exception classes (carbapenems, inhibitor combinations).
    if flags.contains(&PhenotypeFlag::Esbl)
        && catalog.organism_in_group(organism, ENTEROBACTERALES_GROUP)
        && in_class(BETA_LACTAM_CLASS)
    {
        let exempt = policy
            .esbl
            .exception_classes
            .iter()
            .any(|class| catalog.antibiotic_in_class(antibiotic, class));
        if !exempt {
            fired.push(Fired {
                id: "ESBL-BL-OVR".to_string(),
                rationale: "ESBL override for beta-lactam class".to_string(),
                decision: Decision::R,
            });
        }
    }

    // MRSA (or a positive cefoxitin screen) on S. aureus.
    if flags.contains(&PhenotypeFlag::Mrsa)
        && organism.eq_ignore_ascii_case("Staphylococcus aureus")
        && in_class(BETA_LACTAM_CLASS)
    {
        let excepted = policy
            .mrsa
            .exception_antibiotics
            .iter()
            .any(|name| name.eq_ignore_ascii_case(antibiotic));
        if !excepted {
            fired.push(Fired {
                id: "MRSA-BL-OVR".to_string(),
                rationale: "MRSA override for beta-lactams (except anti-MRSA cephalosporins)"
                    .to_string(),
                decision: Decision::R,
            });
        } else if policy.mrsa.exceptions_require_review {
            review = Some(Interpretation {
                decision: Decision::RequiresReview,
                reason: format!(
                    "anti-MRSA cephalosporin {antibiotic} forced to review by MRSA policy"
                ),
                fired_rules: vec!["MRSA-BL-EXC".to_string()],
                origin: DecisionOrigin::Expert,
            });
        }
        // Otherwise the exception antibiotic falls through to breakpoints.
    }

    // Carbapenemase production overrides carbapenems.
    if flags.iter().any(PhenotypeFlag::is_carbapenemase) && in_class(CARBAPENEM_CLASS) {
        fired.push(Fired {
            id: "CPE-CARB-OVR".to_string(),
            rationale: "carbapenemase override for carbapenem class".to_string(),
            decision: Decision::R,
        });
    }

    // VRE forces glycopeptide resistance.
    if flags.contains(&PhenotypeFlag::Vre)
        && (antibiotic.eq_ignore_ascii_case("Vancomycin")
            || antibiotic.eq_ignore_ascii_case("Teicoplanin"))
    {
        fired.push(Fired {
            id: "VRE-VAN-OVR".to_string(),
            rationale: format!("VRE override for {antibiotic}"),
            decision: Decision::R,
        });
    }

    // Inducible clindamycin resistance on staphylococci.
    if flags.contains(&PhenotypeFlag::InducibleClinda)
        && genus_of(organism).eq_ignore_ascii_case("Staphylococcus")
        && antibiotic.eq_ignore_ascii_case("Clindamycin")
    {
        fired.push(Fired {
            id: "ICR-CLI-OVR".to_string(),
            rationale: "inducible clindamycin resistance (positive D-test)".to_string(),
            decision: Decision::R,
        });
    }

    (fired, review)
}

fn rule_matches(
    catalog: &RuleCatalog,
    rule: &ExpertRule,
    item: &NormalizedInput,
    organism: &str,
    antibiotic: &str,
) -> Result<bool, RuleEvaluationError> {
    if rule
        .exceptions
        .iter()
        .any(|name| name.eq_ignore_ascii_case(antibiotic))
    {
        return Ok(false);
    }

    if let Some(scope) = &rule.when.organism {
        if !catalog.scope_matches(scope, organism) {
            return Ok(false);
        }
    }

    for wanted in &rule.when.phenotypes {
        if !has_flag(item, wanted) {
            return Ok(false);
        }
    }

    if !rule.when.agents.is_empty() && !agents_match(catalog, rule, &rule.when.agents, antibiotic)? {
        return Ok(false);
    }

    if !rule.when.methods.is_empty() {
        let method = item.input.effective_method();
        let matched = rule.when.methods.iter().any(|wanted| {
            *wanted == method || (*wanted == MethodKind::Mic && method == MethodKind::Gradient)
        });
        if !matched {
            return Ok(false);
        }
    }

    if let Some(range) = &rule.when.value {
        match item.input.value.numeric() {
            Some(measured) if range.contains(measured.value) => {}
            _ => return Ok(false),
        }
    }

    for (key, expected) in &rule.when.auxiliary {
        if item.input.auxiliary.get(key) != Some(expected) {
            return Ok(false);
        }
    }

    if let Some(class) = &rule.effect.applies_to_class {
        if catalog.class_members(class).is_none() {
            return Err(RuleEvaluationError::MissingClass {
                rule: rule.id.clone(),
                class: class.clone(),
            });
        }
        if !catalog.antibiotic_in_class(antibiotic, class) {
            return Ok(false);
        }
    }

    Ok(true)
}

/// A rule wanting an unspecified carbapenemase matches any identified
/// subtype.
fn has_flag(item: &NormalizedInput, wanted: &PhenotypeFlag) -> bool {
    match wanted {
        PhenotypeFlag::Carbapenemase(CarbapenemaseType::Unspecified) => item
            .input
            .phenotypes
            .iter()
            .any(PhenotypeFlag::is_carbapenemase),
        other => item.input.phenotypes.contains(other),
    }
}

fn agents_match(
    catalog: &RuleCatalog,
    rule: &ExpertRule,
    selectors: &[AgentSelector],
    antibiotic: &str,
) -> Result<bool, RuleEvaluationError> {
    for selector in selectors {
        match selector {
            AgentSelector::Antibiotic(name) => {
                if name.eq_ignore_ascii_case(antibiotic) {
                    return Ok(true);
                }
            }
            AgentSelector::Class { class } => {
                if catalog.class_members(class).is_none() {
                    return Err(RuleEvaluationError::MissingClass {
                        rule: rule.id.clone(),
                        class: class.clone(),
                    });
                }
                if catalog.antibiotic_in_class(antibiotic, class) {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

fn render_rationale(
    template: &str,
    item: &NormalizedInput,
    organism: &str,
    antibiotic: &str,
) -> String {
    let value_text = item
        .input
        .value
        .numeric()
        .map(|measured| measured.to_string())
        .unwrap_or_default();
    template
        .replace("{organism}", organism)
        .replace("{antibiotic}", antibiotic)
        .replace("{value}", &value_text)
}
