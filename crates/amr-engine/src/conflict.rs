//! Conflict resolution for repeated measurements of one
//! (specimen, organism, antibiotic) triple: concordant results merge,
//! discordant cross-method results follow the catalog's method precedence,
//! and expert-rule decisions are never overridden by breakpoint results.

use std::collections::HashMap;

use amr_catalog::RuleCatalog;
use amr_core::models::{Measurement, MethodKind};

use crate::engine::{DecisionOrigin, Interpretation, NormalizedInput};

type Interpreted = (NormalizedInput, Interpretation);

pub(crate) fn resolve(catalog: &RuleCatalog, items: Vec<Interpreted>) -> Vec<Interpreted> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Interpreted>> = HashMap::new();

    for (item, interpretation) in items {
        let key = format!(
            "{}|{}|{}",
            item.specimen,
            item.organism.display_text().to_lowercase(),
            item.antibiotic.display_text().to_lowercase()
        );
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push((item, interpretation));
    }

    order
        .into_iter()
        .filter_map(|key| {
            let mut members = groups.remove(&key)?;
            if members.len() == 1 {
                return members.pop();
            }
            Some(merge(catalog, members))
        })
        .collect()
}

fn merge(catalog: &RuleCatalog, members: Vec<Interpreted>) -> Interpreted {
    let concordant = members
        .iter()
        .all(|(_, interpretation)| interpretation.decision == members[0].1.decision);

    if concordant {
        let count = members.len();
        let all_fired: Vec<String> = fired_union(&members);
        let (item, mut interpretation) = take_first(members);
        interpretation
            .reason
            .push_str(&format!("; {count} concordant measurements"));
        interpretation.fired_rules = all_fired;
        return (item, interpretation);
    }

    // An expert-rule decision stands regardless of conflicting breakpoint
    // results for the same pair.
    if members
        .iter()
        .any(|(_, i)| i.origin == DecisionOrigin::Expert)
    {
        let all_fired = fired_union(&members);
        let conflicting: Vec<String> = members
            .iter()
            .filter(|(_, i)| i.origin != DecisionOrigin::Expert)
            .map(|(item, i)| {
                format!("{} ({})", method_display(item), member_summary(item, i))
            })
            .collect();
        let (item, mut interpretation) = take_nth(
            members,
            |member| member.1.origin == DecisionOrigin::Expert,
        );
        if !conflicting.is_empty() {
            interpretation.reason.push_str(&format!(
                "; conflicting {} superseded by expert rule",
                conflicting.join(", ")
            ));
        }
        interpretation.fired_rules = all_fired;
        return (item, interpretation);
    }

    let methods: Vec<MethodKind> = {
        let mut seen = Vec::new();
        for (item, _) in &members {
            let method = table_method(item);
            if !seen.contains(&method) {
                seen.push(method);
            }
        }
        seen
    };

    if methods.len() > 1 {
        if let Some(precedence) = &catalog.policy().method_precedence {
            let rank = |item: &NormalizedInput| {
                precedence
                    .iter()
                    .position(|m| *m == table_method(item))
                    .unwrap_or(usize::MAX)
            };
            let best_rank = members
                .iter()
                .map(|(item, _)| rank(item))
                .min()
                .unwrap_or(usize::MAX);

            let losers: Vec<String> = members
                .iter()
                .filter(|(item, _)| rank(item) != best_rank)
                .map(|(item, i)| {
                    format!("{} disagrees ({})", method_display(item), member_summary(item, i))
                })
                .collect();
            let all_fired = fired_union(&members);
            let (item, mut interpretation) = take_nth(members, |(member, _)| rank(member) == best_rank);
            interpretation.reason = format!(
                "{} preferred; {}",
                method_display(&item),
                losers.join("; ")
            );
            interpretation.fired_rules = all_fired;
            return (item, interpretation);
        }

        let summary: Vec<String> = members
            .iter()
            .map(|(item, i)| {
                format!("{}={}", table_method(item).as_str(), i.decision.as_str())
            })
            .collect();
        let all_fired = fired_union(&members);
        let (item, mut interpretation) = take_first(members);
        interpretation = Interpretation {
            decision: amr_core::models::Decision::RequiresReview,
            reason: format!("conflicting methods: {}", summary.join(", ")),
            fired_rules: all_fired,
            origin: interpretation.origin,
        };
        return (item, interpretation);
    }

    let all_fired = fired_union(&members);
    let (item, interpretation) = take_first(members);
    (
        item,
        Interpretation {
            decision: amr_core::models::Decision::RequiresReview,
            reason: "duplicate measurements disagree".to_string(),
            fired_rules: all_fired,
            origin: interpretation.origin,
        },
    )
}

fn fired_union(members: &[Interpreted]) -> Vec<String> {
    let mut fired: Vec<String> = Vec::new();
    for (_, interpretation) in members {
        for id in &interpretation.fired_rules {
            if !fired.contains(id) {
                fired.push(id.clone());
            }
        }
    }
    fired
}

fn take_first(mut members: Vec<Interpreted>) -> Interpreted {
    members.remove(0)
}

fn take_nth(mut members: Vec<Interpreted>, predicate: impl Fn(&Interpreted) -> bool) -> Interpreted {
    let position = members.iter().position(&predicate).unwrap_or(0);
    members.remove(position)
}

/// Gradient strips compare against the MIC table; conflicts treat them as
/// the same method family.
fn table_method(item: &NormalizedInput) -> MethodKind {
    match item.input.effective_method() {
        MethodKind::Gradient => MethodKind::Mic,
        other => other,
    }
}

fn method_display(item: &NormalizedInput) -> &'static str {
    match item.input.effective_method() {
        MethodKind::Mic => "MIC",
        MethodKind::Gradient => "gradient MIC",
        MethodKind::Disc => "disc diffusion",
        MethodKind::Screen => "screen",
        MethodKind::Phenotype => "phenotype",
    }
}

/// "13 mm => R" style summary of one member.
fn member_summary(item: &NormalizedInput, interpretation: &Interpretation) -> String {
    let value = match &item.input.value {
        Measurement::Mic { value: Some(v) } => format!("{} mg/L", v),
        Measurement::Disc { value: Some(v) } => format!("{} mm", v),
        _ => "no value".to_string(),
    };
    format!("{value} => {}", interpretation.decision.as_str())
}
