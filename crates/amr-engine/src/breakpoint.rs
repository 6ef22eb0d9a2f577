//! Breakpoint interpretation: runs only when no override produced a
//! decision. Rationale strings state the numeric comparison actually
//! performed, with units and the threshold name.

use amr_catalog::{BreakpointEntry, RuleCatalog, ThresholdComparator};
use amr_core::models::{BreakpointSource, Decision, MeasuredValue};

use crate::engine::{DecisionOrigin, Interpretation, NormalizedInput};

pub(crate) fn interpret(
    catalog: &RuleCatalog,
    item: &NormalizedInput,
    source_order: &[BreakpointSource],
) -> Interpretation {
    let (organism, antibiotic) = match (item.organism.key(), item.antibiotic.key()) {
        (Some(organism), Some(antibiotic)) => (organism, antibiotic),
        _ => {
            return Interpretation::review("no applicable breakpoint", DecisionOrigin::Breakpoint)
        }
    };
    let method = item.input.effective_method();

    let Some(entry) = catalog.select_breakpoint(organism, antibiotic, method, source_order) else {
        return Interpretation::review("no applicable breakpoint", DecisionOrigin::Breakpoint);
    };

    let Some(measured) = item.input.value.numeric() else {
        // Screens and phenotype findings have no thresholds to compare.
        return Interpretation::review("no applicable breakpoint", DecisionOrigin::Breakpoint);
    };

    let (Some(susceptible), Some(resistant)) = (entry.susceptible, entry.resistant) else {
        // Unreachable for a validated catalog.
        return Interpretation::review("malformed breakpoint entry", DecisionOrigin::Breakpoint);
    };

    match entry.comparator {
        ThresholdComparator::InverseForDisc => {
            interpret_disc(entry, measured, susceptible, resistant)
        }
        _ => interpret_mic(entry, measured, susceptible, resistant),
    }
}

/// MIC semantics: lower values are more susceptible.
fn interpret_mic(
    entry: &BreakpointEntry,
    measured: MeasuredValue,
    susceptible: f64,
    resistant: f64,
) -> Interpretation {
    let unit = entry.unit.as_str();
    let value = measured.effective();
    let shown = value_text(measured);

    if value <= susceptible {
        return determinate(
            Decision::S,
            format!(
                "MIC {shown} {unit} <= S threshold {} {unit}",
                threshold_text(susceptible)
            ),
        );
    }

    let resistant_exceeded = match entry.comparator {
        ThresholdComparator::LeSGeR => value >= resistant,
        _ => value > resistant,
    };
    if resistant_exceeded {
        let relation = if entry.comparator == ThresholdComparator::LeSGeR {
            ">="
        } else {
            ">"
        };
        if let Some(rare) = &entry.rare_resistance {
            if value >= resistant + rare.margin {
                return determinate(
                    Decision::Rr,
                    format!(
                        "MIC {shown} {unit} {relation} R threshold {} {unit} by rare margin {}",
                        threshold_text(resistant),
                        threshold_text(rare.margin)
                    ),
                );
            }
        }
        return determinate(
            Decision::R,
            format!(
                "MIC {shown} {unit} {relation} R threshold {} {unit}",
                threshold_text(resistant)
            ),
        );
    }

    match entry.intermediate {
        Some(intermediate) if value <= intermediate => determinate(
            Decision::I,
            format!(
                "MIC {shown} {unit} <= I threshold {} {unit}",
                threshold_text(intermediate)
            ),
        ),
        _ => determinate(
            Decision::I,
            format!(
                "MIC {shown} {unit} between S threshold {} and R threshold {} {unit}",
                threshold_text(susceptible),
                threshold_text(resistant)
            ),
        ),
    }
}

/// DISC semantics are inverse: larger zones are more susceptible.
fn interpret_disc(
    entry: &BreakpointEntry,
    measured: MeasuredValue,
    susceptible: f64,
    resistant: f64,
) -> Interpretation {
    let unit = entry.unit.as_str();
    let value = measured.effective();
    let shown = value_text(measured);

    if value >= susceptible {
        return determinate(
            Decision::S,
            format!(
                "zone {shown} {unit} >= S threshold {} {unit}",
                threshold_text(susceptible)
            ),
        );
    }
    if value < resistant {
        if let Some(rare) = &entry.rare_resistance {
            if value <= resistant - rare.margin {
                return determinate(
                    Decision::Rr,
                    format!(
                        "zone {shown} {unit} < R threshold {} {unit} by rare margin {}",
                        threshold_text(resistant),
                        threshold_text(rare.margin)
                    ),
                );
            }
        }
        return determinate(
            Decision::R,
            format!(
                "zone {shown} {unit} < R threshold {} {unit}",
                threshold_text(resistant)
            ),
        );
    }
    determinate(
        Decision::I,
        format!(
            "zone {shown} {unit} between R threshold {} and S threshold {} {unit}",
            threshold_text(resistant),
            threshold_text(susceptible)
        ),
    )
}

fn determinate(decision: Decision, reason: String) -> Interpretation {
    Interpretation {
        decision,
        reason,
        fired_rules: Vec::new(),
        origin: DecisionOrigin::Breakpoint,
    }
}

/// The reported value with its comparator prefix preserved.
fn value_text(measured: MeasuredValue) -> String {
    if measured.comparator.is_eq() {
        threshold_text(measured.value)
    } else {
        format!(
            "{}{}",
            measured.comparator.as_str(),
            threshold_text(measured.value)
        )
    }
}

/// Whole numbers keep one decimal so thresholds read as "8.0".
fn threshold_text(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
