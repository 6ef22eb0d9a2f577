//! Precondition gates. Applied in a fixed order; the first failure decides
//! the review reason and any further failures are recorded alongside it.

use amr_core::models::{Measurement, MethodKind};

use crate::engine::{DecisionOrigin, Interpretation, NormalizedInput};

/// Plausible MIC range in mg/L, exclusive low bound.
const MIC_RANGE: (f64, f64) = (0.001, 1024.0);
/// Plausible zone diameter range in mm, inclusive.
const DISC_RANGE: (f64, f64) = (1.0, 100.0);

/// Run the gates. `None` means the input may be classified.
pub(crate) fn gate(item: &NormalizedInput) -> Option<Interpretation> {
    let mut fired: Vec<String> = Vec::new();
    let input = &item.input;

    // 1. Method present and variant-consistent with the value.
    match input.method {
        None => fired.push("method/value inconsistent".to_string()),
        Some(method) if !input.value.agrees_with(method) => {
            fired.push("method/value inconsistent".to_string());
        }
        Some(_) => {}
    }

    // 2–3. Numeric methods with the missing-value sentinel.
    if let Some(method) = input.method {
        match (method, &input.value) {
            (MethodKind::Mic | MethodKind::Gradient, Measurement::Mic { value: None }) => {
                fired.push("MIC value missing for MIC method".to_string());
            }
            (MethodKind::Disc, Measurement::Disc { value: None }) => {
                fired.push("Zone diameter missing for disk method".to_string());
            }
            _ => {}
        }
    }

    // 4–5. Unresolved terminology.
    if !item.organism.is_resolved() {
        fired.push("organism not recognized".to_string());
    }
    if !item.antibiotic.is_resolved() {
        fired.push("antibiotic not recognized".to_string());
    }

    // 6. Plausible measurement range.
    if let (Some(method), Some(measured)) = (input.method, input.value.numeric()) {
        let out_of_range = match method {
            MethodKind::Mic | MethodKind::Gradient => {
                measured.value <= MIC_RANGE.0 || measured.value > MIC_RANGE.1
            }
            MethodKind::Disc => measured.value < DISC_RANGE.0 || measured.value > DISC_RANGE.1,
            _ => false,
        };
        if out_of_range {
            fired.push("value out of plausible range".to_string());
        }
    }

    if fired.is_empty() {
        return None;
    }

    let reason = if fired.len() == 1 {
        fired[0].clone()
    } else {
        format!("{} (also: {})", fired[0], fired[1..].join("; "))
    };
    Some(Interpretation::review(reason, DecisionOrigin::Gate))
}
