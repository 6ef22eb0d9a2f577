//! FHIR R4 adapter: Bundles, Observation arrays, or a single Observation.
//!
//! Observations are classified as organism identifications, susceptibility
//! measurements, or phenotype findings. Linkage between them follows
//! `derivedFrom`/`hasMember` references, with shared specimen references as
//! the grouping fallback.

use std::collections::BTreeSet;
use std::collections::HashMap;

use serde::Deserialize;

use amr_core::models::{
    CarbapenemaseType, ClassificationInput, Designator, MeasuredValue, Measurement, MethodKind,
    PhenotypeFlag, ScreenResult, SpecimenRef, ValueComparator,
};
use amr_terminology::tables;

use crate::error::AdapterError;

/// LOINC code for "Bacteria identified in Specimen by Culture".
const LOINC_ORGANISM_IDENTIFIED: &str = "634-6";

/// LOINC antimicrobial susceptibility codes with the agent they test.
const LOINC_SUSCEPTIBILITY: &[(&str, &str)] = &[
    ("18861-5", "Amikacin"),
    ("18864-9", "Ampicillin"),
    ("18868-0", "Ceftriaxone"),
    ("18886-2", "Cefotaxime"),
    ("18893-8", "Ceftazidime"),
    ("18906-8", "Ciprofloxacin"),
    ("18908-4", "Clindamycin"),
    ("18919-1", "Erythromycin"),
    ("18928-2", "Gentamicin"),
    ("18932-4", "Imipenem"),
    ("18943-1", "Levofloxacin"),
    ("18951-4", "Meropenem"),
    ("18955-5", "Oxacillin"),
    ("18961-3", "Benzylpenicillin"),
    ("18969-6", "Vancomycin"),
];

#[derive(Debug, Clone, Default, Deserialize)]
struct Coding {
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    display: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CodeableConcept {
    #[serde(default)]
    coding: Vec<Coding>,
    #[serde(default)]
    text: Option<String>,
}

impl CodeableConcept {
    /// All human-readable strings on this concept, lowercased.
    fn texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = Vec::new();
        if let Some(text) = &self.text {
            texts.push(text.to_lowercase());
        }
        for coding in &self.coding {
            if let Some(display) = &coding.display {
                texts.push(display.to_lowercase());
            }
        }
        texts
    }

    fn has_code(&self, code: &str) -> bool {
        self.coding
            .iter()
            .any(|c| c.code.as_deref() == Some(code))
    }

    fn mentions(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Quantity {
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    comparator: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Reference {
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Annotation {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Component {
    #[serde(default)]
    code: Option<CodeableConcept>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Observation {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    category: Vec<CodeableConcept>,
    #[serde(default)]
    code: Option<CodeableConcept>,
    #[serde(default)]
    method: Option<CodeableConcept>,
    #[serde(default)]
    value_quantity: Option<Quantity>,
    #[serde(default)]
    value_codeable_concept: Option<CodeableConcept>,
    #[serde(default)]
    value_string: Option<String>,
    #[serde(default)]
    specimen: Option<Reference>,
    #[serde(default)]
    subject: Option<Reference>,
    #[serde(default)]
    derived_from: Vec<Reference>,
    #[serde(default)]
    has_member: Vec<Reference>,
    #[serde(default)]
    note: Vec<Annotation>,
    #[serde(default)]
    component: Vec<Component>,
}

/// Parse a FHIR payload into classification inputs.
pub fn parse(payload: &[u8]) -> Result<Vec<ClassificationInput>, AdapterError> {
    let value: serde_json::Value = serde_json::from_slice(payload)?;
    let observations = collect_observations(&value)?;
    if observations.is_empty() {
        return Err(AdapterError::Fhir(
            "no Observation resources in payload".to_string(),
        ));
    }

    let classified: Vec<ClassifiedObservation> = observations
        .iter()
        .filter_map(classify_observation)
        .collect();

    Ok(link_observations(classified))
}

fn collect_observations(value: &serde_json::Value) -> Result<Vec<Observation>, AdapterError> {
    let resource_type = value.get("resourceType").and_then(|v| v.as_str());

    let raw: Vec<&serde_json::Value> = match (resource_type, value) {
        (Some("Bundle"), _) => {
            let entries = value
                .get("entry")
                .and_then(|e| e.as_array())
                .ok_or_else(|| AdapterError::Fhir("Bundle.entry must be an array".to_string()))?;
            entries
                .iter()
                .filter_map(|entry| entry.get("resource"))
                .filter(|resource| {
                    resource.get("resourceType").and_then(|t| t.as_str()) == Some("Observation")
                })
                .collect()
        }
        (Some("Observation"), _) => vec![value],
        (_, serde_json::Value::Array(items)) => items
            .iter()
            .filter(|item| item.get("resourceType").and_then(|t| t.as_str()) == Some("Observation"))
            .collect(),
        _ => {
            return Err(AdapterError::Fhir(
                "payload must be a Bundle, an Observation, or an array of Observations"
                    .to_string(),
            ))
        }
    };

    raw.iter()
        .map(|value| {
            serde_json::from_value((*value).clone())
                .map_err(|e| AdapterError::Fhir(format!("malformed Observation: {e}")))
        })
        .collect()
}

enum ObservationKind {
    Organism { designator: Designator },
    Phenotype { flag: PhenotypeFlag },
    Susceptibility(Box<SusceptibilityParts>),
}

struct SusceptibilityParts {
    antibiotic: Designator,
    method: Option<MethodKind>,
    value: Measurement,
}

struct ClassifiedObservation {
    id: Option<String>,
    specimen: Option<SpecimenRef>,
    subject: Option<String>,
    derived_from: Vec<String>,
    has_member: Vec<String>,
    kind: ObservationKind,
    note_organism: Option<Designator>,
    note_phenotypes: BTreeSet<PhenotypeFlag>,
    note_auxiliary: Vec<(String, String)>,
}

fn classify_observation(obs: &Observation) -> Option<ClassifiedObservation> {
    if !is_laboratory(obs) {
        tracing::warn!(
            id = obs.id.as_deref().unwrap_or("<unidentified>"),
            "skipping Observation without laboratory category"
        );
        return None;
    }

    let (note_organism, note_phenotypes, note_auxiliary) = parse_notes(&obs.note);

    let kind = if let Some(designator) = organism_identification(obs) {
        ObservationKind::Organism { designator }
    } else if let Some(finding) = phenotype_finding(obs) {
        // A recognized phenotype observation with a negative result is
        // consumed here and carries no flag.
        ObservationKind::Phenotype { flag: finding? }
    } else if let Some(parts) = susceptibility_parts(obs) {
        ObservationKind::Susceptibility(Box::new(parts))
    } else {
        tracing::debug!(
            id = obs.id.as_deref().unwrap_or("<unidentified>"),
            "Observation is neither organism, phenotype, nor susceptibility"
        );
        return None;
    };

    Some(ClassifiedObservation {
        id: obs.id.clone(),
        specimen: obs
            .specimen
            .as_ref()
            .and_then(|r| r.reference.clone())
            .map(SpecimenRef::new),
        subject: obs.subject.as_ref().and_then(|r| r.reference.clone()),
        derived_from: references(&obs.derived_from),
        has_member: references(&obs.has_member),
        kind,
        note_organism,
        note_phenotypes,
        note_auxiliary,
    })
}

fn is_laboratory(obs: &Observation) -> bool {
    if obs.category.is_empty() {
        return true;
    }
    obs.category
        .iter()
        .any(|c| c.has_code("laboratory") || c.mentions("laboratory"))
}

fn references(refs: &[Reference]) -> Vec<String> {
    refs.iter()
        .filter_map(|r| r.reference.clone())
        .map(|r| {
            r.trim_start_matches("Observation/")
                .trim_start_matches('#')
                .to_string()
        })
        .collect()
}

/// An Observation identifying the organism grown from the specimen.
fn organism_identification(obs: &Observation) -> Option<Designator> {
    let code = obs.code.as_ref();
    let coded_as_identification = code
        .map(|c| c.has_code(LOINC_ORGANISM_IDENTIFIED) || c.mentions("organism identified"))
        .unwrap_or(false);

    let value_designator = obs.value_codeable_concept.as_ref().and_then(|concept| {
        let coding = concept.coding.first();
        let display = concept
            .text
            .clone()
            .or_else(|| coding.and_then(|c| c.display.clone()));
        let designator = Designator {
            system: coding.and_then(|c| c.system.clone()),
            code: coding.and_then(|c| c.code.clone()),
            display,
        };
        if designator.is_empty() {
            None
        } else {
            Some(designator)
        }
    });

    if coded_as_identification {
        return value_designator
            .or_else(|| obs.value_string.clone().map(Designator::text));
    }

    // Not coded as an identification: still accept when the value codes a
    // known organism.
    let designator = value_designator?;
    let known_code = designator
        .code
        .as_deref()
        .map(tables::is_known_organism_code)
        .unwrap_or(false);
    let known_display = designator
        .display
        .as_deref()
        .map(|d| tables::organism_by_display(&tables::normalize_display(d)).is_some())
        .unwrap_or(false);
    if known_code || known_display {
        Some(designator)
    } else {
        None
    }
}

/// An Observation reporting a resistance phenotype. Returns `Some(None)` for
/// recognized phenotype observations with a negative result, which carry no
/// flag but are still consumed here.
#[allow(clippy::option_option)]
fn phenotype_finding(obs: &Observation) -> Option<Option<PhenotypeFlag>> {
    let code = obs.code.as_ref()?;
    let texts = code.texts();
    let mentions = |needle: &str| texts.iter().any(|t| t.contains(needle));

    let flag = if mentions("esbl") || mentions("extended spectrum beta-lactamase") {
        PhenotypeFlag::Esbl
    } else if mentions("carbapenemase") {
        PhenotypeFlag::Carbapenemase(carbapenemase_subtype(obs))
    } else if mentions("mrsa") || mentions("cefoxitin screen") {
        PhenotypeFlag::Mrsa
    } else if mentions("vre") || mentions("vancomycin resistance screen") {
        PhenotypeFlag::Vre
    } else if mentions("d-test") || mentions("inducible clindamycin") {
        PhenotypeFlag::InducibleClinda
    } else if mentions("ampc") {
        PhenotypeFlag::AmpC
    } else {
        return None;
    };

    if phenotype_positive(obs) {
        Some(Some(flag))
    } else {
        Some(None)
    }
}

fn carbapenemase_subtype(obs: &Observation) -> CarbapenemaseType {
    let text = obs
        .value_codeable_concept
        .as_ref()
        .map(|c| c.texts().join(" "))
        .or_else(|| obs.value_string.as_ref().map(|s| s.to_lowercase()))
        .unwrap_or_default();
    if text.contains("kpc") {
        CarbapenemaseType::Kpc
    } else if text.contains("ndm") {
        CarbapenemaseType::Ndm
    } else if text.contains("oxa-48") || text.contains("oxa 48") {
        CarbapenemaseType::Oxa48
    } else if text.contains("vim") {
        CarbapenemaseType::Vim
    } else if text.contains("imp") {
        CarbapenemaseType::Imp
    } else {
        CarbapenemaseType::Unspecified
    }
}

fn phenotype_positive(obs: &Observation) -> bool {
    let text = obs
        .value_codeable_concept
        .as_ref()
        .map(|c| c.texts().join(" "))
        .or_else(|| obs.value_string.as_ref().map(|s| s.to_lowercase()))
        .unwrap_or_default();
    if text.contains("not detected") || text.contains("negative") {
        return false;
    }
    text.contains("detected") || text.contains("positive") || text.contains("pos")
}

fn susceptibility_parts(obs: &Observation) -> Option<SusceptibilityParts> {
    let code = obs.code.as_ref();

    // (a) a known LOINC susceptibility code.
    let loinc_agent = code.and_then(|c| {
        LOINC_SUSCEPTIBILITY
            .iter()
            .find(|(loinc, _)| c.has_code(loinc))
            .map(|(_, agent)| *agent)
    });

    // (b) an explicit MIC/DISC/gradient method.
    let method_from_method = obs.method.as_ref().and_then(parse_method_concept);

    // Unit-driven method: mg/L means MIC, mm means DISC.
    let method_from_unit = obs.value_quantity.as_ref().and_then(|q| {
        let unit = q
            .unit
            .as_deref()
            .or(q.code.as_deref())
            .unwrap_or_default()
            .to_lowercase();
        match unit.as_str() {
            "mg/l" | "ug/ml" | "mcg/ml" => Some(MethodKind::Mic),
            "mm" => Some(MethodKind::Disc),
            _ => None,
        }
    });

    // (c) a display like "Ceftriaxone [Susceptibility] by MIC".
    let display_name = code.and_then(susceptibility_display_name);

    if loinc_agent.is_none() && method_from_method.is_none() && display_name.is_none() {
        return None;
    }

    let method = method_from_method.or(method_from_unit).or_else(|| {
        code.and_then(|c| {
            if c.mentions("by mic") {
                Some(MethodKind::Mic)
            } else if c.mentions("disk diffusion") || c.mentions("disc diffusion") {
                Some(MethodKind::Disc)
            } else {
                None
            }
        })
    });

    let coding = code.and_then(|c| c.coding.first());
    let display = display_name
        .or_else(|| loinc_agent.map(str::to_string))
        .or_else(|| code.and_then(|c| c.text.clone()))
        .or_else(|| coding.and_then(|c| c.display.clone()))
        .or_else(|| component_agent(obs));
    let antibiotic = Designator {
        system: coding.and_then(|c| c.system.clone()),
        code: coding.and_then(|c| c.code.clone()),
        display,
    };
    if antibiotic.is_empty() {
        return None;
    }

    let quantity_value = obs.value_quantity.as_ref().and_then(|q| {
        q.value.map(|value| MeasuredValue {
            value,
            comparator: parse_comparator(q.comparator.as_deref()),
        })
    });

    // A missing numeric value stays in-band: gating reports it, nothing
    // coerces it.
    let value = match method {
        Some(MethodKind::Disc) => Measurement::Disc {
            value: quantity_value,
        },
        _ => Measurement::Mic {
            value: quantity_value,
        },
    };

    Some(SusceptibilityParts {
        antibiotic,
        method,
        value,
    })
}

fn parse_method_concept(method: &CodeableConcept) -> Option<MethodKind> {
    for coding in &method.coding {
        if let Some(code) = &coding.code {
            if let Ok(kind) = code.parse::<MethodKind>() {
                return Some(kind);
            }
        }
    }
    let text = method.text.as_deref().unwrap_or_default().to_lowercase();
    if text.contains("mic") || text.contains("minimum inhibitory") {
        Some(MethodKind::Mic)
    } else if text.contains("disk") || text.contains("disc") {
        Some(MethodKind::Disc)
    } else if text.contains("gradient") || text.contains("etest") {
        Some(MethodKind::Gradient)
    } else {
        None
    }
}

/// Extract the agent name from "<antibiotic> [Susceptibility] by (MIC|disk diffusion)".
fn susceptibility_display_name(code: &CodeableConcept) -> Option<String> {
    let candidates = code
        .text
        .iter()
        .map(String::as_str)
        .chain(code.coding.iter().filter_map(|c| c.display.as_deref()));
    for candidate in candidates {
        let lower = candidate.to_lowercase();
        if let Some(position) = lower.find("susceptibility") {
            let name = candidate[..position]
                .trim()
                .trim_end_matches('[')
                .trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

fn component_agent(obs: &Observation) -> Option<String> {
    obs.component
        .iter()
        .filter_map(|c| c.code.as_ref())
        .filter_map(|code| {
            code.text
                .clone()
                .or_else(|| code.coding.first().and_then(|c| c.display.clone()))
        })
        .next()
}

fn parse_comparator(raw: Option<&str>) -> ValueComparator {
    match raw.map(str::trim) {
        Some("<=") => ValueComparator::Le,
        Some("<") => ValueComparator::Lt,
        Some(">=") => ValueComparator::Ge,
        Some(">") => ValueComparator::Gt,
        _ => ValueComparator::Eq,
    }
}

/// Parse `note` annotations of the form "E. coli; ESBL=true; ward=ICU".
fn parse_notes(
    notes: &[Annotation],
) -> (
    Option<Designator>,
    BTreeSet<PhenotypeFlag>,
    Vec<(String, String)>,
) {
    let mut organism: Option<Designator> = None;
    let mut phenotypes = BTreeSet::new();
    let mut auxiliary = Vec::new();

    for note in notes {
        let text = match &note.text {
            Some(text) => text,
            None => continue,
        };
        for (index, part) in text.split(';').map(str::trim).enumerate() {
            if part.is_empty() {
                continue;
            }
            if let Some((key, value)) = part.split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim();
                let truthy = value.eq_ignore_ascii_case("true");
                match key.as_str() {
                    "esbl" if truthy => {
                        phenotypes.insert(PhenotypeFlag::Esbl);
                    }
                    "mrsa" if truthy => {
                        phenotypes.insert(PhenotypeFlag::Mrsa);
                    }
                    "vre" if truthy => {
                        phenotypes.insert(PhenotypeFlag::Vre);
                    }
                    "ampc" if truthy => {
                        phenotypes.insert(PhenotypeFlag::AmpC);
                    }
                    "carbapenemase" if truthy => {
                        phenotypes
                            .insert(PhenotypeFlag::Carbapenemase(CarbapenemaseType::Unspecified));
                    }
                    "d_test_positive" | "inducible_clindamycin" if truthy => {
                        phenotypes.insert(PhenotypeFlag::InducibleClinda);
                    }
                    _ => auxiliary.push((key, value.to_string())),
                }
            } else if index == 0 && organism.is_none() {
                organism = Some(Designator::text(part));
            }
        }
    }

    (organism, phenotypes, auxiliary)
}

/// Resolve reference linkage and emit inputs in document order.
fn link_observations(classified: Vec<ClassifiedObservation>) -> Vec<ClassificationInput> {
    // Organism designators by observation id, for derivedFrom resolution.
    let organisms_by_id: HashMap<String, Designator> = classified
        .iter()
        .filter_map(|obs| match (&obs.id, &obs.kind) {
            (Some(id), ObservationKind::Organism { designator }) => {
                Some((id.clone(), designator.clone()))
            }
            _ => None,
        })
        .collect();

    // Susceptibility observation ids claimed as members of an organism
    // identification via hasMember.
    let mut member_organisms: HashMap<String, Designator> = HashMap::new();
    for obs in &classified {
        if let ObservationKind::Organism { designator } = &obs.kind {
            for member in &obs.has_member {
                member_organisms.insert(member.clone(), designator.clone());
            }
        }
    }

    classified
        .into_iter()
        .map(|obs| {
            let mut auxiliary: std::collections::BTreeMap<String, String> =
                obs.note_auxiliary.into_iter().collect();
            if let Some(subject) = obs.subject {
                auxiliary.insert("patientId".to_string(), subject);
            }

            match obs.kind {
                ObservationKind::Organism { designator } => ClassificationInput {
                    specimen: obs.specimen,
                    organism: Some(designator),
                    antibiotic: None,
                    method: Some(MethodKind::Screen),
                    value: Measurement::Screen {
                        result: ScreenResult::Positive,
                    },
                    phenotypes: obs.note_phenotypes,
                    auxiliary,
                },
                ObservationKind::Phenotype { flag } => {
                    let mut phenotypes = obs.note_phenotypes;
                    phenotypes.insert(flag);
                    ClassificationInput {
                        specimen: obs.specimen,
                        organism: None,
                        antibiotic: None,
                        method: Some(MethodKind::Phenotype),
                        value: Measurement::Phenotype { flag },
                        phenotypes,
                        auxiliary,
                    }
                }
                ObservationKind::Susceptibility(parts) => {
                    let organism = obs
                        .derived_from
                        .iter()
                        .find_map(|id| organisms_by_id.get(id).cloned())
                        .or_else(|| {
                            obs.id
                                .as_deref()
                                .and_then(|id| member_organisms.get(id).cloned())
                        })
                        .or(obs.note_organism);
                    ClassificationInput {
                        specimen: obs.specimen,
                        organism,
                        antibiotic: Some(parts.antibiotic),
                        method: parts.method,
                        value: parts.value,
                        phenotypes: obs.note_phenotypes,
                        auxiliary,
                    }
                }
            }
        })
        .collect()
}
