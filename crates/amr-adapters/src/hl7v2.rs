//! HL7 v2 ORU^R01 adapter.
//!
//! Segments are parsed positionally with delimiters taken from MSH-1/MSH-2;
//! segment separators may be `\r`, `\n`, or `\r\n`. OBX segments are
//! classified by their observation identifier: organism identifications set
//! the organism context for the susceptibility observations that follow,
//! the way result messages interleave them.

use std::collections::{BTreeMap, BTreeSet};

use amr_core::models::{
    CarbapenemaseType, ClassificationInput, Designator, MeasuredValue, Measurement, MethodKind,
    PhenotypeFlag, ScreenResult, SpecimenRef, ValueComparator,
};
use amr_terminology::tables;

use crate::error::AdapterError;

/// Parse an ORU^R01-shaped message into classification inputs.
///
/// A message with no OBX segments yields an empty list; a missing or
/// malformed MSH is a parse error.
pub fn parse(message: &str) -> Result<Vec<ClassificationInput>, AdapterError> {
    let message = Message::parse(message)?;

    if !message.message_type.starts_with("ORU") {
        return Err(AdapterError::Hl7(format!(
            "unsupported message type: {}",
            message.message_type
        )));
    }

    let patient_id = message.first_field("PID", 3);
    let specimen = message
        .first_field("SPM", 2)
        .or_else(|| message.first_field("OBR", 3))
        .map(SpecimenRef::new);
    let specimen_type = message.first_field("SPM", 4);

    let mut inputs: Vec<ClassificationInput> = Vec::new();
    let mut organism_context: Option<Designator> = None;

    for segment in message.segments_of("OBX") {
        let observation_id = segment.field(3).unwrap_or_default();
        let id_upper = message.components(&observation_id).join(" ").to_uppercase();
        let value = segment.field(5).unwrap_or_default();
        let units = segment.field(6).unwrap_or_default().to_uppercase();
        let abnormal_flags = segment.field(8).unwrap_or_default().to_uppercase();

        let mut auxiliary: BTreeMap<String, String> = BTreeMap::new();
        if let Some(patient_id) = &patient_id {
            auxiliary.insert("patientId".to_string(), patient_id.clone());
        }
        if let Some(specimen_type) = &specimen_type {
            auxiliary.insert("specimenType".to_string(), specimen_type.clone());
        }

        if is_organism_observation(&id_upper) {
            let designator = organism_designator(&message, &value);
            organism_context = Some(designator.clone());
            inputs.push(ClassificationInput {
                specimen: specimen.clone(),
                organism: Some(designator),
                antibiotic: None,
                method: Some(MethodKind::Screen),
                value: Measurement::Screen {
                    result: ScreenResult::Positive,
                },
                phenotypes: BTreeSet::new(),
                auxiliary,
            });
            continue;
        }

        if let Some(flag) = screen_phenotype(&id_upper, &value) {
            inputs.push(ClassificationInput {
                specimen: specimen.clone(),
                organism: None,
                antibiotic: None,
                method: Some(MethodKind::Phenotype),
                value: Measurement::Phenotype { flag },
                phenotypes: BTreeSet::from([flag]),
                auxiliary,
            });
            continue;
        }

        let method = observation_method(&id_upper, &units, &value);
        let method = match method {
            Some(method) => method,
            None => {
                tracing::debug!(observation = %observation_id, "skipping unrecognized OBX");
                continue;
            }
        };

        let antibiotic = match extract_antibiotic(&message, &observation_id) {
            Some(designator) => designator,
            None => {
                tracing::debug!(
                    observation = %observation_id,
                    "susceptibility OBX names no recognizable antibiotic"
                );
                continue;
            }
        };

        let numeric = parse_prefixed_value(&value);
        if let Some(measured) = &numeric {
            if !measured.comparator.is_eq() {
                auxiliary.insert(
                    "valueComparator".to_string(),
                    measured.comparator.as_str().to_string(),
                );
            }
        }
        let measurement = match method {
            MethodKind::Disc => Measurement::Disc { value: numeric },
            _ => Measurement::Mic { value: numeric },
        };

        inputs.push(ClassificationInput {
            specimen: specimen.clone(),
            organism: organism_context.clone(),
            antibiotic: Some(antibiotic),
            method: Some(method),
            value: measurement,
            phenotypes: parse_abnormal_flags(&abnormal_flags),
            auxiliary,
        });
    }

    Ok(inputs)
}

/// A delimiter-aware view of one message.
struct Message {
    component_separator: char,
    message_type: String,
    segments: Vec<Segment>,
}

struct Segment {
    fields: Vec<String>,
}

impl Segment {
    fn kind(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or_default()
    }

    fn field(&self, index: usize) -> Option<String> {
        self.fields.get(index).cloned().filter(|f| !f.is_empty())
    }
}

impl Message {
    fn parse(raw: &str) -> Result<Self, AdapterError> {
        let raw = raw.trim_start_matches(['\u{feff}', '\n', '\r']);
        if !raw.starts_with("MSH") {
            return Err(AdapterError::Hl7("missing MSH segment".to_string()));
        }

        // MSH-1 is the field separator itself; MSH-2 opens with the
        // component separator.
        let mut chars = raw.chars().skip(3);
        let field_separator = chars
            .next()
            .ok_or_else(|| AdapterError::Hl7("truncated MSH segment".to_string()))?;
        let component_separator = chars.next().unwrap_or('^');

        let segments: Vec<Segment> = raw
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| Segment {
                fields: line.split(field_separator).map(str::to_string).collect(),
            })
            .collect();

        let msh = &segments[0];
        let message_type = msh
            .field(8)
            .map(|f| f.replace(component_separator, "^"))
            .ok_or_else(|| AdapterError::Hl7("MSH-9 message type missing".to_string()))?;

        Ok(Self {
            component_separator,
            message_type,
            segments,
        })
    }

    fn segments_of(&self, kind: &str) -> impl Iterator<Item = &Segment> {
        let kind = kind.to_string();
        self.segments
            .iter()
            .filter(move |segment| segment.kind() == kind)
    }

    fn first_field(&self, kind: &str, index: usize) -> Option<String> {
        self.segments_of(kind)
            .next()
            .and_then(|segment| segment.field(index))
            .map(|field| self.components(&field)[0].clone())
    }

    fn components(&self, field: &str) -> Vec<String> {
        field
            .split(self.component_separator)
            .map(str::to_string)
            .collect()
    }
}

fn is_organism_observation(id_upper: &str) -> bool {
    ["ORGANISM", "IDENTIFICATION", "ISOLATE", "CULTURE RESULT"]
        .iter()
        .any(|marker| id_upper.contains(marker))
        || id_upper.split_whitespace().any(|token| token == "ORG")
}

fn organism_designator(message: &Message, value: &str) -> Designator {
    let components = message.components(value);
    let code = components.first().cloned().filter(|c| !c.is_empty());
    // Fall back to the code text so short codes like ECOLI resolve through
    // the alias table.
    let display = components
        .get(1)
        .cloned()
        .filter(|c| !c.is_empty())
        .or_else(|| code.clone());
    Designator {
        system: None,
        code,
        display,
    }
}

fn screen_phenotype(id_upper: &str, value: &str) -> Option<PhenotypeFlag> {
    let flag = if id_upper.contains("ESBL") {
        PhenotypeFlag::Esbl
    } else if id_upper.contains("CARBAPENEMASE") {
        PhenotypeFlag::Carbapenemase(CarbapenemaseType::Unspecified)
    } else if id_upper.contains("MRSA") || (id_upper.contains("SCREEN") && id_upper.contains("FOX"))
    {
        PhenotypeFlag::Mrsa
    } else if id_upper.contains("VRE") {
        PhenotypeFlag::Vre
    } else if id_upper.contains("D-TEST") || id_upper.contains("D TEST") {
        PhenotypeFlag::InducibleClinda
    } else {
        return None;
    };

    let value_upper = value.to_uppercase();
    let positive = value_upper.contains("POS")
        || (value_upper.contains("DETECTED") && !value_upper.contains("NOT DETECTED"))
        || value_upper == "+";
    if positive {
        Some(flag)
    } else {
        None
    }
}

fn observation_method(id_upper: &str, units_upper: &str, value: &str) -> Option<MethodKind> {
    // Units are authoritative when present.
    if ["MG/L", "UG/ML", "MCG/ML"]
        .iter()
        .any(|unit| units_upper.contains(unit))
    {
        return Some(MethodKind::Mic);
    }
    if units_upper.contains("MM") {
        return Some(MethodKind::Disc);
    }

    // Token-level check so agent names containing "MIC" don't match.
    let tokens: Vec<&str> = id_upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.contains(&"MIC") {
        return Some(MethodKind::Mic);
    }
    if tokens.contains(&"DISC")
        || tokens.contains(&"DISK")
        || id_upper.contains("ZONE")
        || id_upper.contains("DIFFUSION")
    {
        return Some(MethodKind::Disc);
    }

    if id_upper.contains("SUSC") || id_upper.contains("SENSITIVITY") {
        if value.to_uppercase().contains("ZONE") {
            return Some(MethodKind::Disc);
        }
        return Some(MethodKind::Mic);
    }
    None
}

/// Find the antibiotic named anywhere in the OBX-3 components.
fn extract_antibiotic(message: &Message, observation_id: &str) -> Option<Designator> {
    for component in message.components(observation_id) {
        let stripped = component
            .trim()
            .trim_start_matches("MIC")
            .trim_start_matches("DISC")
            .trim_start_matches("DISK")
            .trim_matches(['-', '_', ' ']);
        for candidate in [component.trim(), stripped] {
            if candidate.is_empty() {
                continue;
            }
            let normalized = tables::normalize_display(candidate);
            if tables::antibiotic_by_display(&normalized).is_some() {
                return Some(Designator::text(candidate));
            }
        }
    }
    None
}

/// Parse an OBX-5 numeric with an optional comparator prefix. Returns the
/// in-band missing sentinel when no numeric is present.
fn parse_prefixed_value(value: &str) -> Option<MeasuredValue> {
    let trimmed = value.trim();
    let (comparator, rest) = if let Some(rest) = trimmed.strip_prefix("<=") {
        (ValueComparator::Le, rest)
    } else if let Some(rest) = trimmed.strip_prefix(">=") {
        (ValueComparator::Ge, rest)
    } else if let Some(rest) = trimmed.strip_prefix('<') {
        (ValueComparator::Lt, rest)
    } else if let Some(rest) = trimmed.strip_prefix('>') {
        (ValueComparator::Gt, rest)
    } else {
        (ValueComparator::Eq, trimmed)
    };

    let numeric: String = rest
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric
        .parse::<f64>()
        .ok()
        .map(|value| MeasuredValue { value, comparator })
}

fn parse_abnormal_flags(flags_upper: &str) -> BTreeSet<PhenotypeFlag> {
    let mut phenotypes = BTreeSet::new();
    if flags_upper.is_empty() {
        return phenotypes;
    }
    if flags_upper.contains("ESBL") {
        phenotypes.insert(PhenotypeFlag::Esbl);
    }
    if flags_upper.contains("MRSA") {
        phenotypes.insert(PhenotypeFlag::Mrsa);
    }
    if flags_upper.contains("VRE") {
        phenotypes.insert(PhenotypeFlag::Vre);
    }
    if flags_upper.contains("KPC") {
        phenotypes.insert(PhenotypeFlag::Carbapenemase(CarbapenemaseType::Kpc));
    } else if flags_upper.contains("NDM") {
        phenotypes.insert(PhenotypeFlag::Carbapenemase(CarbapenemaseType::Ndm));
    } else if flags_upper.contains("OXA") {
        phenotypes.insert(PhenotypeFlag::Carbapenemase(CarbapenemaseType::Oxa48));
    }
    phenotypes
}
