//! Native adapter: the engine's own JSON wire form, either structured
//! classification inputs or the flat record shape laboratory integrations
//! already send. Validation here is structural only; semantic disagreement
//! between method and value is gating's job.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use amr_core::models::{
    CarbapenemaseType, ClassificationInput, Designator, Measurement, MethodKind, PhenotypeFlag,
    SpecimenRef,
};

use crate::error::AdapterError;

const SNOMED_SYSTEM: &str = "http://snomed.info/sct";
const ATC_SYSTEM: &str = "http://www.whocc.no/atc";

/// Flat record shape: names match the historical wire format.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlatRecord {
    #[serde(default)]
    organism: Option<String>,
    #[serde(default)]
    organism_snomed: Option<String>,
    #[serde(default)]
    antibiotic: Option<String>,
    #[serde(default)]
    antibiotic_atc: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default, rename = "mic_mg_L")]
    mic_mg_l: Option<f64>,
    #[serde(default)]
    disc_zone_mm: Option<f64>,
    #[serde(default, rename = "specimenId")]
    specimen_id: Option<String>,
    #[serde(default, rename = "patientId")]
    patient_id: Option<String>,
    #[serde(default)]
    features: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NativeRecord {
    Structured(ClassificationInput),
    Flat(FlatRecord),
}

/// Parse a native payload: one record or an array of records.
pub fn parse(payload: &[u8]) -> Result<Vec<ClassificationInput>, AdapterError> {
    let value: serde_json::Value = serde_json::from_slice(payload)?;
    let records: Vec<NativeRecord> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        _ => vec![serde_json::from_value(value)?],
    };

    Ok(records
        .into_iter()
        .map(|record| match record {
            NativeRecord::Structured(input) => input,
            NativeRecord::Flat(flat) => from_flat(flat),
        })
        .collect())
}

fn from_flat(record: FlatRecord) -> ClassificationInput {
    let organism = match (&record.organism, &record.organism_snomed) {
        (Some(display), Some(code)) => {
            Some(Designator::coded(SNOMED_SYSTEM, code).with_display(display))
        }
        (Some(display), None) => Some(Designator::text(display)),
        (None, Some(code)) => Some(Designator::coded(SNOMED_SYSTEM, code)),
        (None, None) => None,
    };

    let antibiotic = match (&record.antibiotic, &record.antibiotic_atc) {
        (Some(display), Some(code)) => {
            Some(Designator::coded(ATC_SYSTEM, code).with_display(display))
        }
        (Some(display), None) => Some(Designator::text(display)),
        (None, Some(code)) => Some(Designator::coded(ATC_SYSTEM, code)),
        (None, None) => None,
    };

    let method = record
        .method
        .as_deref()
        .and_then(|m| m.parse::<MethodKind>().ok())
        .or(match (record.mic_mg_l, record.disc_zone_mm) {
            (Some(_), None) => Some(MethodKind::Mic),
            (None, Some(_)) => Some(MethodKind::Disc),
            _ => None,
        });

    // The value variant follows the declared method so a missing numeric
    // stays visible as the in-band sentinel.
    let value = match method {
        Some(MethodKind::Disc) => Measurement::Disc {
            value: record.disc_zone_mm.map(amr_core::models::MeasuredValue::exact),
        },
        _ => Measurement::Mic {
            value: record.mic_mg_l.map(amr_core::models::MeasuredValue::exact),
        },
    };

    let (phenotypes, mut auxiliary) = split_features(record.features);
    if let Some(patient_id) = record.patient_id {
        auxiliary.insert("patientId".to_string(), patient_id);
    }

    ClassificationInput {
        specimen: record.specimen_id.map(SpecimenRef::new),
        organism,
        antibiotic,
        method,
        value,
        phenotypes,
        auxiliary,
    }
}

/// Split the flat `features` map into phenotype flags and auxiliary strings.
fn split_features(
    features: BTreeMap<String, serde_json::Value>,
) -> (BTreeSet<PhenotypeFlag>, BTreeMap<String, String>) {
    let mut phenotypes = BTreeSet::new();
    let mut auxiliary = BTreeMap::new();

    for (key, value) in features {
        let truthy = value.as_bool().unwrap_or(false);
        let flag = match key.to_lowercase().as_str() {
            "esbl" => Some(PhenotypeFlag::Esbl),
            "ampc" => Some(PhenotypeFlag::AmpC),
            "mrsa" => Some(PhenotypeFlag::Mrsa),
            "mssa" => Some(PhenotypeFlag::Mssa),
            "vre" => Some(PhenotypeFlag::Vre),
            "vse" => Some(PhenotypeFlag::Vse),
            "carbapenemase" => Some(PhenotypeFlag::Carbapenemase(CarbapenemaseType::Unspecified)),
            "d_test_positive" | "inducible_clindamycin" => Some(PhenotypeFlag::InducibleClinda),
            _ => None,
        };
        match flag {
            Some(flag) if truthy => {
                phenotypes.insert(flag);
            }
            Some(_) => {}
            None => {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                auxiliary.insert(key, text);
            }
        }
    }

    (phenotypes, auxiliary)
}
