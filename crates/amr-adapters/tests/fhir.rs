use amr_adapters::fhir;
use amr_adapters::group_inputs;
use amr_core::models::{Measurement, MethodKind, PhenotypeFlag, ValueComparator};

fn bundle(entries: Vec<serde_json::Value>) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": entries.into_iter().map(|r| serde_json::json!({ "resource": r })).collect::<Vec<_>>(),
    }))
    .unwrap()
}

fn organism_observation(id: &str, specimen: &str, display: &str, code: &str) -> serde_json::Value {
    serde_json::json!({
        "resourceType": "Observation",
        "id": id,
        "category": [{ "coding": [{ "code": "laboratory" }] }],
        "code": { "coding": [{ "system": "http://loinc.org", "code": "634-6" }], "text": "Organism identified" },
        "valueCodeableConcept": {
            "coding": [{ "system": "http://snomed.info/sct", "code": code, "display": display }]
        },
        "specimen": { "reference": specimen }
    })
}

fn mic_observation(id: &str, specimen: &str, antibiotic: &str, value: f64) -> serde_json::Value {
    serde_json::json!({
        "resourceType": "Observation",
        "id": id,
        "category": [{ "coding": [{ "code": "laboratory" }] }],
        "code": { "text": format!("{antibiotic} [Susceptibility] by MIC") },
        "valueQuantity": { "value": value, "unit": "mg/L" },
        "specimen": { "reference": specimen }
    })
}

#[test]
fn bundle_links_organism_by_shared_specimen() {
    let payload = bundle(vec![
        organism_observation("org1", "Specimen/A", "Escherichia coli", "112283007"),
        mic_observation("mic1", "Specimen/A", "Ceftriaxone", 0.5),
    ]);
    let inputs = fhir::parse(&payload).unwrap();
    assert_eq!(inputs.len(), 2);

    let grouped = group_inputs(inputs);
    assert_eq!(grouped.len(), 1);
    let input = &grouped[0];
    assert_eq!(
        input.organism.as_ref().unwrap().display.as_deref(),
        Some("Escherichia coli")
    );
    assert_eq!(input.method, Some(MethodKind::Mic));
    assert_eq!(input.value, Measurement::mic(0.5));
}

#[test]
fn derived_from_links_across_specimens() {
    let mut susceptibility = mic_observation("mic1", "Specimen/B", "Gentamicin", 1.0);
    susceptibility["derivedFrom"] = serde_json::json!([{ "reference": "Observation/org1" }]);
    let payload = bundle(vec![
        organism_observation("org1", "Specimen/A", "Klebsiella pneumoniae", "40886007"),
        susceptibility,
    ]);
    let inputs = fhir::parse(&payload).unwrap();
    let susceptibility = inputs.iter().find(|i| !i.is_carrier()).unwrap();
    assert_eq!(
        susceptibility.organism.as_ref().unwrap().display.as_deref(),
        Some("Klebsiella pneumoniae")
    );
}

#[test]
fn missing_value_quantity_becomes_the_sentinel() {
    let observation = serde_json::json!({
        "resourceType": "Observation",
        "category": [{ "coding": [{ "code": "laboratory" }] }],
        "code": { "text": "Gentamicin [Susceptibility] by MIC" },
        "method": { "text": "MIC" }
    });
    let inputs = fhir::parse(serde_json::to_vec(&observation).unwrap().as_slice()).unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].method, Some(MethodKind::Mic));
    assert!(inputs[0].value.is_missing_numeric());
}

#[test]
fn non_laboratory_observations_are_skipped() {
    let observation = serde_json::json!({
        "resourceType": "Observation",
        "category": [{ "coding": [{ "code": "vital-signs" }] }],
        "code": { "text": "Heart rate" },
        "valueQuantity": { "value": 80.0, "unit": "/min" }
    });
    let payload = bundle(vec![
        observation,
        mic_observation("mic1", "Specimen/A", "Ceftriaxone", 0.5),
    ]);
    let inputs = fhir::parse(&payload).unwrap();
    assert_eq!(inputs.len(), 1);
}

#[test]
fn phenotype_observation_produces_a_flag() {
    let esbl = serde_json::json!({
        "resourceType": "Observation",
        "category": [{ "coding": [{ "code": "laboratory" }] }],
        "code": { "text": "ESBL detection" },
        "valueCodeableConcept": { "text": "Detected" },
        "specimen": { "reference": "Specimen/A" }
    });
    let payload = bundle(vec![
        organism_observation("org1", "Specimen/A", "Escherichia coli", "112283007"),
        esbl,
        mic_observation("mic1", "Specimen/A", "Ceftazidime", 1.0),
    ]);
    let grouped = group_inputs(fhir::parse(&payload).unwrap());
    assert_eq!(grouped.len(), 1);
    assert!(grouped[0].phenotypes.contains(&PhenotypeFlag::Esbl));
}

#[test]
fn negative_phenotype_screens_carry_no_flag() {
    let screen = serde_json::json!({
        "resourceType": "Observation",
        "category": [{ "coding": [{ "code": "laboratory" }] }],
        "code": { "text": "MRSA screen" },
        "valueCodeableConcept": { "text": "Not detected" },
        "specimen": { "reference": "Specimen/A" }
    });
    let payload = bundle(vec![
        screen,
        mic_observation("mic1", "Specimen/A", "Oxacillin", 0.25),
    ]);
    let grouped = group_inputs(fhir::parse(&payload).unwrap());
    assert_eq!(grouped.len(), 1);
    assert!(grouped[0].phenotypes.is_empty());
}

#[test]
fn quantity_comparator_is_preserved() {
    let mut observation = mic_observation("mic1", "Specimen/A", "Meropenem", 0.25);
    observation["valueQuantity"]["comparator"] = serde_json::json!("<=");
    let inputs = fhir::parse(serde_json::to_vec(&observation).unwrap().as_slice()).unwrap();
    let measured = inputs[0].value.numeric().unwrap();
    assert_eq!(measured.comparator, ValueComparator::Le);
}

#[test]
fn note_features_merge_into_the_input() {
    let mut observation = mic_observation("mic1", "Specimen/A", "Ceftazidime", 1.0);
    observation["note"] = serde_json::json!([{ "text": "E. coli; ESBL=true; ward=ICU" }]);
    let inputs = fhir::parse(serde_json::to_vec(&observation).unwrap().as_slice()).unwrap();
    let input = &inputs[0];
    assert_eq!(input.organism.as_ref().unwrap().display.as_deref(), Some("E. coli"));
    assert!(input.phenotypes.contains(&PhenotypeFlag::Esbl));
    assert_eq!(input.auxiliary.get("ward").map(String::as_str), Some("ICU"));
}

#[test]
fn payload_without_observations_is_an_error() {
    let payload = serde_json::to_vec(&serde_json::json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": []
    }))
    .unwrap();
    assert!(fhir::parse(&payload).is_err());
}
