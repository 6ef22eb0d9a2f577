use amr_adapters::{group_inputs, native};
use amr_core::models::{Designator, Measurement, MethodKind, PhenotypeFlag, ScreenResult};

#[test]
fn flat_record_parses_into_an_input() {
    let payload = serde_json::json!({
        "organism": "Escherichia coli",
        "organism_snomed": "112283007",
        "antibiotic": "Amoxicillin",
        "method": "MIC",
        "mic_mg_L": 4.0,
        "specimenId": "SPEC-001",
        "patientId": "PT-001",
        "features": { "esbl": true, "ward": "ICU" }
    });
    let inputs = native::parse(serde_json::to_vec(&payload).unwrap().as_slice()).unwrap();
    assert_eq!(inputs.len(), 1);

    let input = &inputs[0];
    assert_eq!(input.specimen.as_ref().unwrap().as_str(), "SPEC-001");
    let organism = input.organism.as_ref().unwrap();
    assert_eq!(organism.code.as_deref(), Some("112283007"));
    assert_eq!(organism.display.as_deref(), Some("Escherichia coli"));
    assert_eq!(input.method, Some(MethodKind::Mic));
    assert_eq!(input.value, Measurement::mic(4.0));
    assert!(input.phenotypes.contains(&PhenotypeFlag::Esbl));
    assert_eq!(input.auxiliary.get("ward").map(String::as_str), Some("ICU"));
    assert_eq!(
        input.auxiliary.get("patientId").map(String::as_str),
        Some("PT-001")
    );
}

#[test]
fn method_is_inferred_from_the_present_value() {
    let payload = serde_json::json!({
        "organism": "Staphylococcus aureus",
        "antibiotic": "Ciprofloxacin",
        "disc_zone_mm": 20.0
    });
    let inputs = native::parse(serde_json::to_vec(&payload).unwrap().as_slice()).unwrap();
    assert_eq!(inputs[0].method, Some(MethodKind::Disc));
    assert_eq!(inputs[0].value, Measurement::disc(20.0));
}

#[test]
fn declared_mic_method_without_value_keeps_the_sentinel() {
    let payload = serde_json::json!({
        "organism": "Escherichia coli",
        "antibiotic": "Amoxicillin",
        "method": "MIC"
    });
    let inputs = native::parse(serde_json::to_vec(&payload).unwrap().as_slice()).unwrap();
    assert_eq!(inputs[0].method, Some(MethodKind::Mic));
    assert!(inputs[0].value.is_missing_numeric());
}

#[test]
fn arrays_parse_in_order() {
    let payload = serde_json::json!([
        { "organism": "Escherichia coli", "antibiotic": "Amoxicillin", "method": "MIC", "mic_mg_L": 4.0 },
        { "organism": "Escherichia coli", "antibiotic": "Gentamicin", "method": "MIC", "mic_mg_L": 1.0 }
    ]);
    let inputs = native::parse(serde_json::to_vec(&payload).unwrap().as_slice()).unwrap();
    assert_eq!(inputs.len(), 2);
    assert_eq!(
        inputs[0].antibiotic.as_ref().unwrap().display.as_deref(),
        Some("Amoxicillin")
    );
    assert_eq!(
        inputs[1].antibiotic.as_ref().unwrap().display.as_deref(),
        Some("Gentamicin")
    );
}

#[test]
fn structured_inputs_pass_through() {
    let input = amr_core::models::ClassificationInput {
        specimen: Some(amr_core::models::SpecimenRef::new("S1")),
        organism: Some(Designator::text("Escherichia coli")),
        antibiotic: Some(Designator::text("Amoxicillin")),
        method: Some(MethodKind::Mic),
        value: Measurement::mic(4.0),
        phenotypes: Default::default(),
        auxiliary: Default::default(),
    };
    let payload = serde_json::to_vec(&input).unwrap();
    let inputs = native::parse(&payload).unwrap();
    assert_eq!(inputs, vec![input]);
}

#[test]
fn malformed_json_is_an_error() {
    assert!(native::parse(b"{ not json").is_err());
}

#[test]
fn grouping_duplicates_on_ambiguous_organisms() {
    let carrier = |name: &str| amr_core::models::ClassificationInput {
        specimen: Some(amr_core::models::SpecimenRef::new("SPEC-1")),
        organism: Some(Designator::text(name)),
        antibiotic: None,
        method: Some(MethodKind::Screen),
        value: Measurement::Screen {
            result: ScreenResult::Positive,
        },
        phenotypes: Default::default(),
        auxiliary: Default::default(),
    };
    let susceptibility = amr_core::models::ClassificationInput {
        specimen: Some(amr_core::models::SpecimenRef::new("SPEC-1")),
        organism: None,
        antibiotic: Some(Designator::text("Gentamicin")),
        method: Some(MethodKind::Mic),
        value: Measurement::mic(1.0),
        phenotypes: Default::default(),
        auxiliary: Default::default(),
    };

    let grouped = group_inputs(vec![
        carrier("Escherichia coli"),
        carrier("Klebsiella pneumoniae"),
        susceptibility,
    ]);

    assert_eq!(grouped.len(), 2);
    for duplicate in &grouped {
        assert_eq!(
            duplicate.auxiliary.get("ambiguous-organism").map(String::as_str),
            Some("true")
        );
    }
    let organisms: Vec<_> = grouped
        .iter()
        .map(|i| i.organism.as_ref().unwrap().raw())
        .collect();
    assert!(organisms.contains(&"Escherichia coli".to_string()));
    assert!(organisms.contains(&"Klebsiella pneumoniae".to_string()));
}

#[test]
fn grouping_synthesizes_specimens_by_position() {
    let input = amr_core::models::ClassificationInput {
        specimen: None,
        organism: Some(Designator::text("Escherichia coli")),
        antibiotic: Some(Designator::text("Amoxicillin")),
        method: Some(MethodKind::Mic),
        value: Measurement::mic(4.0),
        phenotypes: Default::default(),
        auxiliary: Default::default(),
    };
    let grouped = group_inputs(vec![input]);
    assert_eq!(grouped[0].specimen.as_ref().unwrap().as_str(), "specimen-0");
}
