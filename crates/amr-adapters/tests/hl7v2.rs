use amr_adapters::{detect_format, hl7v2, AdapterError, InputFormat};
use amr_core::models::{
    CarbapenemaseType, Measurement, MethodKind, PhenotypeFlag, ValueComparator,
};

const ORU_MESSAGE: &str = "MSH|^~\\&|LAB|HOSP|AMR|ENGINE|202501011200||ORU^R01|MSG001|P|2.5\r\
PID|1||PAT-42\r\
OBR|1|||CULTURE\r\
SPM|1|SPEC-7||BLOOD\r\
OBX|1|CE|ORGANISM^Organism identified||ECOLI^Escherichia coli\r\
OBX|2|NM|MIC^Ciprofloxacin||<=0.25|mg/L\r\
OBX|3|NM|DISC^Ceftriaxone||24|mm\r\
OBX|4|NM|MIC^Meropenem||1|mg/L||ESBL\r";

#[test]
fn oru_message_parses_into_inputs() {
    let inputs = hl7v2::parse(ORU_MESSAGE).unwrap();
    assert_eq!(inputs.len(), 4);

    let organism = &inputs[0];
    assert!(organism.is_carrier());
    assert_eq!(
        organism.organism.as_ref().unwrap().display.as_deref(),
        Some("Escherichia coli")
    );

    let cip = &inputs[1];
    assert_eq!(cip.specimen.as_ref().unwrap().as_str(), "SPEC-7");
    assert_eq!(cip.method, Some(MethodKind::Mic));
    let measured = cip.value.numeric().unwrap();
    assert_eq!(measured.value, 0.25);
    assert_eq!(measured.comparator, ValueComparator::Le);
    assert_eq!(
        cip.auxiliary.get("patientId").map(String::as_str),
        Some("PAT-42")
    );
    // The organism context flows onto following susceptibility rows.
    assert_eq!(
        cip.organism.as_ref().unwrap().display.as_deref(),
        Some("Escherichia coli")
    );

    let cro = &inputs[2];
    assert_eq!(cro.method, Some(MethodKind::Disc));
    assert_eq!(cro.value, Measurement::disc(24.0));

    let mem = &inputs[3];
    assert!(mem.phenotypes.contains(&PhenotypeFlag::Esbl));
}

#[test]
fn newline_separated_segments_parse_too() {
    let message = ORU_MESSAGE.replace('\r', "\n");
    let inputs = hl7v2::parse(&message).unwrap();
    assert_eq!(inputs.len(), 4);
}

#[test]
fn missing_msh_is_a_parse_error() {
    let message = "PID|1||PAT-42\rOBX|1|NM|MIC^Ciprofloxacin||0.25|mg/L\r";
    let error = hl7v2::parse(message).unwrap_err();
    assert!(matches!(error, AdapterError::Hl7(_)));
}

#[test]
fn non_oru_message_is_rejected() {
    let message = "MSH|^~\\&|LAB|HOSP|AMR|ENGINE|202501011200||ADT^A01|MSG001|P|2.5\r";
    assert!(hl7v2::parse(message).is_err());
}

#[test]
fn message_without_obx_yields_no_inputs() {
    let message = "MSH|^~\\&|LAB|HOSP|AMR|ENGINE|202501011200||ORU^R01|MSG001|P|2.5\r\
PID|1||PAT-42\r";
    let inputs = hl7v2::parse(message).unwrap();
    assert!(inputs.is_empty());
}

#[test]
fn carbapenemase_abnormal_flag_carries_subtype() {
    let message = "MSH|^~\\&|LAB|HOSP|AMR|ENGINE|202501011200||ORU^R01|MSG001|P|2.5\r\
OBX|1|NM|MIC^Meropenem||16|mg/L||KPC\r";
    let inputs = hl7v2::parse(message).unwrap();
    assert!(inputs[0]
        .phenotypes
        .contains(&PhenotypeFlag::Carbapenemase(CarbapenemaseType::Kpc)));
}

#[test]
fn esbl_screen_obx_becomes_a_phenotype_carrier() {
    let message = "MSH|^~\\&|LAB|HOSP|AMR|ENGINE|202501011200||ORU^R01|MSG001|P|2.5\r\
OBX|1|CE|ESBL SCREEN||POSITIVE\r";
    let inputs = hl7v2::parse(message).unwrap();
    assert_eq!(inputs.len(), 1);
    assert!(inputs[0].is_carrier());
    assert!(inputs[0].phenotypes.contains(&PhenotypeFlag::Esbl));
}

#[test]
fn format_detection_covers_all_shapes() {
    assert_eq!(
        detect_format(ORU_MESSAGE.as_bytes(), None).unwrap(),
        InputFormat::Hl7V2
    );
    assert_eq!(
        detect_format(br#"{"resourceType": "Bundle"}"#, None).unwrap(),
        InputFormat::Fhir
    );
    assert_eq!(
        detect_format(br#"{"organism": "E. coli"}"#, None).unwrap(),
        InputFormat::Native
    );
    assert_eq!(
        detect_format(b"  \n  [ {\"resourceType\": \"Observation\"} ]", None).unwrap(),
        InputFormat::Fhir
    );
    assert_eq!(
        detect_format(b"anything", Some("application/hl7-v2")).unwrap(),
        InputFormat::Hl7V2
    );
    assert_eq!(
        detect_format(b"\"just a string\"", Some("application/fhir+json; charset=utf-8")).unwrap(),
        InputFormat::Fhir
    );
    assert!(detect_format(b"<xml/>", None).is_err());
}
