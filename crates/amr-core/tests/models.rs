use amr_core::models::{
    ClassificationInput, Decision, Designator, MeasuredValue, Measurement, MethodKind,
    ValueComparator,
};

#[test]
fn decision_wire_form() {
    assert_eq!(serde_json::to_string(&Decision::S).unwrap(), "\"S\"");
    assert_eq!(serde_json::to_string(&Decision::Rr).unwrap(), "\"RR\"");
    assert_eq!(
        serde_json::to_string(&Decision::RequiresReview).unwrap(),
        "\"Requires Review\""
    );
    let parsed: Decision = serde_json::from_str("\"Requires Review\"").unwrap();
    assert_eq!(parsed, Decision::RequiresReview);
}

#[test]
fn decision_order_tracks_resistance() {
    assert!(Decision::S < Decision::I);
    assert!(Decision::I < Decision::R);
    assert!(Decision::R < Decision::Rr);
}

#[test]
fn method_parses_common_spellings() {
    assert_eq!("MIC".parse::<MethodKind>().unwrap(), MethodKind::Mic);
    assert_eq!("disk".parse::<MethodKind>().unwrap(), MethodKind::Disc);
    assert_eq!(
        "DISK_DIFFUSION".parse::<MethodKind>().unwrap(),
        MethodKind::Disc
    );
    assert_eq!("Etest".parse::<MethodKind>().unwrap(), MethodKind::Gradient);
    assert!("colorimetry".parse::<MethodKind>().is_err());
}

#[test]
fn comparator_prefixed_values_nudge_across_thresholds() {
    let le = MeasuredValue::with_comparator(0.25, ValueComparator::Le);
    assert_eq!(le.effective(), 0.25);

    let gt = MeasuredValue::with_comparator(8.0, ValueComparator::Gt);
    assert!(gt.effective() > 8.0);

    let lt = MeasuredValue::with_comparator(8.0, ValueComparator::Lt);
    assert!(lt.effective() < 8.0);

    assert_eq!(gt.to_string(), ">8");
    assert_eq!(MeasuredValue::exact(4.0).to_string(), "4");
}

#[test]
fn measurement_variant_agreement() {
    assert!(Measurement::mic(4.0).agrees_with(MethodKind::Mic));
    assert!(Measurement::mic(4.0).agrees_with(MethodKind::Gradient));
    assert!(!Measurement::mic(4.0).agrees_with(MethodKind::Disc));
    assert!(Measurement::missing_disc().agrees_with(MethodKind::Disc));
    assert!(Measurement::missing_mic().is_missing_numeric());
    assert!(!Measurement::disc(20.0).is_missing_numeric());
}

#[test]
fn input_round_trips_with_camel_case_wire_names() {
    let input = ClassificationInput {
        specimen: Some(amr_core::models::SpecimenRef::new("SPEC-1")),
        organism: Some(Designator::text("Escherichia coli")),
        antibiotic: Some(Designator::coded("http://www.whocc.no/atc", "J01CA04")),
        method: Some(MethodKind::Mic),
        value: Measurement::mic(4.0),
        phenotypes: Default::default(),
        auxiliary: Default::default(),
    };

    let json = serde_json::to_value(&input).unwrap();
    assert_eq!(json["specimen"], "SPEC-1");
    assert_eq!(json["method"], "MIC");
    assert_eq!(json["value"]["kind"], "mic");
    assert_eq!(json["value"]["value"]["value"], 4.0);

    let back: ClassificationInput = serde_json::from_value(json).unwrap();
    assert_eq!(back, input);
}

#[test]
fn missing_value_serializes_without_value_field() {
    let json = serde_json::to_value(Measurement::missing_mic()).unwrap();
    assert_eq!(json, serde_json::json!({ "kind": "mic" }));
}
