//! Conflict resolution across repeated measurements of one
//! (specimen, organism, antibiotic) triple.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use amr_catalog::CatalogStore;
use amr_core::context::RequestContext;
use amr_core::models::{ClassificationInput, Decision, Designator, Measurement};
use amr_engine::{ClassificationEngine, EngineConfig};

fn engine() -> ClassificationEngine {
    let store = CatalogStore::open(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../rules/eucast-2025.1.yaml"
    ))
    .unwrap();
    ClassificationEngine::new(Arc::new(store), EngineConfig::default())
}

fn engine_from(dir: &Path, yaml: &str) -> ClassificationEngine {
    let path = dir.join("catalog.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    let store = CatalogStore::open(&path).unwrap();
    ClassificationEngine::new(Arc::new(store), EngineConfig::default())
}

fn measurement_input(antibiotic: &str, value: Measurement) -> ClassificationInput {
    ClassificationInput {
        specimen: Some(amr_core::models::SpecimenRef::new("CONF-1")),
        organism: Some(Designator::text("Escherichia coli")),
        antibiotic: Some(Designator::text(antibiotic)),
        method: Some(value.implied_method()),
        value,
        phenotypes: Default::default(),
        auxiliary: Default::default(),
    }
}

#[tokio::test]
async fn concordant_measurements_merge_into_one_result() {
    let results = engine()
        .classify(
            &RequestContext::new("conf"),
            vec![
                measurement_input("Gentamicin", Measurement::mic(1.0)),
                measurement_input("Gentamicin", Measurement::mic(2.0)),
            ],
        )
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].decision, Decision::S);
    assert!(results[0].reason.contains("2 concordant measurements"));
}

#[tokio::test]
async fn same_method_disagreement_requires_review() {
    let results = engine()
        .classify(
            &RequestContext::new("conf"),
            vec![
                measurement_input("Gentamicin", Measurement::mic(1.0)),
                measurement_input("Gentamicin", Measurement::mic(8.0)),
            ],
        )
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].decision, Decision::RequiresReview);
    assert_eq!(results[0].reason, "duplicate measurements disagree");
}

#[tokio::test]
async fn cross_method_disagreement_follows_precedence() {
    let results = engine()
        .classify(
            &RequestContext::new("conf"),
            vec![
                measurement_input("Ciprofloxacin", Measurement::mic(0.25)),
                measurement_input("Ciprofloxacin", Measurement::disc(15.0)),
            ],
        )
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].decision, Decision::S);
    assert!(results[0].reason.starts_with("MIC preferred"));
    assert!(results[0].reason.contains("disc diffusion disagrees"));
}

#[tokio::test]
async fn disabled_precedence_reviews_cross_method_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_from(
        dir.path(),
        r#"
version: no-precedence
policy:
  methodPrecedence: null
breakpoints:
  - organism: { exact: Escherichia coli }
    antibiotic: Ciprofloxacin
    method: MIC
    susceptible: 0.25
    resistant: 0.5
    comparator: LE_S_GT_R
    unit: MG_PER_L
  - organism: { exact: Escherichia coli }
    antibiotic: Ciprofloxacin
    method: DISC
    susceptible: 25.0
    resistant: 22.0
    comparator: INVERSE_FOR_DISC
    unit: MM
"#,
    );
    let results = engine
        .classify(
            &RequestContext::new("conf"),
            vec![
                measurement_input("Ciprofloxacin", Measurement::mic(0.25)),
                measurement_input("Ciprofloxacin", Measurement::disc(15.0)),
            ],
        )
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].decision, Decision::RequiresReview);
    assert_eq!(results[0].reason, "conflicting methods: MIC=S, DISC=R");
}

#[tokio::test]
async fn expert_decisions_survive_breakpoint_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_from(
        dir.path(),
        r#"
version: expert-conflict
breakpoints:
  - organism: { exact: Escherichia coli }
    antibiotic: Gentamicin
    method: MIC
    susceptible: 2.0
    resistant: 2.0
    comparator: LE_S_GT_R
    unit: MG_PER_L
  - organism: { exact: Escherichia coli }
    antibiotic: Gentamicin
    method: DISC
    susceptible: 17.0
    resistant: 14.0
    comparator: INVERSE_FOR_DISC
    unit: MM
expertRules:
  - id: RULE-GEN-MIC
    priority: 5
    when:
      organism: { exact: Escherichia coli }
      agents: [Gentamicin]
      methods: [MIC]
    effect:
      decision: R
      rationale: aminoglycoside modifying enzyme suspected
"#,
    );
    let results = engine
        .classify(
            &RequestContext::new("conf"),
            vec![
                measurement_input("Gentamicin", Measurement::mic(1.0)),
                measurement_input("Gentamicin", Measurement::disc(20.0)),
            ],
        )
        .await;
    // The disc result alone would be S, but the expert-rule decision stands.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].decision, Decision::R);
    assert!(results[0].fired_rules.contains(&"RULE-GEN-MIC".to_string()));
    assert!(results[0].reason.contains("superseded by expert rule"));
}

#[tokio::test]
async fn different_antibiotics_never_conflict() {
    let results = engine()
        .classify(
            &RequestContext::new("conf"),
            vec![
                measurement_input("Gentamicin", Measurement::mic(1.0)),
                measurement_input("Ciprofloxacin", Measurement::mic(0.1)),
            ],
        )
        .await;
    assert_eq!(results.len(), 2);
}
