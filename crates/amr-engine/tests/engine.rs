//! Engine-level behavior: snapshot stability across reloads, deterministic
//! output, and audit emission.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use amr_audit::{AuditSink, ClassificationAuditRecord};
use amr_catalog::CatalogStore;
use amr_core::context::RequestContext;
use amr_core::models::{ClassificationInput, Decision, Designator, Measurement, MethodKind};
use amr_engine::{ClassificationEngine, EngineConfig};

fn write_catalog(dir: &Path, name: &str, version: &str, susceptible: f64) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
version: {version}
breakpoints:
  - organism: {{ exact: Escherichia coli }}
    antibiotic: Amoxicillin
    method: MIC
    susceptible: {susceptible}
    resistant: {susceptible}
    comparator: LE_S_GT_R
    unit: MG_PER_L
"#
    )
    .unwrap();
    path
}

fn amoxicillin_input(value: f64) -> ClassificationInput {
    ClassificationInput {
        specimen: Some(amr_core::models::SpecimenRef::new("ENG-1")),
        organism: Some(Designator::text("Escherichia coli")),
        antibiotic: Some(Designator::text("Amoxicillin")),
        method: Some(MethodKind::Mic),
        value: Measurement::mic(value),
        phenotypes: Default::default(),
        auxiliary: Default::default(),
    }
}

#[tokio::test]
async fn reload_changes_the_version_for_new_requests() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = write_catalog(dir.path(), "v1.yaml", "v1", 8.0);
    let v2 = write_catalog(dir.path(), "v2.yaml", "v2", 2.0);

    let store = Arc::new(CatalogStore::open(&v1).unwrap());
    let engine = ClassificationEngine::new(store.clone(), EngineConfig::default());

    let before = engine
        .classify(&RequestContext::new("eng"), vec![amoxicillin_input(4.0)])
        .await;
    assert_eq!(before[0].rule_version, "v1");
    assert_eq!(before[0].decision, Decision::S);

    store.reload(&v2).unwrap();

    // The tighter v2 threshold flips the same measurement to resistant.
    let after = engine
        .classify(&RequestContext::new("eng"), vec![amoxicillin_input(4.0)])
        .await;
    assert_eq!(after[0].rule_version, "v2");
    assert_eq!(after[0].decision, Decision::R);
}

#[tokio::test]
async fn identical_requests_serialize_byte_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_catalog(dir.path(), "catalog.yaml", "v1", 8.0);
    let engine =
        ClassificationEngine::new(Arc::new(CatalogStore::open(&path).unwrap()), EngineConfig::default());

    let inputs = vec![amoxicillin_input(4.0), amoxicillin_input(16.0)];
    let first = engine
        .classify(&RequestContext::new("eng"), vec![amoxicillin_input(4.0)])
        .await;
    let second = engine
        .classify(&RequestContext::new("eng"), vec![amoxicillin_input(4.0)])
        .await;
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let batch_first = engine.classify(&RequestContext::new("eng"), inputs.clone()).await;
    let batch_second = engine.classify(&RequestContext::new("eng"), inputs).await;
    assert_eq!(
        serde_json::to_string(&batch_first).unwrap(),
        serde_json::to_string(&batch_second).unwrap()
    );
}

#[derive(Default)]
struct CapturingSink {
    records: Mutex<Vec<ClassificationAuditRecord>>,
}

impl AuditSink for CapturingSink {
    fn record(&self, record: ClassificationAuditRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }
}

#[tokio::test]
async fn one_audit_record_per_result_with_the_correlation_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_catalog(dir.path(), "catalog.yaml", "v1", 8.0);
    let sink = Arc::new(CapturingSink::default());
    let engine =
        ClassificationEngine::new(Arc::new(CatalogStore::open(&path).unwrap()), EngineConfig::default())
            .with_audit_sink(sink.clone());

    let ctx = RequestContext::new("corr-42");
    let mut second = amoxicillin_input(16.0);
    second.specimen = Some(amr_core::models::SpecimenRef::new("ENG-2"));
    let results = engine
        .classify(&ctx, vec![amoxicillin_input(4.0), second])
        .await;
    assert_eq!(results.len(), 2);

    let records = sink
        .records
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    assert_eq!(records.len(), 2);
    for (record, result) in records.iter().zip(&results) {
        assert_eq!(record.correlation_id, "corr-42");
        assert_eq!(record.decision, result.decision);
        assert_eq!(record.catalog_version, "v1");
    }
}

#[tokio::test]
async fn results_follow_grouped_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_catalog(dir.path(), "catalog.yaml", "v1", 8.0);
    let engine =
        ClassificationEngine::new(Arc::new(CatalogStore::open(&path).unwrap()), EngineConfig::default());

    let mut second = amoxicillin_input(4.0);
    second.specimen = Some(amr_core::models::SpecimenRef::new("ENG-2"));
    let results = engine
        .classify(
            &RequestContext::new("eng"),
            vec![amoxicillin_input(16.0), second],
        )
        .await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].specimen_id, "ENG-1");
    assert_eq!(results[1].specimen_id, "ENG-2");
}
