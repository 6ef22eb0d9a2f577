use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use amr_core::models::Designator;
use amr_terminology::{
    FhirTerminologyClient, NormalizationCache, Normalizer, OracleConcept, OracleError, Resolution,
    TerminologyOracle,
};

#[tokio::test]
async fn snomed_code_resolves_offline() {
    let normalizer = Normalizer::offline();
    let designator = Designator::coded("http://snomed.info/sct", "112283007");
    let resolution = normalizer.resolve_organism(&designator, "v1").await;
    assert_eq!(resolution.key(), Some("Escherichia coli"));
}

#[tokio::test]
async fn display_aliases_and_qualifiers_normalize() {
    let normalizer = Normalizer::offline();

    for display in ["E. coli", "e.coli", "ECOLI", "Escherichia coli sp."] {
        let resolution = normalizer
            .resolve_organism(&Designator::text(display), "v1")
            .await;
        assert_eq!(resolution.key(), Some("Escherichia coli"), "{display}");
    }

    let resolution = normalizer
        .resolve_antibiotic(&Designator::text("  amoxicillin/clavulanic ACID "), "v1")
        .await;
    assert_eq!(resolution.key(), Some("Amoxicillin-clavulanic acid"));

    let resolution = normalizer
        .resolve_antibiotic(&Designator::text("CRO"), "v1")
        .await;
    assert_eq!(resolution.key(), Some("Ceftriaxone"));
}

#[tokio::test]
async fn atc_code_resolves_without_display() {
    let normalizer = Normalizer::offline();
    let designator = Designator::coded("http://www.whocc.no/atc", "J01CA04");
    let resolution = normalizer.resolve_antibiotic(&designator, "v1").await;
    assert_eq!(resolution.key(), Some("Amoxicillin"));
}

#[tokio::test]
async fn unknown_designators_stay_unresolved_with_raw_text() {
    let normalizer = Normalizer::offline();
    let resolution = normalizer
        .resolve_organism(&Designator::text("Xyzbacter novus"), "v1")
        .await;
    assert!(!resolution.is_resolved());
    assert_eq!(resolution.display_text(), "Xyzbacter novus");
}

struct CountingOracle {
    calls: AtomicUsize,
    concept: Option<OracleConcept>,
}

#[async_trait]
impl TerminologyOracle for CountingOracle {
    async fn validate_code(
        &self,
        _system: Option<&str>,
        _code: Option<&str>,
        _display: Option<&str>,
    ) -> Result<Option<OracleConcept>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.concept.clone())
    }
}

#[tokio::test]
async fn oracle_hits_are_cached_per_catalog_version() {
    let oracle = Arc::new(CountingOracle {
        calls: AtomicUsize::new(0),
        concept: Some(OracleConcept {
            key: "Morganella morganii".to_string(),
            display: Some("Morganella morganii".to_string()),
            valid: true,
        }),
    });
    let normalizer = Normalizer::with_oracle(oracle.clone(), Duration::from_secs(1));
    let designator = Designator::text("Morganella morganii subsp. morganii X");

    let first = normalizer.resolve_organism(&designator, "v1").await;
    assert_eq!(first.key(), Some("Morganella morganii"));
    let second = normalizer.resolve_organism(&designator, "v1").await;
    assert_eq!(second.key(), Some("Morganella morganii"));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);

    // A new catalog version empties the cache.
    normalizer.resolve_organism(&designator, "v2").await;
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
}

struct SlowOracle;

#[async_trait]
impl TerminologyOracle for SlowOracle {
    async fn validate_code(
        &self,
        _system: Option<&str>,
        _code: Option<&str>,
        _display: Option<&str>,
    ) -> Result<Option<OracleConcept>, OracleError> {
        tokio::time::sleep(Duration::from_millis(250)).await;
        Ok(None)
    }
}

#[tokio::test]
async fn oracle_timeout_degrades_to_unresolved() {
    let normalizer = Normalizer::with_oracle(Arc::new(SlowOracle), Duration::from_millis(10));
    let resolution = normalizer
        .resolve_organism(&Designator::text("Unknownia obscura"), "v1")
        .await;
    assert!(!resolution.is_resolved());
}

#[test]
fn cache_evicts_least_recently_used() {
    let cache = NormalizationCache::new(2);
    let key = |name: &str| (None, None, Some(name.to_string()));
    let resolved = |name: &str| Resolution::Resolved(name.to_string());

    cache.insert("v1", key("a"), resolved("A"));
    cache.insert("v1", key("b"), resolved("B"));
    // Touch "a" so "b" becomes the eviction candidate.
    assert!(cache.get("v1", &key("a")).is_some());
    cache.insert("v1", key("c"), resolved("C"));

    assert!(cache.get("v1", &key("a")).is_some());
    assert!(cache.get("v1", &key("b")).is_none());
    assert!(cache.get("v1", &key("c")).is_some());
}

#[test]
fn fhir_client_constructs_with_any_base_url() {
    let _client = FhirTerminologyClient::new("https://tx.example.org/r4/");
}
