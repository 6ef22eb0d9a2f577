use std::path::Path;
use std::sync::Arc;

use amr_adapters::group_inputs;
use amr_audit::{AuditSink, TracingAuditSink};
use amr_catalog::{CatalogStore, LoadOptions, RuleCatalog};
use amr_core::context::RequestContext;
use amr_core::models::{
    BreakpointSource, ClassificationInput, ClassificationResult, Decision, SpecimenRef,
};
use amr_terminology::{FhirTerminologyClient, Normalizer, Resolution};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::{assemble, breakpoint, conflict, expert, gating};

/// Identifier cited when an internal rule-evaluation fault degrades an input
/// to review.
pub(crate) const INTERNAL_ERROR_ID: &str = "AMR-RULE-EVAL";

/// A grouped input with its terminology resolutions attached.
#[derive(Debug, Clone)]
pub struct NormalizedInput {
    pub input: ClassificationInput,
    pub specimen: SpecimenRef,
    pub organism: Resolution,
    pub antibiotic: Resolution,
}

/// Where a decision came from; the conflict resolver treats expert-rule
/// decisions as final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecisionOrigin {
    Gate,
    Expert,
    Breakpoint,
}

/// Outcome of interpreting one input, before conflict resolution.
#[derive(Debug, Clone)]
pub(crate) struct Interpretation {
    pub decision: Decision,
    pub reason: String,
    pub fired_rules: Vec<String>,
    pub origin: DecisionOrigin,
}

impl Interpretation {
    pub(crate) fn review(reason: impl Into<String>, origin: DecisionOrigin) -> Self {
        Self {
            decision: Decision::RequiresReview,
            reason: reason.into(),
            fired_rules: Vec::new(),
            origin,
        }
    }
}

/// The classification engine: one catalog snapshot per request, results in
/// input order, review decisions instead of per-input errors.
pub struct ClassificationEngine {
    store: Arc<CatalogStore>,
    normalizer: Arc<Normalizer>,
    audit: Arc<dyn AuditSink>,
    config: EngineConfig,
}

impl ClassificationEngine {
    pub fn new(store: Arc<CatalogStore>, config: EngineConfig) -> Self {
        let normalizer = match &config.oracle_url {
            Some(url) => Normalizer::with_oracle(
                Arc::new(FhirTerminologyClient::new(url.clone())),
                config.oracle_timeout(),
            ),
            None => Normalizer::offline(),
        }
        .with_cache_capacity(config.normalization_cache_capacity);

        Self {
            store,
            normalizer: Arc::new(normalizer),
            audit: Arc::new(TracingAuditSink),
            config,
        }
    }

    /// Load the catalog at `path` with this config's file-size bound and
    /// build an engine around it.
    pub fn open(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self, EngineError> {
        let store = CatalogStore::open_with_options(
            path,
            LoadOptions {
                max_file_bytes: config.max_catalog_file_bytes,
            },
        )?;
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Arc<Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    /// Detect the payload format, run the matching adapter, and classify.
    pub async fn classify_payload(
        &self,
        ctx: &RequestContext,
        payload: &[u8],
        content_type: Option<&str>,
    ) -> Result<Vec<ClassificationResult>, EngineError> {
        let inputs = amr_adapters::parse_payload(payload, content_type)?;
        Ok(self.classify(ctx, inputs).await)
    }

    /// Classify a batch of inputs against the current catalog snapshot.
    ///
    /// The snapshot is taken once here; a concurrent reload does not affect
    /// this request. Results are emitted in grouped-input order, one per
    /// classifiable (specimen, organism, antibiotic) triple.
    pub async fn classify(
        &self,
        ctx: &RequestContext,
        inputs: Vec<ClassificationInput>,
    ) -> Vec<ClassificationResult> {
        let catalog = self.store.current();
        let source_order = self.source_order(ctx, &catalog);
        let grouped = group_inputs(inputs);

        tracing::info!(
            correlation_id = %ctx.correlation_id,
            catalog_version = catalog.version(),
            inputs = grouped.len(),
            "classifying request"
        );

        let mut interpreted: Vec<(NormalizedInput, Interpretation)> =
            Vec::with_capacity(grouped.len());
        for (position, input) in grouped.into_iter().enumerate() {
            let item = self.normalize(input, position, &catalog).await;
            let interpretation = self.interpret(&catalog, &item, &source_order);
            interpreted.push((item, interpretation));
        }

        let resolved = conflict::resolve(&catalog, interpreted);

        let results: Vec<ClassificationResult> = resolved
            .into_iter()
            .map(|(item, interpretation)| {
                assemble::result(&item, interpretation, catalog.version())
            })
            .collect();

        for result in &results {
            self.audit.record(assemble::audit_record(ctx, result));
        }
        results
    }

    async fn normalize(
        &self,
        input: ClassificationInput,
        position: usize,
        catalog: &RuleCatalog,
    ) -> NormalizedInput {
        let specimen = input
            .specimen
            .clone()
            .unwrap_or_else(|| SpecimenRef::synthetic(position));

        let organism = match &input.organism {
            Some(designator) => {
                self.normalizer
                    .resolve_organism(designator, catalog.version())
                    .await
            }
            None => Resolution::Unresolved { raw: String::new() },
        };
        let antibiotic = match &input.antibiotic {
            Some(designator) => {
                self.normalizer
                    .resolve_antibiotic(designator, catalog.version())
                    .await
            }
            None => Resolution::Unresolved { raw: String::new() },
        };

        NormalizedInput {
            input,
            specimen,
            organism,
            antibiotic,
        }
    }

    fn interpret(
        &self,
        catalog: &RuleCatalog,
        item: &NormalizedInput,
        source_order: &[BreakpointSource],
    ) -> Interpretation {
        if let Some(gated) = gating::gate(item) {
            return gated;
        }
        match expert::evaluate(catalog, item) {
            Ok(Some(interpretation)) => interpretation,
            Ok(None) => breakpoint::interpret(catalog, item, source_order),
            Err(error) => {
                tracing::error!(
                    %error,
                    organism = item.organism.display_text(),
                    antibiotic = item.antibiotic.display_text(),
                    "internal rule evaluation failure"
                );
                Interpretation::review(
                    format!("internal rule evaluation error {INTERNAL_ERROR_ID}"),
                    DecisionOrigin::Gate,
                )
            }
        }
    }

    /// The request's source preference followed by the catalog's declared
    /// fallback order, deduplicated.
    fn source_order(&self, ctx: &RequestContext, catalog: &RuleCatalog) -> Vec<BreakpointSource> {
        let preferred = ctx.source.unwrap_or(self.config.default_source);
        let mut order = vec![preferred];
        for source in &catalog.policy().source_fallback {
            if !order.contains(source) {
                order.push(*source);
            }
        }
        order
    }
}
