use std::sync::Arc;
use std::time::Duration;

use amr_core::models::Designator;

use crate::cache::{CacheKey, NormalizationCache};
use crate::oracle::TerminologyOracle;
use crate::tables;

/// What a designator is supposed to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Organism,
    Antibiotic,
}

/// Outcome of normalization. Unresolved designators keep their raw text so
/// results and review reasons can cite what the lab actually sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(String),
    Unresolved { raw: String },
}

impl Resolution {
    pub fn key(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(key) => Some(key),
            Resolution::Unresolved { .. } => None,
        }
    }

    /// Canonical key when resolved, otherwise the raw input text.
    pub fn display_text(&self) -> &str {
        match self {
            Resolution::Resolved(key) => key,
            Resolution::Unresolved { raw } => raw,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Default timeout for one oracle call.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Designator-to-canonical-key resolver.
///
/// Resolution is deterministic given a catalog snapshot and the oracle cache
/// state: offline tables are consulted first and the oracle only on a miss,
/// with its responses cached for the lifetime of the catalog version.
pub struct Normalizer {
    oracle: Option<Arc<dyn TerminologyOracle>>,
    oracle_timeout: Duration,
    cache: NormalizationCache,
}

impl Normalizer {
    /// Offline-only normalizer.
    pub fn offline() -> Self {
        Self {
            oracle: None,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            cache: NormalizationCache::new(NormalizationCache::DEFAULT_CAPACITY),
        }
    }

    pub fn with_oracle(oracle: Arc<dyn TerminologyOracle>, timeout: Duration) -> Self {
        Self {
            oracle: Some(oracle),
            oracle_timeout: timeout,
            cache: NormalizationCache::new(NormalizationCache::DEFAULT_CAPACITY),
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = NormalizationCache::new(capacity);
        self
    }

    pub async fn resolve_organism(
        &self,
        designator: &Designator,
        catalog_version: &str,
    ) -> Resolution {
        self.resolve(TermKind::Organism, designator, catalog_version)
            .await
    }

    pub async fn resolve_antibiotic(
        &self,
        designator: &Designator,
        catalog_version: &str,
    ) -> Resolution {
        self.resolve(TermKind::Antibiotic, designator, catalog_version)
            .await
    }

    pub async fn resolve(
        &self,
        kind: TermKind,
        designator: &Designator,
        catalog_version: &str,
    ) -> Resolution {
        // 1. Coded lookup for recognized systems.
        if let (Some(system), Some(code)) = (&designator.system, &designator.code) {
            if let Some(recognized) = tables::recognize_system(system) {
                let hit = match kind {
                    TermKind::Organism => tables::organism_by_code(recognized, code),
                    TermKind::Antibiotic => tables::antibiotic_by_code(recognized, code),
                };
                if let Some(canonical) = hit {
                    return Resolution::Resolved(canonical.to_string());
                }
            }
        }

        // 2–3. Display normalization and alias table.
        if let Some(display) = &designator.display {
            let normalized = tables::normalize_display(display);
            let hit = match kind {
                TermKind::Organism => tables::organism_by_display(&normalized),
                TermKind::Antibiotic => tables::antibiotic_by_display(&normalized),
            };
            if let Some(canonical) = hit {
                return Resolution::Resolved(canonical.to_string());
            }
        }

        // 4. Oracle, with catalog-scoped response caching.
        if let Some(oracle) = &self.oracle {
            let cache_key: CacheKey = (
                designator.system.clone(),
                designator.code.clone(),
                designator.display.clone(),
            );
            if let Some(cached) = self.cache.get(catalog_version, &cache_key) {
                return cached;
            }

            let call = oracle.validate_code(
                designator.system.as_deref(),
                designator.code.as_deref(),
                designator.display.as_deref(),
            );
            match tokio::time::timeout(self.oracle_timeout, call).await {
                Ok(Ok(Some(concept))) if concept.valid => {
                    // Route the oracle's display through the offline tables so
                    // spelling variants converge on one canonical key.
                    let canonical = concept
                        .display
                        .as_deref()
                        .map(tables::normalize_display)
                        .and_then(|normalized| match kind {
                            TermKind::Organism => tables::organism_by_display(&normalized),
                            TermKind::Antibiotic => tables::antibiotic_by_display(&normalized),
                        })
                        .map(str::to_string)
                        .unwrap_or(concept.key);
                    let resolution = Resolution::Resolved(canonical);
                    self.cache
                        .insert(catalog_version, cache_key, resolution.clone());
                    return resolution;
                }
                Ok(Ok(_)) => {
                    // A definitive not-found is cacheable; transient failures
                    // below are not.
                    let resolution = Resolution::Unresolved {
                        raw: designator.raw(),
                    };
                    self.cache
                        .insert(catalog_version, cache_key, resolution.clone());
                    return resolution;
                }
                Ok(Err(error)) => {
                    tracing::warn!(%error, "terminology oracle unavailable, using offline result");
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = self.oracle_timeout.as_millis() as u64,
                        "terminology oracle call timed out"
                    );
                }
            }
        }

        Resolution::Unresolved {
            raw: designator.raw(),
        }
    }
}
