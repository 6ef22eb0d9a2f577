use std::time::Duration;

use serde::{Deserialize, Serialize};

use amr_core::models::BreakpointSource;

/// Engine configuration, deserializable from a config document and
/// overridable through `AMR_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Breakpoint source preferred when a request names none.
    #[serde(default = "EngineConfig::default_default_source")]
    pub default_source: BreakpointSource,
    /// Base URL of the FHIR terminology server; absent means offline-only
    /// normalization.
    #[serde(default)]
    pub oracle_url: Option<String>,
    /// Per-call oracle timeout. On expiry the input proceeds unresolved.
    #[serde(default = "EngineConfig::default_oracle_timeout_ms")]
    pub oracle_timeout_ms: u64,
    /// Maximum entries in the normalization cache before LRU eviction.
    #[serde(default = "EngineConfig::default_cache_capacity")]
    pub normalization_cache_capacity: usize,
    /// Per-file size bound enforced by the catalog loader.
    #[serde(default = "EngineConfig::default_max_catalog_file_bytes")]
    pub max_catalog_file_bytes: u64,
}

impl EngineConfig {
    fn default_default_source() -> BreakpointSource {
        BreakpointSource::Eucast
    }

    fn default_oracle_timeout_ms() -> u64 {
        2_000
    }

    fn default_cache_capacity() -> usize {
        2_048
    }

    fn default_max_catalog_file_bytes() -> u64 {
        amr_catalog::load::DEFAULT_MAX_FILE_BYTES
    }

    /// Defaults overridden by `AMR_*` environment variables where set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var("AMR_DEFAULT_SOURCE") {
            if let Ok(source) = value.parse() {
                config.default_source = source;
            }
        }
        if let Ok(value) = std::env::var("AMR_ORACLE_URL") {
            if !value.is_empty() {
                config.oracle_url = Some(value);
            }
        }
        if let Ok(value) = std::env::var("AMR_ORACLE_TIMEOUT_MS") {
            if let Ok(timeout) = value.parse() {
                config.oracle_timeout_ms = timeout;
            }
        }
        if let Ok(value) = std::env::var("AMR_CACHE_CAPACITY") {
            if let Ok(capacity) = value.parse() {
                config.normalization_cache_capacity = capacity;
            }
        }
        if let Ok(value) = std::env::var("AMR_MAX_CATALOG_FILE_BYTES") {
            if let Ok(bytes) = value.parse() {
                config.max_catalog_file_bytes = bytes;
            }
        }
        config
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_source: Self::default_default_source(),
            oracle_url: None,
            oracle_timeout_ms: Self::default_oracle_timeout_ms(),
            normalization_cache_capacity: Self::default_cache_capacity(),
            max_catalog_file_bytes: Self::default_max_catalog_file_bytes(),
        }
    }
}
