use thiserror::Error;

use amr_adapters::AdapterError;
use amr_catalog::CatalogError;
use amr_core::problem::ProblemDetails;

/// Request-aborting failures. Everything per-input degrades to a review
/// decision instead of surfacing here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl EngineError {
    pub fn to_problem(&self) -> ProblemDetails {
        match self {
            EngineError::Adapter(e) => e.to_problem(),
            EngineError::Catalog(e) => e.to_problem(),
        }
    }
}
