//! amr-terminology
//!
//! Maps organism and antibiotic designators to canonical keys: coded lookup
//! for recognized code systems, display normalization with an offline alias
//! table, and an optional external terminology oracle with a catalog-scoped
//! response cache. Unresolvable designators are carried as `Unresolved`,
//! never dropped — gating decides what that means.

pub mod cache;
pub mod error;
pub mod normalize;
pub mod oracle;
pub mod tables;

pub use cache::NormalizationCache;
pub use error::OracleError;
pub use normalize::{Normalizer, Resolution, TermKind};
pub use oracle::{FhirTerminologyClient, OracleConcept, TerminologyOracle};
