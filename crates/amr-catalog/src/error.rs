use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use amr_core::problem::{ProblemDetails, ProblemError};

/// A single validation finding. Loading collects every violation before
/// failing; callers never see only the first problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    /// A document could not be parsed at all.
    #[serde(rename_all = "camelCase")]
    Parse { path: String, reason: String },
    /// A document parsed but an entry fails the declarative schema.
    #[serde(rename_all = "camelCase")]
    Schema { path: String, reason: String },
    /// The merged catalog is internally inconsistent.
    #[serde(rename_all = "camelCase")]
    Semantic {
        #[serde(rename = "violationKind")]
        kind: String,
        detail: String,
    },
}

impl Violation {
    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Violation::Schema {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn semantic(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Violation::Semantic {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Parse { path, reason } => write!(f, "{path}: {reason}"),
            Violation::Schema { path, reason } => write!(f, "{path}: {reason}"),
            Violation::Semantic { kind, detail } => write!(f, "{kind}: {detail}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog path not found: {0}")]
    FileMissing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog validation failed with {count} violation(s)", count = .0.len())]
    Validation(Vec<Violation>),
}

impl CatalogError {
    /// RFC 7807 projection for the transport collaborator.
    pub fn to_problem(&self) -> ProblemDetails {
        match self {
            CatalogError::FileMissing(path) => ProblemDetails::new(
                "https://amr-engine.dev/problems/catalog-missing",
                "Catalog Not Found",
                404,
                format!("catalog path not found: {}", path.display()),
            ),
            CatalogError::Io { .. } => ProblemDetails::new(
                "https://amr-engine.dev/problems/catalog-io",
                "Catalog Read Failure",
                500,
                self.to_string(),
            ),
            CatalogError::Validation(violations) => {
                let errors = violations
                    .iter()
                    .map(|v| match v {
                        Violation::Parse { path, reason } | Violation::Schema { path, reason } => {
                            ProblemError {
                                path: path.clone(),
                                message: reason.clone(),
                            }
                        }
                        Violation::Semantic { kind, detail } => ProblemError {
                            path: kind.clone(),
                            message: detail.clone(),
                        },
                    })
                    .collect();
                ProblemDetails::new(
                    "https://amr-engine.dev/problems/catalog-validation",
                    "Catalog Validation Failed",
                    422,
                    self.to_string(),
                )
                .with_errors(errors)
            }
        }
    }
}
