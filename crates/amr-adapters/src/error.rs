use thiserror::Error;

use amr_core::problem::ProblemDetails;

/// Payload-level failures. These abort the request; per-input problems are
/// carried through as review decisions instead.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid FHIR payload: {0}")]
    Fhir(String),

    #[error("invalid HL7 v2 message: {0}")]
    Hl7(String),

    #[error("payload is not valid UTF-8")]
    Encoding,

    #[error("unable to detect payload format")]
    UnsupportedFormat,
}

impl AdapterError {
    /// RFC 7807 projection for the transport collaborator.
    pub fn to_problem(&self) -> ProblemDetails {
        let (type_uri, title, status) = match self {
            AdapterError::Json(_) => (
                "https://amr-engine.dev/problems/malformed-json",
                "Malformed JSON",
                400,
            ),
            AdapterError::Fhir(_) => (
                "https://amr-engine.dev/problems/invalid-fhir",
                "Invalid FHIR Payload",
                400,
            ),
            AdapterError::Hl7(_) => (
                "https://amr-engine.dev/problems/invalid-hl7v2",
                "Invalid HL7 v2 Message",
                400,
            ),
            AdapterError::Encoding => (
                "https://amr-engine.dev/problems/encoding",
                "Invalid Encoding",
                400,
            ),
            AdapterError::UnsupportedFormat => (
                "https://amr-engine.dev/problems/unsupported-format",
                "Unsupported Format",
                415,
            ),
        };
        ProblemDetails::new(type_uri, title, status, self.to_string())
    }
}
