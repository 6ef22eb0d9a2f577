use thiserror::Error;

/// Failures talking to the external terminology oracle. Always non-fatal:
/// the normalizer degrades to its offline tables.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("terminology request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("terminology server returned status {0}")]
    Status(u16),

    #[error("malformed terminology response: {0}")]
    Malformed(String),
}
