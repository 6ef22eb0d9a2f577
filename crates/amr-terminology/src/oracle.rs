use async_trait::async_trait;
use serde::Deserialize;

use crate::error::OracleError;

/// A concept as the oracle reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleConcept {
    /// Canonical key for the concept.
    pub key: String,
    pub display: Option<String>,
    pub valid: bool,
}

/// External terminology service consulted when the offline tables miss.
///
/// Implementations own their transport; the normalizer owns the per-call
/// timeout and the catalog-scoped response cache.
#[async_trait]
pub trait TerminologyOracle: Send + Sync {
    /// Validate a (system, code, display) triple. `Ok(None)` means the
    /// oracle does not know the concept.
    async fn validate_code(
        &self,
        system: Option<&str>,
        code: Option<&str>,
        display: Option<&str>,
    ) -> Result<Option<OracleConcept>, OracleError>;
}

#[derive(Debug, Deserialize)]
struct Parameters {
    #[serde(default)]
    parameter: Vec<Parameter>,
}

#[derive(Debug, Deserialize)]
struct Parameter {
    name: String,
    #[serde(rename = "valueBoolean")]
    value_boolean: Option<bool>,
    #[serde(rename = "valueString")]
    value_string: Option<String>,
}

/// FHIR terminology server client using `CodeSystem/$validate-code`.
pub struct FhirTerminologyClient {
    base_url: String,
    client: reqwest::Client,
}

impl FhirTerminologyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TerminologyOracle for FhirTerminologyClient {
    async fn validate_code(
        &self,
        system: Option<&str>,
        code: Option<&str>,
        display: Option<&str>,
    ) -> Result<Option<OracleConcept>, OracleError> {
        let url = format!(
            "{}/CodeSystem/$validate-code",
            self.base_url.trim_end_matches('/')
        );

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(system) = system {
            query.push(("url", system.to_string()));
        }
        if let Some(code) = code {
            query.push(("code", code.to_string()));
        }
        if let Some(display) = display {
            query.push(("display", display.to_string()));
        }

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(OracleError::Status(status.as_u16()));
        }

        let parameters: Parameters = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        let mut valid = false;
        let mut resolved_display: Option<String> = None;
        for parameter in &parameters.parameter {
            match parameter.name.as_str() {
                "result" => valid = parameter.value_boolean.unwrap_or(false),
                "display" => resolved_display = parameter.value_string.clone(),
                _ => {}
            }
        }

        if !valid {
            tracing::debug!(?system, ?code, "terminology server rejected code");
            return Ok(None);
        }

        let key = resolved_display
            .clone()
            .or_else(|| display.map(str::to_string))
            .or_else(|| code.map(str::to_string))
            .ok_or_else(|| OracleError::Malformed("no display or code in response".to_string()))?;

        Ok(Some(OracleConcept {
            key,
            display: resolved_display,
            valid,
        }))
    }
}
