use serde::{Deserialize, Serialize};

use crate::models::decision::Decision;
use crate::models::input::ClassificationInput;
use crate::models::measurement::MethodKind;

/// One classification decision with its traceable rationale.
///
/// Field order is the serialization order; collaborators that serialize this
/// type rely on it being stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub specimen_id: String,
    pub organism: String,
    pub antibiotic: String,
    pub method: MethodKind,
    /// Echo of the originating input, unmodified.
    pub input: ClassificationInput,
    pub decision: Decision,
    pub reason: String,
    /// Identifiers of the rules that fired, in evaluation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fired_rules: Vec<String>,
    /// Version label of the catalog snapshot that produced this decision.
    pub rule_version: String,
}
