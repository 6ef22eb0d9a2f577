use serde::Serialize;

use amr_core::models::{Decision, MethodKind};

/// A structured audit record for one classification decision.
///
/// Identifiers arrive pseudonymized when the deployment pseudonymizes
/// upstream; this crate treats them as opaque and passes them through.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationAuditRecord {
    pub correlation_id: String,
    pub specimen: String,
    pub organism: String,
    pub antibiotic: String,
    pub method: MethodKind,
    pub decision: Decision,
    pub fired_rules: Vec<String>,
    pub catalog_version: String,
    pub timestamp: jiff::Timestamp,
}

impl ClassificationAuditRecord {
    /// Emit this record as a structured tracing event.
    pub fn emit(&self) {
        tracing::info!(
            audit.correlation_id = %self.correlation_id,
            audit.specimen = %self.specimen,
            audit.organism = %self.organism,
            audit.antibiotic = %self.antibiotic,
            audit.method = %self.method,
            audit.decision = %self.decision,
            audit.fired_rules = %self.fired_rules.join(","),
            audit.catalog_version = %self.catalog_version,
            audit.timestamp = %self.timestamp,
            "classification audit"
        );
    }
}

/// Delivery seam for audit records. Implementations must not block the
/// classification path.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: ClassificationAuditRecord);
}

/// Default sink: structured `tracing` events, which the host's subscriber
/// routes wherever audit events are collected.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: ClassificationAuditRecord) {
        record.emit();
    }
}
