//! Decision assembly: the result echoes its originating input, lists fired
//! rule ids in evaluation order, and stamps the catalog version. One audit
//! record per result is built here and handed to the sink by the engine.

use amr_audit::ClassificationAuditRecord;
use amr_core::context::RequestContext;
use amr_core::models::ClassificationResult;

use crate::engine::{Interpretation, NormalizedInput};

pub(crate) fn result(
    item: &NormalizedInput,
    interpretation: Interpretation,
    catalog_version: &str,
) -> ClassificationResult {
    ClassificationResult {
        specimen_id: item.specimen.to_string(),
        organism: item.organism.display_text().to_string(),
        antibiotic: item.antibiotic.display_text().to_string(),
        method: item.input.effective_method(),
        input: item.input.clone(),
        decision: interpretation.decision,
        reason: interpretation.reason,
        fired_rules: interpretation.fired_rules,
        rule_version: catalog_version.to_string(),
    }
}

pub(crate) fn audit_record(
    ctx: &RequestContext,
    result: &ClassificationResult,
) -> ClassificationAuditRecord {
    ClassificationAuditRecord {
        correlation_id: ctx.correlation_id.clone(),
        specimen: result.specimen_id.clone(),
        organism: result.organism.clone(),
        antibiotic: result.antibiotic.clone(),
        method: result.method,
        decision: result.decision,
        fired_rules: result.fired_rules.clone(),
        catalog_version: result.rule_version.clone(),
        timestamp: jiff::Timestamp::now(),
    }
}
