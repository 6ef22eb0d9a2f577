//! amr-audit
//!
//! Structured audit records for classification decisions. The engine builds
//! one record per result and hands it to an `AuditSink`; delivery, buffering,
//! and failure handling belong to the sink implementation. Emission is
//! fire-and-forget relative to the response path.

pub mod events;

pub use events::{AuditSink, ClassificationAuditRecord, TracingAuditSink};
