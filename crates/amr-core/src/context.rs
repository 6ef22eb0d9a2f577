use uuid::Uuid;

use crate::models::source::BreakpointSource;

/// Per-request context propagated explicitly through every component.
///
/// The transport collaborator supplies the correlation identifier; it flows
/// unchanged into every audit record and structured error for the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    /// Breakpoint source preference for this request, overriding the
    /// engine-configured default when present.
    pub source: Option<BreakpointSource>,
}

impl RequestContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            source: None,
        }
    }

    /// Context with a freshly generated correlation identifier, for callers
    /// that did not receive one from their transport.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn with_source(mut self, source: BreakpointSource) -> Self {
        self.source = Some(source);
        self
    }
}
