use serde_json::Value;

/// Event name published when a payload carries fields no schema entry read.
pub const UNPARSED_PROPERTIES: &str = "unparsed-properties";

/// Output key holding the unparsed-property tree.
pub const UNPARSED_KEY: &str = "$unparsed";

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub event: &'static str,
    pub unparsed: Value,
    /// The payload as it was handed to the parser.
    pub raw: Value,
}

/// Receiver for parse diagnostics. Publishing is fire-and-forget.
pub trait DiagnosticSink: Send + Sync {
    fn publish(&self, diagnostic: &Diagnostic);
}

/// Logs diagnostics as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn publish(&self, diagnostic: &Diagnostic) {
        tracing::warn!(
            event = diagnostic.event,
            unparsed = %diagnostic.unparsed,
            "payload contains properties not covered by the schema"
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn publish(&self, _diagnostic: &Diagnostic) {}
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn publish(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}
