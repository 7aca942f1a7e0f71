//! Structured query logging.

use crate::context::CallContext;
use crate::keys::{FIELD_ERROR, FIELD_SLOW_QUERY};

/// Receives one entry per traced call.
///
/// `fields` is an ordered list of key/value pairs, for example
/// `[("query", "SELECT 1"), ("cost", "1.200ms")]`.
pub trait QueryLogger: Send + Sync {
    fn log(&self, cx: &CallContext, operation: &str, fields: &[(&'static str, String)]);
}

impl<F> QueryLogger for F
where
    F: Fn(&CallContext, &str, &[(&'static str, String)]) + Send + Sync,
{
    fn log(&self, cx: &CallContext, operation: &str, fields: &[(&'static str, String)]) {
        self(cx, operation, fields)
    }
}

/// Forwards entries to `tracing` events.
///
/// Entries carrying an error or the slow-query flag are emitted at WARN,
/// everything else at INFO.
#[derive(Debug, Clone, Copy)]
pub struct TracingLogger {
    target: &'static str,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self {
            target: "sql_driver_tracing",
        }
    }
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label events with a custom target in their message.
    pub fn with_target(mut self, target: &'static str) -> Self {
        self.target = target;
        self
    }
}

impl QueryLogger for TracingLogger {
    fn log(&self, _cx: &CallContext, operation: &str, fields: &[(&'static str, String)]) {
        let rendered = render_fields(fields);
        let noisy = fields
            .iter()
            .any(|(key, _)| *key == FIELD_ERROR || *key == FIELD_SLOW_QUERY);

        // `tracing` targets must be static at the callsite, so the configured
        // target travels as a field.
        if noisy {
            tracing::warn!(
                target: "sql_driver_tracing",
                logger = self.target,
                operation = operation,
                fields = %rendered,
                "traced call"
            );
        } else {
            tracing::info!(
                target: "sql_driver_tracing",
                logger = self.target,
                operation = operation,
                fields = %rendered,
                "traced call"
            );
        }
    }
}

fn render_fields(fields: &[(&'static str, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value:?}"))
        .collect::<Vec<_>>()
        .join(" ")
}
