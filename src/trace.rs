//! Per-connection trace context and the span/log emission primitive.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use opentelemetry::global::BoxedSpan;
use opentelemetry::trace::{Span, SpanKind, Status, Tracer};
use opentelemetry::KeyValue;

use crate::args::{format_arguments, Args};
use crate::config::TracingConfig;
use crate::context::CallContext;
use crate::driver::{NamedValue, Value};
use crate::dsn::Metadata;
use crate::error::{Error, Outcome, Result};
use crate::keys::{
    is_row_op, is_tx_end_op, COMPONENT_SQL, FIELD_ARGS, FIELD_COST, FIELD_ERROR, FIELD_QUERY,
    FIELD_SLOW_QUERY, FIELD_TX_COST, TAG_ARGS, TAG_COMPONENT, TAG_DB_STATEMENT, TAG_ERROR,
    TAG_ERROR_MESSAGE, TAG_ROWS_LEN, TAG_SLOW_QUERY, UNLOGGED_OPS,
};

/// How an intercepted call ended, as seen by [`TraceContext::instrument`].
#[derive(Debug, Clone, Copy)]
pub enum CallStatus<'a> {
    /// The resource lacks the capability. Nothing is emitted.
    Unsupported,
    Ok,
    Failed(&'a Error),
}

impl<'a, T> From<&'a Outcome<T>> for CallStatus<'a> {
    fn from(outcome: &'a Outcome<T>) -> Self {
        match outcome {
            Outcome::Unsupported => CallStatus::Unsupported,
            Outcome::Success(_) => CallStatus::Ok,
            Outcome::Failure(err) => CallStatus::Failed(err),
        }
    }
}

impl<'a, T> From<&'a Result<T>> for CallStatus<'a> {
    fn from(result: &'a Result<T>) -> Self {
        match result {
            Ok(_) => CallStatus::Ok,
            Err(err) => CallStatus::Failed(err),
        }
    }
}

/// Everything known about one intercepted call.
#[derive(Debug, Clone)]
pub struct CallRecord<'a> {
    pub operation: &'static str,
    pub query: &'a str,
    pub args: Option<Args<'a>>,
    /// Taken before the driver was invoked; the span starts here.
    pub start: SystemTime,
    /// Rows fetched so far, for cursor operations.
    pub rows: Option<u64>,
    /// When the enclosing transaction began, for commit and rollback.
    pub tx_begin: Option<SystemTime>,
    /// Extra call-specific span attributes.
    pub attributes: Vec<KeyValue>,
}

impl<'a> CallRecord<'a> {
    pub fn new(operation: &'static str, start: SystemTime) -> Self {
        Self {
            operation,
            query: "",
            args: None,
            start,
            rows: None,
            tx_begin: None,
            attributes: Vec::new(),
        }
    }

    pub fn query(mut self, query: &'a str) -> Self {
        self.query = query;
        self
    }

    pub fn args(mut self, args: &'a [Value]) -> Self {
        self.args = Some(Args::Positional(args));
        self
    }

    pub fn named_args(mut self, args: &'a [NamedValue]) -> Self {
        self.args = Some(Args::Named(args));
        self
    }

    pub fn rows(mut self, rows: u64) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn tx_begin(mut self, begin: Option<SystemTime>) -> Self {
        self.tx_begin = begin;
        self
    }

    pub fn attribute(mut self, attribute: KeyValue) -> Self {
        self.attributes.push(attribute);
        self
    }
}

struct Inner {
    metadata: Metadata,
    config: TracingConfig,
    component: &'static str,
}

/// Connection-scoped tracing state.
///
/// Holds the metadata tags derived when the connection was opened and the
/// driver's configuration. Both are fixed at construction; clones share them.
#[derive(Clone)]
pub struct TraceContext {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceContext")
            .field("metadata", &self.inner.metadata)
            .field("config", &self.inner.config)
            .field("component", &self.inner.component)
            .finish()
    }
}

impl TraceContext {
    pub fn new(metadata: Metadata, config: TracingConfig) -> Self {
        Self::with_component(metadata, config, COMPONENT_SQL)
    }

    pub fn with_component(
        metadata: Metadata,
        config: TracingConfig,
        component: &'static str,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                metadata,
                config,
                component,
            }),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.inner.metadata
    }

    pub fn config(&self) -> &TracingConfig {
        &self.inner.config
    }

    pub fn trace_rows(&self) -> bool {
        self.inner.config.trace_rows
    }

    /// Emit the span and log entry for one finished call.
    ///
    /// Does nothing when `status` is [`CallStatus::Unsupported`]. Never fails:
    /// telemetry problems are swallowed so the traced call's own outcome is
    /// what the caller sees.
    pub fn instrument(&self, cx: &CallContext, call: CallRecord<'_>, status: CallStatus<'_>) {
        if matches!(status, CallStatus::Unsupported) {
            return;
        }

        let args = self.render_args(&call);
        let elapsed = elapsed_since(call.start);
        let slow = self
            .inner
            .config
            .slow_query_threshold
            .is_some_and(|threshold| elapsed > threshold);

        let mut span = self.start_span(cx, &call);
        if let Some(args) = &args {
            span.set_attribute(KeyValue::new(TAG_ARGS, args.clone()));
        }
        if let CallStatus::Failed(err) = status {
            record_error(&mut span, err);
        }
        if is_row_op(call.operation) {
            let rows = call.rows.unwrap_or_default();
            span.set_attribute(KeyValue::new(TAG_ROWS_LEN, rows as i64));
        }
        if slow {
            span.set_attribute(KeyValue::new(TAG_SLOW_QUERY, true));
        }
        span.end();

        self.log(cx, &call, args.as_deref(), status, slow);
    }

    /// Start a span for `call`, tagged with the component, statement, call
    /// attributes and connection metadata. The caller must end it.
    pub(crate) fn start_span(&self, cx: &CallContext, call: &CallRecord<'_>) -> BoxedSpan {
        let tracer = &*self.inner.config.tracer;

        let capacity = 2 + call.attributes.len() + self.inner.metadata.len();
        let mut attributes = Vec::with_capacity(capacity);
        attributes.push(KeyValue::new(TAG_COMPONENT, self.inner.component));
        if !call.query.is_empty() {
            attributes.push(KeyValue::new(TAG_DB_STATEMENT, call.query.to_string()));
        }
        attributes.extend(call.attributes.iter().cloned());
        attributes.extend(
            self.inner
                .metadata
                .iter()
                .map(|(key, value)| KeyValue::new(key.clone(), value.clone())),
        );

        tracer
            .span_builder(call.operation)
            .with_kind(SpanKind::Client)
            .with_start_time(call.start)
            .with_attributes(attributes)
            .start_with_context(tracer, cx.parent())
    }

    fn render_args(&self, call: &CallRecord<'_>) -> Option<String> {
        if self.inner.config.omit_args {
            return None;
        }
        call.args
            .filter(|args| !args.is_empty())
            .map(|args| format_arguments(&args))
    }

    fn log(
        &self,
        cx: &CallContext,
        call: &CallRecord<'_>,
        args: Option<&str>,
        status: CallStatus<'_>,
        slow: bool,
    ) {
        let Some(logger) = &self.inner.config.logger else {
            return;
        };
        if UNLOGGED_OPS.contains(&call.operation) {
            return;
        }

        let mut fields: Vec<(&'static str, String)> = Vec::with_capacity(6);
        if !call.query.is_empty() {
            fields.push((FIELD_QUERY, call.query.to_string()));
        }
        if let Some(args) = args {
            fields.push((FIELD_ARGS, args.to_string()));
        }
        if let CallStatus::Failed(err) = status {
            fields.push((FIELD_ERROR, err.to_string()));
        }
        if is_tx_end_op(call.operation) {
            if let Some(begin) = call.tx_begin {
                fields.push((FIELD_TX_COST, format_duration(elapsed_since(begin))));
            }
        }
        fields.push((FIELD_COST, format_duration(elapsed_since(call.start))));
        if slow {
            fields.push((FIELD_SLOW_QUERY, "true".to_string()));
        }

        let operation = call.operation;
        let logged = panic::catch_unwind(AssertUnwindSafe(|| {
            logger.log(cx, operation, &fields);
        }));
        if logged.is_err() {
            tracing::warn!(
                target: "sql_driver_tracing",
                operation,
                "query logger panicked; entry dropped"
            );
        }
    }
}

pub(crate) fn record_error(span: &mut BoxedSpan, err: &Error) {
    let message = err.to_string();
    span.set_attribute(KeyValue::new(TAG_ERROR, true));
    span.set_attribute(KeyValue::new(TAG_ERROR_MESSAGE, message.clone()));
    span.record_error(err);
    span.set_status(Status::error(message));
}

/// Time since `start`, zero if the clock went backwards.
pub(crate) fn elapsed_since(start: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(start)
        .unwrap_or_default()
}

/// Milliseconds with microsecond precision, e.g. `60.364ms`.
fn format_duration(duration: Duration) -> String {
    format!("{:.3}ms", duration.as_secs_f64() * 1_000.0)
}
