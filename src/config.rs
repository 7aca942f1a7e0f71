//! Configuration for tracing behavior.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::Tracer;

use crate::logger::{QueryLogger, TracingLogger};

/// Instrumentation scope used for the default global tracer.
pub const DEFAULT_TRACER_NAME: &str = "database/sql";

/// Configuration options shared by every proxy spawned from one traced driver.
///
/// # Example
///
/// ```rust
/// use sql_driver_tracing::{TracingConfig, TracingLogger};
/// use std::time::Duration;
///
/// let config = TracingConfig::default()
///     .with_logger(TracingLogger::default())
///     .with_omit_args()
///     .with_slow_query_threshold(Duration::from_millis(100));
/// assert!(config.omit_args);
/// ```
#[derive(Clone)]
pub struct TracingConfig {
    /// Receives one structured entry per traced call.
    /// Default: `None` (no logging)
    pub logger: Option<Arc<dyn QueryLogger>>,

    /// Whether to keep query arguments out of span tags and log fields.
    /// Default: `false`
    pub omit_args: bool,

    /// Whether cursor fetches and closes are traced.
    /// Those calls are brief and numerous, so they are off by default.
    pub trace_rows: bool,

    /// Calls slower than this are flagged with `slow_query`.
    /// Default: `None`
    pub slow_query_threshold: Option<Duration>,

    /// Tracer spans are started on.
    /// Default: the global tracer named [`DEFAULT_TRACER_NAME`]
    pub tracer: Arc<BoxedTracer>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            logger: None,
            omit_args: false,
            trace_rows: false,
            slow_query_threshold: None,
            tracer: Arc::new(global::tracer(DEFAULT_TRACER_NAME)),
        }
    }
}

impl fmt::Debug for TracingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingConfig")
            .field("logger", &self.logger.is_some())
            .field("omit_args", &self.omit_args)
            .field("trace_rows", &self.trace_rows)
            .field("slow_query_threshold", &self.slow_query_threshold)
            .finish_non_exhaustive()
    }
}

impl TracingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logger that receives one entry per traced call.
    pub fn with_logger(mut self, logger: impl QueryLogger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Keep query arguments out of logging and tracing.
    ///
    /// Query text is still recorded.
    pub fn with_omit_args(mut self) -> Self {
        self.omit_args = true;
        self
    }

    /// Include query arguments in logging and tracing.
    ///
    /// This is the default, but can be used to override [`with_omit_args`](Self::with_omit_args).
    pub fn with_include_args(mut self) -> Self {
        self.omit_args = false;
        self
    }

    /// Trace cursor fetch exhaustion and close, including the row count.
    pub fn with_trace_rows(mut self) -> Self {
        self.trace_rows = true;
        self
    }

    /// Leave cursor fetch and close untraced.
    ///
    /// This is the default, but can be used to override [`with_trace_rows`](Self::with_trace_rows).
    pub fn with_no_trace_rows(mut self) -> Self {
        self.trace_rows = false;
        self
    }

    /// Set the threshold for slow call flagging.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    /// Start spans on the given tracer instead of the global one.
    pub fn with_tracer<T>(mut self, tracer: T) -> Self
    where
        T: Tracer + Send + Sync + 'static,
        T::Span: Send + Sync + 'static,
    {
        self.tracer = Arc::new(BoxedTracer::new(Box::new(tracer)));
        self
    }

    /// Create a development-friendly configuration with full logging enabled.
    ///
    /// **Warning**: Do not use in production as it logs all arguments.
    pub fn development() -> Self {
        Self::default()
            .with_logger(TracingLogger::default())
            .with_include_args()
            .with_trace_rows()
            .with_slow_query_threshold(Duration::from_millis(100))
    }

    /// Create a production-safe configuration with minimal overhead.
    pub fn production() -> Self {
        Self::default()
            .with_omit_args()
            .with_no_trace_rows()
            .with_slow_query_threshold(Duration::from_secs(1))
    }
}
