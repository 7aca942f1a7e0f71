//! Traced driver: the factory for traced connections.

use std::fmt;
use std::sync::Arc;

use crate::config::TracingConfig;
use crate::connection::ConnectionProxy;
use crate::driver::{Conn, Driver};
use crate::dsn::{self, DsnParser, Metadata};
use crate::error::Result;
use crate::trace::TraceContext;

/// Wraps a raw driver so every connection it opens is traced.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use sql_driver_tracing::{TracedDriver, TracingConfig};
///
/// let driver = TracedDriver::new("mysql", Arc::new(MySqlDriver), TracingConfig::default());
/// let mut conn = driver.open_traced("user:password@tcp(db:3306)/shop")?;
/// ```
pub struct TracedDriver {
    inner: Arc<dyn Driver>,
    driver_name: String,
    config: TracingConfig,
    dsn_parser: Option<Arc<dyn DsnParser>>,
}

impl fmt::Debug for TracedDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedDriver")
            .field("driver_name", &self.driver_name)
            .field("config", &self.config)
            .field("dsn_parser", &self.dsn_parser.is_some())
            .finish_non_exhaustive()
    }
}

impl TracedDriver {
    /// Wrap `driver`, picking the built-in DSN parser for `driver_name`.
    pub fn new(
        driver_name: impl Into<String>,
        driver: Arc<dyn Driver>,
        config: TracingConfig,
    ) -> Self {
        let driver_name = driver_name.into();
        let dsn_parser = dsn::parser_for(&driver_name);
        Self {
            inner: driver,
            driver_name,
            config,
            dsn_parser,
        }
    }

    /// Use a custom parser for connection-string metadata.
    pub fn with_dsn_parser(mut self, parser: impl DsnParser + 'static) -> Self {
        self.dsn_parser = Some(Arc::new(parser));
        self
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// Open a connection through the wrapped driver.
    ///
    /// Metadata extraction is best-effort: an unknown dialect or a DSN the
    /// parser rejects leaves the tag set empty. Errors from the driver's own
    /// `open` are returned unchanged.
    pub fn open_traced(&self, dsn: &str) -> Result<ConnectionProxy> {
        let metadata = self.metadata(dsn);
        let conn = self.inner.open(dsn)?;
        let trace = TraceContext::new(metadata, self.config.clone());
        Ok(ConnectionProxy::new(conn, trace))
    }

    fn metadata(&self, dsn: &str) -> Metadata {
        let Some(parser) = &self.dsn_parser else {
            return Metadata::new();
        };
        parser.parse(dsn).unwrap_or_else(|err| {
            tracing::debug!(
                target: "sql_driver_tracing",
                driver = %self.driver_name,
                error = %err,
                "could not extract connection metadata"
            );
            Metadata::new()
        })
    }
}

impl Driver for TracedDriver {
    fn open(&self, dsn: &str) -> Result<Box<dyn Conn>> {
        Ok(Box::new(self.open_traced(dsn)?))
    }
}
