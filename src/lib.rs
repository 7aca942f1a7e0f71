//! # sql-driver-tracing
//!
//! OpenTelemetry-compatible tracing proxies for pluggable SQL drivers, with a
//! parallel wrapper for wide-column (CQL) queries.
//!
//! This crate wraps a raw driver so that every call (connect, prepare, exec,
//! query, row fetch, close, commit, rollback, ping) transparently emits a span
//! and, optionally, a structured log entry. Call sites keep using the same
//! driver traits; the proxies implement them.
//!
//! ## Features
//!
//! - **Drop-in Proxies**: `ConnectionProxy`, `StatementProxy`, `RowsProxy`,
//!   `ResultProxy` and `TransactionProxy` implement the raw driver traits
//! - **Capability Probing**: Optional driver extensions (cancellation-aware
//!   exec/query/prepare/begin, ping) are used when present, with fallbacks
//!   when they are not
//! - **Precise Timing**: Spans start at the instant taken before the driver
//!   was called and are parented on the caller's context
//! - **Row Counts**: One span per cursor, tagged with the rows fetched
//! - **Safe Arguments**: Byte arguments only report their length; arguments
//!   can be omitted entirely
//! - **Connection Metadata**: MySQL and Postgres connection strings become
//!   `db.instance`, `db.user` and `db.type` tags
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sql_driver_tracing::prelude::*;
//!
//! let mut registry = DriverRegistry::new();
//! registry.register("mysql", Arc::new(MySqlDriver), TracingConfig::default())?;
//!
//! // Open through the traced alias; everything spawned from `conn` is traced
//! let mut conn = registry.open("mysql.traced", "user:password@/dbname")?;
//! let cx = CallContext::current();
//! let rows = conn.query_context(&cx, "SELECT * FROM city LIMIT 5", &[]);
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use sql_driver_tracing::{TracingConfig, TracingLogger};
//!
//! let config = TracingConfig::default()
//!     .with_logger(TracingLogger::default()) // Log every call (default: no logger)
//!     .with_omit_args()                     // Keep arguments out of telemetry
//!     .with_trace_rows();                   // Trace cursor exhaustion and close
//! ```
//!
//! ## Span Attributes
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `component` | `database/sql`, or `cql` for the wide-column wrapper |
//! | `db.statement` | Query text, when the call has one |
//! | `args` | Formatted arguments (unless omitted) |
//! | `db.instance`, `db.user`, `db.type` | Parsed from the connection string |
//! | `rows.len` | Rows fetched, on cursor spans |
//! | `error`, `error.message` | Set when the call failed |
//! | `slow_query` | Set when a slow-query threshold is configured and exceeded |

mod args;
mod config;
mod connection;
mod context;
pub mod cql;
mod driver;
mod driver_proxy;
pub mod dsn;
mod error;
pub mod keys;
mod logger;
mod registry;
mod result;
mod rows;
mod statement;
mod trace;
mod transaction;

pub use args::{format_arguments, Args, UNKNOWN_ARGS};
pub use config::{TracingConfig, DEFAULT_TRACER_NAME};
pub use connection::ConnectionProxy;
pub use context::CallContext;
pub use driver::{
    named_value_to_value, Conn, ConnBeginTx, ConnPrepareContext, Driver, ExecResult, Execer,
    ExecerContext, IsolationLevel, NamedValue, Pinger, Queryer, QueryerContext, Rows, Stmt,
    StmtExecContext, StmtQueryContext, Tx, TxOptions, Value,
};
pub use driver_proxy::TracedDriver;
pub use dsn::{DsnParser, Metadata};
pub use error::{BoxError, ContextError, Error, Outcome, Result};
pub use logger::{QueryLogger, TracingLogger};
pub use registry::{traced_driver_name, DriverRegistry};
pub use result::ResultProxy;
pub use rows::RowsProxy;
pub use statement::StatementProxy;
pub use trace::{CallRecord, CallStatus, TraceContext};
pub use transaction::TransactionProxy;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CallContext, Conn, ConnBeginTx, ConnPrepareContext, DriverRegistry, ExecResult,
        ExecerContext, NamedValue, Outcome, Pinger, QueryerContext, Rows, Stmt, StmtExecContext,
        StmtQueryContext, TracedDriver, TracingConfig, TracingLogger, Tx, TxOptions, Value,
    };
}
