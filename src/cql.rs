//! Tracing for wide-column (CQL) queries and iterators.
//!
//! [`TracedQuery`] wraps any [`CqlQuery`] and reports one span per read call
//! (`scan`, `map_scan`, `scan_cas`). [`TracedQuery::iter`] opens a span that
//! stays open for the iterator's lifetime and is finished by
//! [`TracedIter::close`].
//!
//! ```rust,ignore
//! use sql_driver_tracing::cql::TracedQuery;
//!
//! let mut query = TracedQuery::new(session.query("SELECT * FROM users"), config)
//!     .with_keyspace("accounts")
//!     .with_service_name("user-store")
//!     .with_context(cx);
//! let mut iter = query.iter();
//! while iter.scan(&mut row) { /* ... */ }
//! iter.close()?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use opentelemetry::global::BoxedSpan;
use opentelemetry::trace::Span;
use opentelemetry::KeyValue;

use crate::config::TracingConfig;
use crate::context::CallContext;
use crate::driver::Value;
use crate::dsn::Metadata;
use crate::error::Result;
use crate::keys::{
    COMPONENT_CQL, OP_CQL_ITER, OP_CQL_MAP_SCAN, OP_CQL_SCAN, OP_CQL_SCAN_CAS,
    TAG_CASSANDRA_CLUSTER, TAG_CASSANDRA_CONSISTENCY, TAG_CASSANDRA_KEYSPACE,
    TAG_CASSANDRA_PAGINATED, TAG_CASSANDRA_ROW_COUNT, TAG_OUT_HOST, TAG_OUT_PORT,
    TAG_RESOURCE_NAME, TAG_SERVICE_NAME, TAG_SPAN_TYPE,
};
use crate::trace::{record_error, CallRecord, TraceContext};

/// Consistency level of a CQL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    #[default]
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::LocalOne => "LOCAL_ONE",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column metadata reported by an iterator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub keyspace: String,
    pub table: String,
    pub name: String,
}

/// The node that served a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub host_id: String,
    pub port: u16,
    pub data_center: String,
}

/// A client query object.
pub trait CqlQuery: Send {
    fn statement(&self) -> &str;

    fn consistency(&self) -> Consistency;

    /// Resume from a paging state returned by an earlier page.
    fn set_page_state(&mut self, state: Vec<u8>);

    /// Read the first row into `dest`.
    fn scan(&mut self, dest: &mut [Value]) -> Result<()>;

    fn map_scan(&mut self, dest: &mut HashMap<String, Value>) -> Result<()>;

    /// Conditional (lightweight transaction) write; returns whether it applied.
    fn scan_cas(&mut self, dest: &mut [Value]) -> Result<bool>;

    fn iter(&mut self) -> Box<dyn CqlIter>;
}

/// A row iterator produced by [`CqlQuery::iter`].
pub trait CqlIter: Send {
    fn num_rows(&self) -> usize;

    fn columns(&self) -> &[ColumnInfo];

    fn host(&self) -> Option<&HostInfo>;

    /// Read the next row into `dest`; `false` once exhausted or failed.
    fn scan(&mut self, dest: &mut [Value]) -> bool;

    fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone)]
struct QueryParams {
    service_name: Option<String>,
    resource_name: String,
    keyspace: String,
    paginated: bool,
}

/// A traced wrapper around a [`CqlQuery`].
pub struct TracedQuery<Q> {
    inner: Q,
    trace: TraceContext,
    cx: CallContext,
    params: QueryParams,
}

impl<Q: CqlQuery> TracedQuery<Q> {
    pub fn new(query: Q, config: TracingConfig) -> Self {
        Self::with_metadata(query, config, Metadata::new())
    }

    /// Wrap with extra tags (cluster, target) attached to every span.
    pub fn with_metadata(query: Q, config: TracingConfig, metadata: Metadata) -> Self {
        let resource_name = match query.statement().trim() {
            "" => "_".to_string(),
            statement => statement.to_string(),
        };
        Self {
            inner: query,
            trace: TraceContext::with_component(metadata, config, COMPONENT_CQL),
            cx: CallContext::background(),
            params: QueryParams {
                service_name: None,
                resource_name,
                keyspace: String::new(),
                paginated: false,
            },
        }
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.params.keyspace = keyspace.into();
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.params.service_name = Some(name.into());
        self
    }

    /// Override the resource name, which defaults to the statement.
    pub fn with_resource_name(mut self, name: impl Into<String>) -> Self {
        self.params.resource_name = name.into();
        self
    }

    /// Parent subsequent spans on `cx`.
    pub fn with_context(mut self, cx: CallContext) -> Self {
        self.cx = cx;
        self
    }

    /// Set the paging state and mark later spans as paginated.
    pub fn page_state(&mut self, state: Vec<u8>) -> &mut Self {
        self.params.paginated = true;
        self.inner.set_page_state(state);
        self
    }

    pub fn is_paginated(&self) -> bool {
        self.params.paginated
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }

    pub fn into_inner(self) -> Q {
        self.inner
    }

    fn call(&self, operation: &'static str, start: SystemTime, keyspace: &str) -> CallRecord<'_> {
        let params = &self.params;
        let mut call = CallRecord::new(operation, start)
            .query(self.inner.statement())
            .attribute(KeyValue::new(TAG_SPAN_TYPE, "cassandra"))
            .attribute(KeyValue::new(TAG_RESOURCE_NAME, params.resource_name.clone()))
            .attribute(KeyValue::new(TAG_CASSANDRA_PAGINATED, params.paginated))
            .attribute(KeyValue::new(TAG_CASSANDRA_KEYSPACE, keyspace.to_string()));
        if let Some(service) = &params.service_name {
            call = call.attribute(KeyValue::new(TAG_SERVICE_NAME, service.clone()));
        }
        call
    }

    pub fn scan(&mut self, dest: &mut [Value]) -> Result<()> {
        let start = SystemTime::now();
        let result = self.inner.scan(dest);
        let call = self.call(OP_CQL_SCAN, start, &self.params.keyspace);
        self.trace.instrument(&self.cx, call, (&result).into());
        result
    }

    pub fn map_scan(&mut self, dest: &mut HashMap<String, Value>) -> Result<()> {
        let start = SystemTime::now();
        let result = self.inner.map_scan(dest);
        let call = self.call(OP_CQL_MAP_SCAN, start, &self.params.keyspace);
        self.trace.instrument(&self.cx, call, (&result).into());
        result
    }

    pub fn scan_cas(&mut self, dest: &mut [Value]) -> Result<bool> {
        let start = SystemTime::now();
        let result = self.inner.scan_cas(dest);
        let call = self.call(OP_CQL_SCAN_CAS, start, &self.params.keyspace);
        self.trace.instrument(&self.cx, call, (&result).into());
        result
    }

    /// Run the query for its side effects, through a traced iterator.
    pub fn exec(&mut self) -> Result<()> {
        self.iter().close()
    }

    /// Open a traced iterator. Its span ends when the iterator is closed.
    pub fn iter(&mut self) -> TracedIter {
        let start = SystemTime::now();
        let iter = self.inner.iter();

        // The served columns name the keyspace actually read.
        let keyspace = match iter.columns().first() {
            Some(column) => column.keyspace.as_str(),
            None => self.params.keyspace.as_str(),
        };
        let mut call = self
            .call(OP_CQL_ITER, start, keyspace)
            .attribute(KeyValue::new(TAG_CASSANDRA_ROW_COUNT, iter.num_rows() as i64))
            .attribute(KeyValue::new(
                TAG_CASSANDRA_CONSISTENCY,
                self.inner.consistency().to_string(),
            ));
        if let Some(host) = iter.host() {
            call = call
                .attribute(KeyValue::new(TAG_OUT_HOST, host.host_id.clone()))
                .attribute(KeyValue::new(TAG_OUT_PORT, i64::from(host.port)))
                .attribute(KeyValue::new(TAG_CASSANDRA_CLUSTER, host.data_center.clone()));
        }
        let span = self.trace.start_span(&self.cx, &call);

        TracedIter { inner: iter, span }
    }
}

/// Iterator carrying the span opened by [`TracedQuery::iter`].
///
/// Dropping without [`close`](TracedIter::close) still ends the span, but
/// without the close outcome.
pub struct TracedIter {
    inner: Box<dyn CqlIter>,
    span: BoxedSpan,
}

impl TracedIter {
    pub fn num_rows(&self) -> usize {
        self.inner.num_rows()
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        self.inner.columns()
    }

    pub fn host(&self) -> Option<&HostInfo> {
        self.inner.host()
    }

    pub fn scan(&mut self, dest: &mut [Value]) -> bool {
        self.inner.scan(dest)
    }

    /// Close the iterator and finish its span, recording the close error.
    pub fn close(mut self) -> Result<()> {
        let result = self.inner.close();
        if let Err(err) = &result {
            record_error(&mut self.span, err);
        }
        self.span.end();
        result
    }
}
