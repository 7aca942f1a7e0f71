//! Shared fixtures: a capability-configurable mock driver, a recording query
//! logger and an in-memory span exporter.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use opentelemetry::trace::{TraceError, TraceResult, TracerProvider as _};
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::trace::TracerProvider;

use sql_driver_tracing::{
    CallContext, Conn, ConnBeginTx, ConnPrepareContext, ConnectionProxy, Driver, Error,
    ExecResult, Execer, ExecerContext, NamedValue, Outcome, Pinger, QueryLogger, Queryer,
    QueryerContext, Result, Rows, Stmt, StmtExecContext, StmtQueryContext, TracedDriver,
    TracingConfig, Tx, TxOptions, Value,
};

/// Keeps every exported span for assertions.
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemorySpanExporter {
    pub fn get_finished_spans(&self) -> TraceResult<Vec<SpanData>> {
        self.spans
            .lock()
            .map(|guard| guard.iter().cloned().collect())
            .map_err(TraceError::from)
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&mut self, mut batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = self
            .spans
            .lock()
            .map(|mut guard| guard.append(&mut batch))
            .map_err(TraceError::from);

        Box::pin(async move { result })
    }
}

/// Collects finished spans and log entries for one test.
pub struct Harness {
    pub exporter: InMemorySpanExporter,
    provider: TracerProvider,
    pub logger: RecordingLogger,
}

impl Harness {
    pub fn new() -> Self {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        Self {
            exporter,
            provider,
            logger: RecordingLogger::default(),
        }
    }

    /// Config wired to this harness' tracer and logger.
    pub fn config(&self) -> TracingConfig {
        TracingConfig::default()
            .with_tracer(self.provider.tracer("sql-driver-tracing-tests"))
            .with_logger(self.logger.clone())
    }

    pub fn tracer(&self) -> opentelemetry_sdk::trace::Tracer {
        self.provider.tracer("sql-driver-tracing-tests")
    }

    pub fn open(&self, driver: MockDriver, config: TracingConfig) -> ConnectionProxy {
        TracedDriver::new("mysql", Arc::new(driver), config)
            .open_traced("app:secret@tcp(db.internal:3306)/shop")
            .unwrap()
    }

    pub fn spans(&self) -> Vec<SpanData> {
        self.exporter.get_finished_spans().unwrap()
    }

    pub fn spans_named(&self, name: &str) -> Vec<SpanData> {
        self.spans()
            .into_iter()
            .filter(|span| span.name == name)
            .collect()
    }

    pub fn span(&self, name: &str) -> SpanData {
        let mut spans = self.spans_named(name);
        assert_eq!(spans.len(), 1, "expected exactly one `{name}` span");
        spans.remove(0)
    }
}

/// String form of a span attribute.
pub fn attr(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.to_string())
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub operation: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn entry(&self, operation: &str) -> LogEntry {
        let entries: Vec<_> = self
            .entries()
            .into_iter()
            .filter(|entry| entry.operation == operation)
            .collect();
        assert_eq!(entries.len(), 1, "expected exactly one `{operation}` entry");
        entries[0].clone()
    }
}

impl QueryLogger for RecordingLogger {
    fn log(&self, _cx: &CallContext, operation: &str, fields: &[(&'static str, String)]) {
        self.entries.lock().unwrap().push(LogEntry {
            operation: operation.to_string(),
            fields: fields.to_vec(),
        });
    }
}

/// Records the driver methods that were actually invoked.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    fn push(&self, call: &'static str) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }
}

/// Optional extensions the mock connection and statements advertise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caps {
    pub begin_tx: bool,
    pub prepare_context: bool,
    pub execer: bool,
    pub execer_context: bool,
    pub queryer: bool,
    pub queryer_context: bool,
    pub pinger: bool,
    pub stmt_context: bool,
}

impl Caps {
    pub fn all() -> Self {
        Self {
            begin_tx: true,
            prepare_context: true,
            execer: true,
            execer_context: true,
            queryer: true,
            queryer_context: true,
            pinger: true,
            stmt_context: true,
        }
    }

    /// Only the direct, cancellation-unaware exec and query.
    pub fn legacy() -> Self {
        Self {
            execer: true,
            queryer: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    pub caps: Caps,
    pub log: CallLog,
    /// Rows every cursor yields.
    pub rows: usize,
    pub fail_open: bool,
    /// Make every fallible call fail.
    pub fail: bool,
}

impl MockDriver {
    pub fn new(caps: Caps) -> Self {
        Self {
            caps,
            ..Self::default()
        }
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn conn(&self) -> MockConn {
        MockConn {
            caps: self.caps,
            log: self.log.clone(),
            rows: self.rows,
            fail: self.fail,
        }
    }
}

impl Driver for MockDriver {
    fn open(&self, _dsn: &str) -> Result<Box<dyn Conn>> {
        self.log.push("driver.open");
        if self.fail_open {
            return Err(Error::driver("connection refused"));
        }
        Ok(Box::new(self.conn()))
    }
}

pub struct MockConn {
    caps: Caps,
    log: CallLog,
    rows: usize,
    fail: bool,
}

impl MockConn {
    fn stmt(&self) -> MockStmt {
        MockStmt {
            caps: self.caps,
            log: self.log.clone(),
            rows: self.rows,
            fail: self.fail,
        }
    }

    fn exec_outcome(&self) -> Outcome<Box<dyn ExecResult>> {
        if self.fail {
            Outcome::Failure(Error::driver("exec failed"))
        } else {
            Outcome::Success(Box::new(MockResult::new(self.log.clone())))
        }
    }

    fn query_outcome(&self) -> Outcome<Box<dyn Rows>> {
        if self.fail {
            Outcome::Failure(Error::driver("query failed"))
        } else {
            Outcome::Success(Box::new(MockRows::new(self.rows, self.log.clone())))
        }
    }
}

impl Conn for MockConn {
    fn prepare(&mut self, _query: &str) -> Result<Box<dyn Stmt>> {
        self.log.push("conn.prepare");
        Ok(Box::new(self.stmt()))
    }

    fn begin(&mut self) -> Result<Box<dyn Tx>> {
        self.log.push("conn.begin");
        Ok(Box::new(MockTx {
            log: self.log.clone(),
        }))
    }

    fn close(&mut self) -> Result<()> {
        self.log.push("conn.close");
        Ok(())
    }

    fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
        if self.caps.begin_tx {
            Some(self)
        } else {
            None
        }
    }

    fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
        if self.caps.prepare_context {
            Some(self)
        } else {
            None
        }
    }

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        if self.caps.execer {
            Some(self)
        } else {
            None
        }
    }

    fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
        if self.caps.execer_context {
            Some(self)
        } else {
            None
        }
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        if self.caps.queryer {
            Some(self)
        } else {
            None
        }
    }

    fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
        if self.caps.queryer_context {
            Some(self)
        } else {
            None
        }
    }

    fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
        if self.caps.pinger {
            Some(self)
        } else {
            None
        }
    }
}

impl ConnBeginTx for MockConn {
    fn begin_tx(&mut self, _cx: &CallContext, _opts: &TxOptions) -> Result<Box<dyn Tx>> {
        self.log.push("conn.begin_tx");
        if self.fail {
            return Err(Error::driver("begin failed"));
        }
        Ok(Box::new(MockTx {
            log: self.log.clone(),
        }))
    }
}

impl ConnPrepareContext for MockConn {
    fn prepare_context(&mut self, _cx: &CallContext, _query: &str) -> Result<Box<dyn Stmt>> {
        self.log.push("conn.prepare_context");
        if self.fail {
            return Err(Error::driver("prepare failed"));
        }
        Ok(Box::new(self.stmt()))
    }
}

impl Execer for MockConn {
    fn exec(&mut self, _query: &str, _args: &[Value]) -> Outcome<Box<dyn ExecResult>> {
        self.log.push("conn.exec");
        self.exec_outcome()
    }
}

impl ExecerContext for MockConn {
    fn exec_context(
        &mut self,
        _cx: &CallContext,
        _query: &str,
        _args: &[NamedValue],
    ) -> Outcome<Box<dyn ExecResult>> {
        self.log.push("conn.exec_context");
        self.exec_outcome()
    }
}

impl Queryer for MockConn {
    fn query(&mut self, _query: &str, _args: &[Value]) -> Outcome<Box<dyn Rows>> {
        self.log.push("conn.query");
        self.query_outcome()
    }
}

impl QueryerContext for MockConn {
    fn query_context(
        &mut self,
        _cx: &CallContext,
        _query: &str,
        _args: &[NamedValue],
    ) -> Outcome<Box<dyn Rows>> {
        self.log.push("conn.query_context");
        self.query_outcome()
    }
}

impl Pinger for MockConn {
    fn ping(&mut self, _cx: &CallContext) -> Result<()> {
        self.log.push("conn.ping");
        if self.fail {
            return Err(Error::driver("ping failed"));
        }
        Ok(())
    }
}

pub struct MockStmt {
    caps: Caps,
    log: CallLog,
    rows: usize,
    fail: bool,
}

impl Stmt for MockStmt {
    fn close(&mut self) -> Result<()> {
        self.log.push("stmt.close");
        if self.fail {
            return Err(Error::driver("close failed"));
        }
        Ok(())
    }

    fn num_input(&self) -> Option<usize> {
        None
    }

    fn exec(&mut self, _args: &[Value]) -> Result<Box<dyn ExecResult>> {
        self.log.push("stmt.exec");
        if self.fail {
            return Err(Error::driver("exec failed"));
        }
        Ok(Box::new(MockResult::new(self.log.clone())))
    }

    fn query(&mut self, _args: &[Value]) -> Result<Box<dyn Rows>> {
        self.log.push("stmt.query");
        Ok(Box::new(MockRows::new(self.rows, self.log.clone())))
    }

    fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
        if self.caps.stmt_context {
            Some(self)
        } else {
            None
        }
    }

    fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
        if self.caps.stmt_context {
            Some(self)
        } else {
            None
        }
    }
}

impl StmtExecContext for MockStmt {
    fn exec_context(
        &mut self,
        _cx: &CallContext,
        _args: &[NamedValue],
    ) -> Outcome<Box<dyn ExecResult>> {
        self.log.push("stmt.exec_context");
        Outcome::Success(Box::new(MockResult::new(self.log.clone())))
    }
}

impl StmtQueryContext for MockStmt {
    fn query_context(&mut self, _cx: &CallContext, _args: &[NamedValue]) -> Outcome<Box<dyn Rows>> {
        self.log.push("stmt.query_context");
        Outcome::Success(Box::new(MockRows::new(self.rows, self.log.clone())))
    }
}

pub struct MockRows {
    remaining: usize,
    next_id: i64,
    log: CallLog,
    /// Fail the fetch after this many rows.
    pub fail_after: Option<usize>,
}

impl MockRows {
    pub fn new(rows: usize, log: CallLog) -> Self {
        Self {
            remaining: rows,
            next_id: 1,
            log,
            fail_after: None,
        }
    }
}

impl Rows for MockRows {
    fn columns(&self) -> Vec<String> {
        vec!["id".to_string()]
    }

    fn next(&mut self) -> Result<Option<Vec<Value>>> {
        self.log.push("rows.next");
        if self.fail_after == Some((self.next_id - 1) as usize) {
            return Err(Error::driver("bad packet"));
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let row = vec![Value::Int(self.next_id)];
        self.next_id += 1;
        Ok(Some(row))
    }

    fn close(&mut self) -> Result<()> {
        self.log.push("rows.close");
        Ok(())
    }
}

pub struct MockResult {
    log: CallLog,
}

impl MockResult {
    fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl ExecResult for MockResult {
    fn last_insert_id(&self) -> Result<i64> {
        self.log.push("result.last_insert_id");
        Ok(42)
    }

    fn rows_affected(&self) -> Result<u64> {
        self.log.push("result.rows_affected");
        Ok(3)
    }
}

pub struct MockTx {
    log: CallLog,
}

impl Tx for MockTx {
    fn commit(&mut self) -> Result<()> {
        self.log.push("tx.commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.log.push("tx.rollback");
        Ok(())
    }
}
