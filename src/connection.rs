//! Traced connection wrapper.

use std::fmt;
use std::time::SystemTime;

use crate::context::CallContext;
use crate::driver::{
    named_value_to_value, Conn, ConnBeginTx, ConnPrepareContext, ExecResult, Execer,
    ExecerContext, NamedValue, Pinger, Queryer, QueryerContext, Rows, Stmt, Tx, TxOptions, Value,
};
use crate::error::{Outcome, Result};
use crate::keys::{
    OP_SQL_CONN_EXEC, OP_SQL_CONN_QUERY, OP_SQL_PING, OP_SQL_PREPARE, OP_SQL_TX_BEGIN,
};
use crate::result::ResultProxy;
use crate::rows::RowsProxy;
use crate::statement::StatementProxy;
use crate::trace::{CallRecord, CallStatus, TraceContext};
use crate::transaction::TransactionProxy;

/// A traced wrapper around a driver connection.
///
/// `ConnectionProxy` implements [`Conn`] and every optional connection
/// capability, so it can stand in wherever the raw connection was used.
/// Each call is forwarded to the wrapped connection and reported through the
/// shared [`TraceContext`]; statements, cursors, results and transactions it
/// hands out are wrapped in turn.
///
/// When the wrapped connection lacks cancellation-aware exec or query, the
/// proxy falls back to the plain variant: named arguments are rejected and an
/// already-signaled [`CallContext`] aborts the call before the driver sees it.
pub struct ConnectionProxy {
    inner: Box<dyn Conn>,
    trace: TraceContext,
}

impl fmt::Debug for ConnectionProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProxy")
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

impl ConnectionProxy {
    pub fn new(inner: Box<dyn Conn>, trace: TraceContext) -> Self {
        Self { inner, trace }
    }

    /// Get the tracing state shared with every resource of this connection.
    pub fn trace_context(&self) -> &TraceContext {
        &self.trace
    }

    /// Get a mutable reference to the underlying connection.
    pub fn inner_mut(&mut self) -> &mut dyn Conn {
        self.inner.as_mut()
    }

    /// Consume the wrapper and return the underlying connection.
    pub fn into_inner(self) -> Box<dyn Conn> {
        self.inner
    }

    fn wrap_result(&self, cx: &CallContext, result: Box<dyn ExecResult>) -> Box<dyn ExecResult> {
        Box::new(ResultProxy::new(result, self.trace.clone(), cx.clone()))
    }

    fn wrap_rows(&self, cx: &CallContext, rows: Box<dyn Rows>) -> Box<dyn Rows> {
        Box::new(RowsProxy::new(rows, self.trace.clone(), cx.clone()))
    }
}

/// Validate the fallback path's preconditions: positional arguments only, and
/// a context that has not fired yet. A failure is traced before returning.
pub(crate) fn fallback_args(
    trace: &TraceContext,
    cx: &CallContext,
    operation: &'static str,
    query: &str,
    args: &[NamedValue],
    start: SystemTime,
) -> Result<Vec<Value>> {
    let checked = named_value_to_value(args).and_then(|values| cx.check().map(|()| values));
    if let Err(err) = &checked {
        let call = CallRecord::new(operation, start).query(query).named_args(args);
        trace.instrument(cx, call, CallStatus::Failed(err));
    }
    checked
}

impl Conn for ConnectionProxy {
    fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>> {
        self.prepare_context(&CallContext::background(), query)
    }

    fn begin(&mut self) -> Result<Box<dyn Tx>> {
        self.begin_tx(&CallContext::background(), &TxOptions::default())
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
        Some(self)
    }

    fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
        Some(self)
    }

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        Some(self)
    }

    fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
        Some(self)
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        Some(self)
    }

    fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
        Some(self)
    }

    fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
        Some(self)
    }
}

impl ConnBeginTx for ConnectionProxy {
    fn begin_tx(&mut self, cx: &CallContext, opts: &TxOptions) -> Result<Box<dyn Tx>> {
        let start = SystemTime::now();
        let result = match self.inner.as_begin_tx() {
            Some(begin) => begin.begin_tx(cx, opts),
            None => self.inner.begin(),
        };
        self.trace
            .instrument(cx, CallRecord::new(OP_SQL_TX_BEGIN, start), (&result).into());

        let tx = result?;
        Ok(Box::new(TransactionProxy::new(
            tx,
            self.trace.clone(),
            cx.clone(),
            Some(start),
        )))
    }
}

impl ConnPrepareContext for ConnectionProxy {
    fn prepare_context(&mut self, cx: &CallContext, query: &str) -> Result<Box<dyn Stmt>> {
        let start = SystemTime::now();
        let result = match self.inner.as_prepare_context() {
            Some(prepare) => prepare.prepare_context(cx, query),
            None => self.inner.prepare(query),
        };
        self.trace.instrument(
            cx,
            CallRecord::new(OP_SQL_PREPARE, start).query(query),
            (&result).into(),
        );

        let stmt = result?;
        Ok(Box::new(StatementProxy::new(
            stmt,
            self.trace.clone(),
            cx.clone(),
            query,
        )))
    }
}

// Untraced: the cancellation-aware wrapper below reports these calls.
impl Execer for ConnectionProxy {
    fn exec(&mut self, query: &str, args: &[Value]) -> Outcome<Box<dyn ExecResult>> {
        match self.inner.as_execer() {
            Some(execer) => execer.exec(query, args),
            None => Outcome::Unsupported,
        }
    }
}

impl ExecerContext for ConnectionProxy {
    fn exec_context(
        &mut self,
        cx: &CallContext,
        query: &str,
        args: &[NamedValue],
    ) -> Outcome<Box<dyn ExecResult>> {
        let start = SystemTime::now();
        if let Some(execer) = self.inner.as_execer_context() {
            let outcome = execer.exec_context(cx, query, args);
            let call = CallRecord::new(OP_SQL_CONN_EXEC, start)
                .query(query)
                .named_args(args);
            self.trace.instrument(cx, call, (&outcome).into());
            return outcome.map(|res| self.wrap_result(cx, res));
        }

        let values = match fallback_args(&self.trace, cx, OP_SQL_CONN_EXEC, query, args, start) {
            Ok(values) => values,
            Err(err) => return Outcome::Failure(err),
        };
        let outcome = self.exec(query, &values);
        let call = CallRecord::new(OP_SQL_CONN_EXEC, start)
            .query(query)
            .args(&values);
        self.trace.instrument(cx, call, (&outcome).into());
        outcome.map(|res| self.wrap_result(cx, res))
    }
}

// Untraced: the cancellation-aware wrapper below reports these calls.
impl Queryer for ConnectionProxy {
    fn query(&mut self, query: &str, args: &[Value]) -> Outcome<Box<dyn Rows>> {
        match self.inner.as_queryer() {
            Some(queryer) => queryer.query(query, args),
            None => Outcome::Unsupported,
        }
    }
}

impl QueryerContext for ConnectionProxy {
    fn query_context(
        &mut self,
        cx: &CallContext,
        query: &str,
        args: &[NamedValue],
    ) -> Outcome<Box<dyn Rows>> {
        let start = SystemTime::now();
        if let Some(queryer) = self.inner.as_queryer_context() {
            let outcome = queryer.query_context(cx, query, args);
            let call = CallRecord::new(OP_SQL_CONN_QUERY, start)
                .query(query)
                .named_args(args);
            self.trace.instrument(cx, call, (&outcome).into());
            return outcome.map(|rows| self.wrap_rows(cx, rows));
        }

        let values = match fallback_args(&self.trace, cx, OP_SQL_CONN_QUERY, query, args, start) {
            Ok(values) => values,
            Err(err) => return Outcome::Failure(err),
        };
        let outcome = Queryer::query(self, query, &values);
        let call = CallRecord::new(OP_SQL_CONN_QUERY, start)
            .query(query)
            .args(&values);
        self.trace.instrument(cx, call, (&outcome).into());
        outcome.map(|rows| self.wrap_rows(cx, rows))
    }
}

impl Pinger for ConnectionProxy {
    fn ping(&mut self, cx: &CallContext) -> Result<()> {
        let start = SystemTime::now();
        let result = match self.inner.as_pinger() {
            Some(pinger) => pinger.ping(cx),
            None => Ok(()),
        };
        self.trace
            .instrument(cx, CallRecord::new(OP_SQL_PING, start), (&result).into());
        result
    }
}
