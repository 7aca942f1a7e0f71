//! Traced prepared statement.

use std::time::SystemTime;

use crate::connection::fallback_args;
use crate::context::CallContext;
use crate::driver::{ExecResult, NamedValue, Rows, Stmt, StmtExecContext, StmtQueryContext, Value};
use crate::error::{Outcome, Result};
use crate::keys::{OP_SQL_STMT_CLOSE, OP_SQL_STMT_EXEC, OP_SQL_STMT_QUERY};
use crate::result::ResultProxy;
use crate::rows::RowsProxy;
use crate::trace::{CallRecord, TraceContext};

/// Traced version of a prepared statement, bound to its query text.
///
/// The plain [`Stmt::exec`] and [`Stmt::query`] are traced too: they run
/// through the cancellation-aware paths with a background context.
pub struct StatementProxy {
    inner: Box<dyn Stmt>,
    trace: TraceContext,
    cx: CallContext,
    query: String,
}

impl StatementProxy {
    pub fn new(
        inner: Box<dyn Stmt>,
        trace: TraceContext,
        cx: CallContext,
        query: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            trace,
            cx,
            query: query.into(),
        }
    }

    /// The query text this statement was prepared from.
    pub fn query_text(&self) -> &str {
        &self.query
    }

    fn wrap_result(&self, cx: &CallContext, result: Box<dyn ExecResult>) -> Box<dyn ExecResult> {
        Box::new(ResultProxy::new(result, self.trace.clone(), cx.clone()))
    }

    fn wrap_rows(&self, cx: &CallContext, rows: Box<dyn Rows>) -> Box<dyn Rows> {
        Box::new(RowsProxy::new(rows, self.trace.clone(), cx.clone()))
    }

    /// Run the wrapped statement's positional exec and trace it.
    fn exec_values(
        &mut self,
        cx: &CallContext,
        values: &[Value],
        start: SystemTime,
    ) -> Result<Box<dyn ExecResult>> {
        let result = self.inner.exec(values);
        let call = CallRecord::new(OP_SQL_STMT_EXEC, start)
            .query(&self.query)
            .args(values);
        self.trace.instrument(cx, call, (&result).into());
        result.map(|res| self.wrap_result(cx, res))
    }

    /// Run the wrapped statement's positional query and trace it.
    fn query_values(
        &mut self,
        cx: &CallContext,
        values: &[Value],
        start: SystemTime,
    ) -> Result<Box<dyn Rows>> {
        let result = self.inner.query(values);
        let call = CallRecord::new(OP_SQL_STMT_QUERY, start)
            .query(&self.query)
            .args(values);
        self.trace.instrument(cx, call, (&result).into());
        result.map(|rows| self.wrap_rows(cx, rows))
    }
}

impl Stmt for StatementProxy {
    /// Close the statement, always reporting a span.
    fn close(&mut self) -> Result<()> {
        let start = SystemTime::now();
        let result = self.inner.close();
        let call = CallRecord::new(OP_SQL_STMT_CLOSE, start).query(&self.query);
        self.trace.instrument(&self.cx, call, (&result).into());
        result
    }

    fn num_input(&self) -> Option<usize> {
        self.inner.num_input()
    }

    fn exec(&mut self, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        let cx = CallContext::background();
        let named = NamedValue::from_values(args.iter().cloned());
        match self.exec_context(&cx, &named) {
            Outcome::Success(result) => Ok(result),
            Outcome::Failure(err) => Err(err),
            // The driver's context-aware exec declined; use its plain one.
            Outcome::Unsupported => self.exec_values(&cx, args, SystemTime::now()),
        }
    }

    fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>> {
        let cx = CallContext::background();
        let named = NamedValue::from_values(args.iter().cloned());
        match self.query_context(&cx, &named) {
            Outcome::Success(rows) => Ok(rows),
            Outcome::Failure(err) => Err(err),
            Outcome::Unsupported => self.query_values(&cx, args, SystemTime::now()),
        }
    }

    fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
        Some(self)
    }

    fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
        Some(self)
    }
}

impl StmtExecContext for StatementProxy {
    fn exec_context(
        &mut self,
        cx: &CallContext,
        args: &[NamedValue],
    ) -> Outcome<Box<dyn ExecResult>> {
        let start = SystemTime::now();
        if let Some(stmt) = self.inner.as_exec_context() {
            let outcome = stmt.exec_context(cx, args);
            let call = CallRecord::new(OP_SQL_STMT_EXEC, start)
                .query(&self.query)
                .named_args(args);
            self.trace.instrument(cx, call, (&outcome).into());
            return outcome.map(|res| self.wrap_result(cx, res));
        }

        let op = OP_SQL_STMT_EXEC;
        let values = match fallback_args(&self.trace, cx, op, &self.query, args, start) {
            Ok(values) => values,
            Err(err) => return Outcome::Failure(err),
        };
        Outcome::from(self.exec_values(cx, &values, start))
    }
}

impl StmtQueryContext for StatementProxy {
    fn query_context(&mut self, cx: &CallContext, args: &[NamedValue]) -> Outcome<Box<dyn Rows>> {
        let start = SystemTime::now();
        if let Some(stmt) = self.inner.as_query_context() {
            let outcome = stmt.query_context(cx, args);
            let call = CallRecord::new(OP_SQL_STMT_QUERY, start)
                .query(&self.query)
                .named_args(args);
            self.trace.instrument(cx, call, (&outcome).into());
            return outcome.map(|rows| self.wrap_rows(cx, rows));
        }

        let op = OP_SQL_STMT_QUERY;
        let values = match fallback_args(&self.trace, cx, op, &self.query, args, start) {
            Ok(values) => values,
            Err(err) => return Outcome::Failure(err),
        };
        Outcome::from(self.query_values(cx, &values, start))
    }
}
