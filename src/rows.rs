//! Traced result-set cursor.

use std::time::SystemTime;

use crate::context::CallContext;
use crate::driver::{Rows, Value};
use crate::error::Result;
use crate::keys::{OP_SQL_ROWS_CLOSE, OP_SQL_ROWS_NEXT};
use crate::trace::{CallRecord, CallStatus, TraceContext};

/// State scoped to one cursor's iteration.
#[derive(Debug, Default)]
struct CursorState {
    /// Created on the first traced fetch.
    rows: Option<u64>,
    /// Set once the fetch span has been emitted.
    finished: bool,
}

impl CursorState {
    fn count(&self) -> u64 {
        self.rows.unwrap_or_default()
    }
}

/// Traced cursor.
///
/// With row tracing enabled a single `sql-rows-next` span is emitted when the
/// cursor is exhausted (or a fetch fails), tagged with the number of rows
/// fetched, and `close` is traced as well. With row tracing disabled both
/// calls are plain delegation.
pub struct RowsProxy {
    inner: Box<dyn Rows>,
    trace: TraceContext,
    cx: CallContext,
    state: CursorState,
}

impl RowsProxy {
    pub fn new(inner: Box<dyn Rows>, trace: TraceContext, cx: CallContext) -> Self {
        Self {
            inner,
            trace,
            cx,
            state: CursorState::default(),
        }
    }

    /// Rows fetched so far. Only counted while row tracing is enabled.
    pub fn rows_fetched(&self) -> u64 {
        self.state.count()
    }

    fn finish_fetching(&mut self, start: SystemTime, status: CallStatus<'_>) {
        if self.state.finished {
            return;
        }
        self.state.finished = true;
        let call = CallRecord::new(OP_SQL_ROWS_NEXT, start).rows(self.state.count());
        self.trace.instrument(&self.cx, call, status);
    }
}

impl Rows for RowsProxy {
    fn columns(&self) -> Vec<String> {
        self.inner.columns()
    }

    fn next(&mut self) -> Result<Option<Vec<Value>>> {
        if !self.trace.trace_rows() {
            return self.inner.next();
        }

        let start = SystemTime::now();
        let fetched = self.inner.next();
        match &fetched {
            Ok(Some(_)) => *self.state.rows.get_or_insert(0) += 1,
            Ok(None) => self.finish_fetching(start, CallStatus::Ok),
            Err(err) => self.finish_fetching(start, CallStatus::Failed(err)),
        }
        fetched
    }

    fn close(&mut self) -> Result<()> {
        if !self.trace.trace_rows() {
            return self.inner.close();
        }

        let start = SystemTime::now();
        let result = self.inner.close();
        let call = CallRecord::new(OP_SQL_ROWS_CLOSE, start).rows(self.state.count());
        self.trace.instrument(&self.cx, call, (&result).into());
        result
    }
}
