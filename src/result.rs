//! Traced exec result.

use std::time::SystemTime;

use crate::context::CallContext;
use crate::driver::ExecResult;
use crate::error::Result;
use crate::keys::{OP_SQL_RES_LAST_INSERT_ID, OP_SQL_RES_ROWS_AFFECTED};
use crate::trace::{CallRecord, TraceContext};

/// Wraps an exec result; each accessor reads the inner result once and
/// reports its own span.
pub struct ResultProxy {
    inner: Box<dyn ExecResult>,
    trace: TraceContext,
    cx: CallContext,
}

impl ResultProxy {
    pub fn new(inner: Box<dyn ExecResult>, trace: TraceContext, cx: CallContext) -> Self {
        Self { inner, trace, cx }
    }
}

impl ExecResult for ResultProxy {
    fn last_insert_id(&self) -> Result<i64> {
        let start = SystemTime::now();
        let id = self.inner.last_insert_id();
        let call = CallRecord::new(OP_SQL_RES_LAST_INSERT_ID, start);
        self.trace.instrument(&self.cx, call, (&id).into());
        id
    }

    fn rows_affected(&self) -> Result<u64> {
        let start = SystemTime::now();
        let affected = self.inner.rows_affected();
        let call = CallRecord::new(OP_SQL_RES_ROWS_AFFECTED, start);
        self.trace.instrument(&self.cx, call, (&affected).into());
        affected
    }
}
