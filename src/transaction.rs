//! Traced transaction.

use std::time::SystemTime;

use crate::context::CallContext;
use crate::driver::Tx;
use crate::error::Result;
use crate::keys::{OP_SQL_TX_COMMIT, OP_SQL_TX_ROLLBACK};
use crate::trace::{CallRecord, TraceContext};

/// Traced transaction.
///
/// Remembers when it was begun so the commit or rollback log entry can report
/// the transaction's total duration as `tx_cost`.
pub struct TransactionProxy {
    inner: Box<dyn Tx>,
    trace: TraceContext,
    cx: CallContext,
    begun_at: Option<SystemTime>,
}

impl TransactionProxy {
    pub fn new(
        inner: Box<dyn Tx>,
        trace: TraceContext,
        cx: CallContext,
        begun_at: Option<SystemTime>,
    ) -> Self {
        Self {
            inner,
            trace,
            cx,
            begun_at,
        }
    }

    pub fn begun_at(&self) -> Option<SystemTime> {
        self.begun_at
    }

    fn finish(&mut self, operation: &'static str, commit: bool) -> Result<()> {
        let start = SystemTime::now();
        let result = if commit {
            self.inner.commit()
        } else {
            self.inner.rollback()
        };
        let call = CallRecord::new(operation, start).tx_begin(self.begun_at);
        self.trace.instrument(&self.cx, call, (&result).into());
        result
    }
}

impl Tx for TransactionProxy {
    fn commit(&mut self) -> Result<()> {
        self.finish(OP_SQL_TX_COMMIT, true)
    }

    fn rollback(&mut self) -> Result<()> {
        self.finish(OP_SQL_TX_ROLLBACK, false)
    }
}
