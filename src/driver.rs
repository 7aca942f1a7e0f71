//! The raw driver contract that traced proxies wrap.
//!
//! A driver implements the baseline traits ([`Driver`], [`Conn`], [`Stmt`],
//! [`Rows`], [`ExecResult`], [`Tx`]). Optional extensions are advertised per
//! resource through the `as_*` capability queries, which return `None` unless
//! the resource overrides them.

use std::fmt;

use crate::context::CallContext;
use crate::error::{Error, Outcome, Result};

/// A single bind argument or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Short type label used in telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "i64",
            Value::Float(_) => "f64",
            Value::Text(_) => "str",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Bytes(v) => write!(f, "len:{}", v.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// An argument as handed to a cancellation-aware call.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    /// Bind name, `None` for positional arguments.
    pub name: Option<String>,
    /// 1-based position of the argument.
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal,
            value: value.into(),
        }
    }

    /// Build positional arguments from plain values.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Vec<NamedValue> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| NamedValue::positional(i + 1, value))
            .collect()
    }
}

/// Strip names off arguments for a driver that only binds positionally.
pub fn named_value_to_value(named: &[NamedValue]) -> Result<Vec<Value>> {
    named
        .iter()
        .map(|param| match &param.name {
            Some(name) if !name.is_empty() => {
                Err(Error::NamedParameterUnsupported(name.clone()))
            }
            _ => Ok(param.value.clone()),
        })
        .collect()
}

/// Isolation levels a transaction may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Options for [`ConnBeginTx::begin_tx`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
}

/// Entry point of a driver.
pub trait Driver: Send + Sync {
    fn open(&self, dsn: &str) -> Result<Box<dyn Conn>>;
}

/// An open connection.
pub trait Conn: Send {
    fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>>;

    /// Legacy begin. Does not observe caller cancellation.
    fn begin(&mut self) -> Result<Box<dyn Tx>>;

    fn close(&mut self) -> Result<()>;

    fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
        None
    }

    fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
        None
    }

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        None
    }

    fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
        None
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        None
    }

    fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
        None
    }

    fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
        None
    }
}

pub trait ConnBeginTx {
    fn begin_tx(&mut self, cx: &CallContext, opts: &TxOptions) -> Result<Box<dyn Tx>>;
}

pub trait ConnPrepareContext {
    fn prepare_context(&mut self, cx: &CallContext, query: &str) -> Result<Box<dyn Stmt>>;
}

/// Direct execution without cancellation awareness.
pub trait Execer {
    fn exec(&mut self, query: &str, args: &[Value]) -> Outcome<Box<dyn ExecResult>>;
}

pub trait ExecerContext {
    fn exec_context(
        &mut self,
        cx: &CallContext,
        query: &str,
        args: &[NamedValue],
    ) -> Outcome<Box<dyn ExecResult>>;
}

/// Direct query without cancellation awareness.
pub trait Queryer {
    fn query(&mut self, query: &str, args: &[Value]) -> Outcome<Box<dyn Rows>>;
}

pub trait QueryerContext {
    fn query_context(
        &mut self,
        cx: &CallContext,
        query: &str,
        args: &[NamedValue],
    ) -> Outcome<Box<dyn Rows>>;
}

/// Liveness check.
pub trait Pinger {
    fn ping(&mut self, cx: &CallContext) -> Result<()>;
}

/// A prepared statement.
pub trait Stmt: Send {
    fn close(&mut self) -> Result<()>;

    /// Number of placeholders, `None` when the driver does not know.
    fn num_input(&self) -> Option<usize>;

    fn exec(&mut self, args: &[Value]) -> Result<Box<dyn ExecResult>>;

    fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>>;

    fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
        None
    }

    fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
        None
    }
}

pub trait StmtExecContext {
    fn exec_context(
        &mut self,
        cx: &CallContext,
        args: &[NamedValue],
    ) -> Outcome<Box<dyn ExecResult>>;
}

pub trait StmtQueryContext {
    fn query_context(&mut self, cx: &CallContext, args: &[NamedValue])
        -> Outcome<Box<dyn Rows>>;
}

/// A result-set cursor.
pub trait Rows: Send {
    fn columns(&self) -> Vec<String>;

    /// Fetch the next row, `None` once the cursor is exhausted.
    fn next(&mut self) -> Result<Option<Vec<Value>>>;

    fn close(&mut self) -> Result<()>;
}

/// Result of an exec call.
pub trait ExecResult: Send {
    fn last_insert_id(&self) -> Result<i64>;

    fn rows_affected(&self) -> Result<u64>;
}

pub trait Tx: Send {
    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_value_to_value_positional() {
        let args = NamedValue::from_values(vec![Value::Int(1), Value::from("a")]);
        let values = named_value_to_value(&args).unwrap();
        assert_eq!(values, vec![Value::Int(1), Value::Text("a".to_string())]);
    }

    #[test]
    fn test_named_value_to_value_rejects_names() {
        let args = vec![
            NamedValue::positional(1, Value::Int(1)),
            NamedValue::named("id", 2, Value::Int(7)),
        ];
        match named_value_to_value(&args) {
            Err(Error::NamedParameterUnsupported(name)) => assert_eq!(name, "id"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_name_counts_as_positional() {
        let args = vec![NamedValue::named("", 1, true)];
        assert_eq!(named_value_to_value(&args).unwrap(), vec![Value::Bool(true)]);
    }
}
