//! Redaction-safe argument summaries for spans and log entries.

use std::fmt::Write;

use crate::driver::{NamedValue, Value};

/// Placeholder emitted when an argument list cannot be rendered.
pub const UNKNOWN_ARGS: &str = "<unknown>";

/// Call arguments in either binding style.
#[derive(Debug, Clone, Copy)]
pub enum Args<'a> {
    Positional(&'a [Value]),
    Named(&'a [NamedValue]),
}

impl Args<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            Args::Positional(values) => values.is_empty(),
            Args::Named(values) => values.is_empty(),
        }
    }
}

impl<'a> From<&'a [Value]> for Args<'a> {
    fn from(values: &'a [Value]) -> Self {
        Args::Positional(values)
    }
}

impl<'a> From<&'a [NamedValue]> for Args<'a> {
    fn from(values: &'a [NamedValue]) -> Self {
        Args::Named(values)
    }
}

/// Render arguments as `{[type value], ...}`.
///
/// Byte arguments only report their length, text is quoted, and named
/// arguments render as `[type name=<value>]`.
///
/// ```rust
/// use sql_driver_tracing::{format_arguments, Args, Value};
///
/// let values = [Value::Int(7), Value::Bytes(vec![0; 16])];
/// assert_eq!(
///     format_arguments(&Args::Positional(&values)),
///     "{[i64 7], [bytes len:16]}"
/// );
/// ```
pub fn format_arguments(args: &Args<'_>) -> String {
    let mut out = String::from("{");
    let written = match args {
        Args::Positional(values) => write_list(&mut out, values.iter(), write_value),
        Args::Named(values) => write_list(&mut out, values.iter(), write_named),
    };
    match written {
        Ok(()) => {
            out.push('}');
            out
        }
        Err(_) => UNKNOWN_ARGS.to_string(),
    }
}

fn write_list<'a, T: 'a>(
    out: &mut String,
    items: impl Iterator<Item = &'a T>,
    write_one: fn(&mut String, &T) -> std::fmt::Result,
) -> std::fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_one(out, item)?;
    }
    Ok(())
}

fn write_value(out: &mut String, value: &Value) -> std::fmt::Result {
    match value {
        Value::Null => out.write_str("[null]"),
        Value::Bytes(bytes) => write!(out, "[bytes len:{}]", bytes.len()),
        other => write!(out, "[{} {}]", other.type_name(), other),
    }
}

fn write_named(out: &mut String, arg: &NamedValue) -> std::fmt::Result {
    match arg.name.as_deref() {
        Some(name) if !name.is_empty() => {
            write!(out, "[{} {}=", arg.value.type_name(), name)?;
            write_value(out, &arg.value)?;
            out.write_char(']')
        }
        _ => write_value(out, &arg.value),
    }
}
