mod common;

use common::{attr, CallLog, Caps, Harness, MockDriver, MockRows};
use sql_driver_tracing::{
    CallContext, Outcome, QueryerContext, Rows, RowsProxy, TraceContext, Value,
};

fn open_cursor(harness: &Harness, rows: usize, trace_rows: bool) -> Box<dyn Rows> {
    let config = if trace_rows {
        harness.config().with_trace_rows()
    } else {
        harness.config()
    };
    let mut conn = harness.open(MockDriver::new(Caps::all()).with_rows(rows), config);
    match conn.query_context(&CallContext::background(), "SELECT id FROM users", &[]) {
        Outcome::Success(rows) => rows,
        _ => panic!("expected a cursor"),
    }
}

fn drain(rows: &mut dyn Rows) -> Vec<Value> {
    let mut values = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        values.extend(row);
    }
    values
}

#[test]
fn test_row_count_reported_at_exhaustion() {
    let harness = Harness::new();
    let mut rows = open_cursor(&harness, 5, true);

    let values = drain(rows.as_mut());
    assert_eq!(values.len(), 5);
    assert_eq!(values[0], Value::Int(1));

    let span = harness.span("sql-rows-next");
    assert_eq!(attr(&span, "rows.len").as_deref(), Some("5"));

    rows.close().unwrap();
    let span = harness.span("sql-rows-close");
    assert_eq!(attr(&span, "rows.len").as_deref(), Some("5"));
}

#[test]
fn test_fetch_past_end_emits_single_span() {
    let harness = Harness::new();
    let mut rows = open_cursor(&harness, 2, true);

    drain(rows.as_mut());
    assert!(rows.next().unwrap().is_none());
    assert!(rows.next().unwrap().is_none());

    assert_eq!(harness.spans_named("sql-rows-next").len(), 1);
}

#[test]
fn test_empty_cursor_reports_zero_rows() {
    let harness = Harness::new();
    let mut rows = open_cursor(&harness, 0, true);

    assert!(rows.next().unwrap().is_none());
    let span = harness.span("sql-rows-next");
    assert_eq!(attr(&span, "rows.len").as_deref(), Some("0"));
}

#[test]
fn test_row_tracing_disabled_is_passthrough() {
    let harness = Harness::new();
    let mut rows = open_cursor(&harness, 3, false);

    assert_eq!(drain(rows.as_mut()).len(), 3);
    rows.close().unwrap();

    assert!(harness.spans_named("sql-rows-next").is_empty());
    assert!(harness.spans_named("sql-rows-close").is_empty());
    assert_eq!(harness.spans().len(), 1);
}

#[test]
fn test_fetch_error_ends_cursor_span() {
    let harness = Harness::new();
    let trace = TraceContext::new(Default::default(), harness.config().with_trace_rows());
    let mut inner = MockRows::new(4, CallLog::default());
    inner.fail_after = Some(2);
    let mut rows = RowsProxy::new(Box::new(inner), trace, CallContext::background());

    assert!(rows.next().unwrap().is_some());
    assert!(rows.next().unwrap().is_some());
    let err = rows.next().unwrap_err();
    assert_eq!(err.to_string(), "bad packet");
    assert_eq!(rows.rows_fetched(), 2);

    let span = harness.span("sql-rows-next");
    assert_eq!(attr(&span, "rows.len").as_deref(), Some("2"));
    assert_eq!(attr(&span, "error.message").as_deref(), Some("bad packet"));
}

#[test]
fn test_cursor_spans_are_not_logged() {
    let harness = Harness::new();
    let mut rows = open_cursor(&harness, 1, true);

    drain(rows.as_mut());
    rows.close().unwrap();

    let operations: Vec<String> = harness
        .logger
        .entries()
        .into_iter()
        .map(|entry| entry.operation)
        .collect();
    assert_eq!(operations, vec!["sql-conn-query", "sql-rows-close"]);
}
