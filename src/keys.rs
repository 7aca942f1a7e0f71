//! Operation names and span tag keys.
//!
//! Operation names double as span names and as the `operation` passed to a
//! [`QueryLogger`](crate::QueryLogger).

pub const OP_SQL_PREPARE: &str = "sql-prepare";
pub const OP_SQL_CONN_EXEC: &str = "sql-conn-exec";
pub const OP_SQL_CONN_QUERY: &str = "sql-conn-query";
pub const OP_SQL_STMT_EXEC: &str = "sql-stmt-exec";
pub const OP_SQL_STMT_QUERY: &str = "sql-stmt-query";
pub const OP_SQL_STMT_CLOSE: &str = "sql-stmt-close";
pub const OP_SQL_TX_BEGIN: &str = "sql-tx-begin";
pub const OP_SQL_TX_COMMIT: &str = "sql-tx-commit";
pub const OP_SQL_TX_ROLLBACK: &str = "sql-tx-rollback";
pub const OP_SQL_RES_LAST_INSERT_ID: &str = "sql-res-lastInsertId";
pub const OP_SQL_RES_ROWS_AFFECTED: &str = "sql-res-rowsAffected";
pub const OP_SQL_ROWS_NEXT: &str = "sql-rows-next";
pub const OP_SQL_ROWS_CLOSE: &str = "sql-rows-close";
pub const OP_SQL_PING: &str = "sql-ping";

pub const OP_CQL_SCAN: &str = "cql-scan";
pub const OP_CQL_MAP_SCAN: &str = "cql-map-scan";
pub const OP_CQL_SCAN_CAS: &str = "cql-scan-cas";
pub const OP_CQL_ITER: &str = "cql-iter";

/// Operations that are never sent to the query logger.
pub(crate) const UNLOGGED_OPS: &[&str] = &[OP_SQL_ROWS_NEXT, OP_SQL_PING];

pub(crate) fn is_row_op(op: &str) -> bool {
    op == OP_SQL_ROWS_NEXT || op == OP_SQL_ROWS_CLOSE
}

pub(crate) fn is_tx_end_op(op: &str) -> bool {
    op == OP_SQL_TX_COMMIT || op == OP_SQL_TX_ROLLBACK
}

pub const COMPONENT_SQL: &str = "database/sql";
pub const COMPONENT_CQL: &str = "cql";

pub const TAG_COMPONENT: &str = "component";
pub const TAG_DB_STATEMENT: &str = "db.statement";
pub const TAG_DB_INSTANCE: &str = "db.instance";
pub const TAG_DB_USER: &str = "db.user";
pub const TAG_DB_TYPE: &str = "db.type";
pub const TAG_ARGS: &str = "args";
pub const TAG_ERROR: &str = "error";
pub const TAG_ERROR_MESSAGE: &str = "error.message";
pub const TAG_ROWS_LEN: &str = "rows.len";
pub const TAG_SLOW_QUERY: &str = "slow_query";

pub const TAG_SERVICE_NAME: &str = "service.name";
pub const TAG_RESOURCE_NAME: &str = "resource.name";
pub const TAG_SPAN_TYPE: &str = "span.type";
pub const TAG_CASSANDRA_PAGINATED: &str = "cassandra.paginated";
pub const TAG_CASSANDRA_KEYSPACE: &str = "cassandra.keyspace";
pub const TAG_CASSANDRA_ROW_COUNT: &str = "cassandra.row_count";
pub const TAG_CASSANDRA_CONSISTENCY: &str = "cassandra.consistency_level";
pub const TAG_CASSANDRA_CLUSTER: &str = "cassandra.cluster";
pub const TAG_OUT_HOST: &str = "out.host";
pub const TAG_OUT_PORT: &str = "out.port";

pub const FIELD_QUERY: &str = "query";
pub const FIELD_ARGS: &str = "args";
pub const FIELD_ERROR: &str = "error";
pub const FIELD_TX_COST: &str = "tx_cost";
pub const FIELD_COST: &str = "cost";
pub const FIELD_SLOW_QUERY: &str = "slow_query";
