//! Connection-string parsing into span metadata tags.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::keys::{TAG_DB_INSTANCE, TAG_DB_TYPE, TAG_DB_USER};

/// Flat key/value tags attached to every span of a connection.
pub type Metadata = BTreeMap<String, String>;

/// Maps a dialect's connection string to span tags.
pub trait DsnParser: Send + Sync {
    fn parse(&self, dsn: &str) -> Result<Metadata>;
}

/// Built-in parser for a driver name, if the dialect is known.
pub fn parser_for(driver_name: &str) -> Option<Arc<dyn DsnParser>> {
    match driver_name {
        "mysql" => Some(Arc::new(MySqlDsnParser)),
        "postgres" | "postgresql" | "pgx" => Some(Arc::new(PostgresDsnParser)),
        _ => None,
    }
}

/// Parse `dsn` with the built-in parser for `driver_name`.
///
/// Unknown dialects yield an empty tag set.
pub fn parse_dsn(driver_name: &str, dsn: &str) -> Result<Metadata> {
    match parser_for(driver_name) {
        Some(parser) => parser.parse(dsn),
        None => Ok(Metadata::new()),
    }
}

fn tags(instance: String, user: &str, db_type: &str) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert(TAG_DB_INSTANCE.to_string(), instance);
    meta.insert(TAG_DB_USER.to_string(), user.to_string());
    meta.insert(TAG_DB_TYPE.to_string(), db_type.to_string());
    meta
}

// net(addr), e.g. `tcp(db:3306)` or `unix(/tmp/mysql.sock)`
static MYSQL_NET_ADDR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<net>[^(]*)(?:\((?P<addr>[^)]*)\))?$").unwrap());

/// `[user[:password]@][net[(addr)]]/dbname[?param=value]`
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDsnParser;

impl DsnParser for MySqlDsnParser {
    fn parse(&self, dsn: &str) -> Result<Metadata> {
        let slash = dsn.rfind('/').ok_or_else(|| {
            Error::InvalidDsn("missing the slash separating the database name".to_string())
        })?;
        let (head, tail) = (&dsn[..slash], &dsn[slash + 1..]);
        let db_name = tail.split('?').next().unwrap_or_default();

        let (user, net_addr) = match head.rfind('@') {
            Some(at) => {
                let user_info = &head[..at];
                let user = user_info.split(':').next().unwrap_or_default();
                (user, &head[at + 1..])
            }
            None => ("", head),
        };

        let caps = MYSQL_NET_ADDR_REGEX
            .captures(net_addr)
            .ok_or_else(|| Error::InvalidDsn(format!("malformed network address `{net_addr}`")))?;
        let net = caps.name("net").map_or("", |m| m.as_str());
        let addr = caps.name("addr").map_or("", |m| m.as_str());

        let addr = match (net, addr) {
            ("" | "tcp", "") => "127.0.0.1:3306".to_string(),
            ("unix", "") => "/tmp/mysql.sock".to_string(),
            ("" | "tcp", addr) if !addr.contains(':') => format!("{addr}:3306"),
            (_, addr) => addr.to_string(),
        };

        Ok(tags(format!("{addr}/{db_name}"), user, "mysql"))
    }
}

static PG_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^postgres(?:ql)?://(?:(?P<user>[^:@/]*)(?::[^@/]*)?@)?",
        r"(?P<host>[^:/?]*)(?::(?P<port>\d+))?(?:/(?P<db>[^?]*))?",
    ))
    .unwrap()
});

static PG_KV_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<key>\w+)\s*=\s*(?P<value>'[^']*'|\S*)").unwrap());

/// Postgres URL (`postgres://user@host:port/db`) or `key=value` connection strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDsnParser;

impl DsnParser for PostgresDsnParser {
    fn parse(&self, dsn: &str) -> Result<Metadata> {
        let mut host = String::new();
        let mut port = String::new();
        let mut user = String::new();
        let mut db = String::new();

        if let Some(caps) = PG_URL_REGEX.captures(dsn) {
            let get = |name: &str| caps.name(name).map_or("", |m| m.as_str()).to_string();
            host = get("host");
            port = get("port");
            user = get("user");
            db = get("db");
        } else if dsn.contains("://") {
            return Err(Error::InvalidDsn("unsupported URL scheme".to_string()));
        } else {
            let mut matched = false;
            for caps in PG_KV_REGEX.captures_iter(dsn) {
                matched = true;
                let value = caps["value"].trim_matches('\'').to_string();
                match &caps["key"] {
                    "host" => host = value,
                    "port" => port = value,
                    "user" => user = value,
                    "dbname" => db = value,
                    _ => {}
                }
            }
            if !matched {
                return Err(Error::InvalidDsn("expected key=value pairs".to_string()));
            }
        }

        if host.is_empty() {
            host = "localhost".to_string();
        }
        if port.is_empty() {
            port = "5432".to_string();
        }
        if db.is_empty() {
            db = user.clone();
        }

        Ok(tags(format!("{host}:{port}/{db}"), &user, "postgres"))
    }
}
