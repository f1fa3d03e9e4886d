//! Execution collaborators.
//!
//! The engine is a pure value-transformation layer; HTTP transport and SQL
//! execution live behind the traits here. Hosts implement them over their
//! I/O stack and the drivers wire one exchange end to end: prepare from the
//! session, execute, feed the result back into the pool.

use crate::config::SqlSpec;
use crate::models::{ExchangeResponse, ResolvedRequest};
use crate::session::Session;
use crate::template;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// One SQL result row: column name to scalar value.
pub type SqlRow = HashMap<String, Value>;

/// Errors from the execution layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecError {
    /// The named interface does not exist in the active configuration.
    UnknownInterface(String),
    /// The named SQL definition does not exist in the active configuration.
    UnknownSql(String),
    /// The HTTP collaborator failed.
    Transport(String),
    /// The SQL collaborator failed.
    Sql(String),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::UnknownInterface(name) => write!(f, "Unknown interface: {}", name),
            ExecError::UnknownSql(name) => write!(f, "Unknown SQL definition: {}", name),
            ExecError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ExecError::Sql(msg) => write!(f, "SQL error: {}", msg),
        }
    }
}

impl std::error::Error for ExecError {}

/// HTTP transport collaborator. Receives a fully resolved request and
/// returns the raw exchange result; the optional encrypt/decrypt hops are
/// the implementor's concern.
pub trait HttpExecutor {
    fn execute(&mut self, request: &ResolvedRequest) -> Result<ExchangeResponse, ExecError>;
}

/// SQL collaborator. Receives an already template-resolved SELECT statement
/// and the opaque connection spec from the configuration.
pub trait SqlExecutor {
    fn query(&mut self, spec: &SqlSpec, statement: &str) -> Result<Vec<SqlRow>, ExecError>;
}

/// Runs one interface end to end: prepare, execute, apply the response.
///
/// The response is applied through the session's staleness check, so a
/// completion arriving after a newer request was prepared leaves the pool
/// untouched; the raw response is still returned for display.
pub fn run_interface(
    session: &mut Session,
    executor: &mut dyn HttpExecutor,
    interface_name: &str,
) -> Result<ExchangeResponse, ExecError> {
    let request = session
        .prepare_request(interface_name)
        .ok_or_else(|| ExecError::UnknownInterface(interface_name.to_string()))?;

    let response = executor.execute(&request)?;
    let _ = session.apply_response(interface_name, request.generation, &response);
    Ok(response)
}

/// Runs one SQL definition: resolve the statement, query, write declared
/// output columns into the pool. Returns the row count.
pub fn run_sql(
    session: &mut Session,
    executor: &mut dyn SqlExecutor,
    sql_name: &str,
) -> Result<usize, ExecError> {
    let spec = session
        .config()
        .sqls
        .get(sql_name)
        .cloned()
        .ok_or_else(|| ExecError::UnknownSql(sql_name.to_string()))?;

    let statement = template::resolve(&spec.statement, &session.context());
    let rows = executor.query(&spec, &statement)?;
    session.apply_sql_rows(sql_name, &rows);
    Ok(rows.len())
}
