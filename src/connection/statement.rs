use serde_json::Value;

use super::{positional_vars, Connection, Transport};
use crate::error::DriverResult;
use crate::protocol::Vars;
use crate::result::ExecResult;
use crate::rows::Rows;

/// SQL text bound to a connection, run with fresh variables each time.
pub struct Statement<'c, T: Transport> {
    conn: &'c mut Connection<T>,
    sql: String,
}

impl<'c, T: Transport> Statement<'c, T> {
    pub(super) fn new(conn: &'c mut Connection<T>, sql: &str) -> Self {
        Self {
            conn,
            sql: sql.to_string(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub async fn query(&mut self, vars: Vars) -> DriverResult<Rows<'_>> {
        self.conn.query(&self.sql, vars).await
    }

    pub async fn query_args(&mut self, args: &[Value]) -> DriverResult<Rows<'_>> {
        self.conn.query(&self.sql, positional_vars(args)).await
    }

    pub async fn exec(&mut self, vars: Vars) -> DriverResult<ExecResult<'_>> {
        self.conn.exec(&self.sql, vars).await
    }

    pub async fn exec_args(&mut self, args: &[Value]) -> DriverResult<ExecResult<'_>> {
        self.conn.exec(&self.sql, positional_vars(args)).await
    }
}
