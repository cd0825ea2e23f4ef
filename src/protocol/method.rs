use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// RPC methods understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Version,
    Use,
    Signup,
    Signin,
    Authenticate,
    Invalidate,
    Info,
    Let,
    Unset,
    Live,
    Kill,
    Query,
    Graphql,
    Select,
    Create,
    Insert,
    Merge,
    Patch,
    InsertRelation,
    Relate,
    Update,
    Upsert,
    Delete,
    Run,
}

impl Method {
    pub const ALL: [Method; 24] = [
        Method::Version,
        Method::Use,
        Method::Signup,
        Method::Signin,
        Method::Authenticate,
        Method::Invalidate,
        Method::Info,
        Method::Let,
        Method::Unset,
        Method::Live,
        Method::Kill,
        Method::Query,
        Method::Graphql,
        Method::Select,
        Method::Create,
        Method::Insert,
        Method::Merge,
        Method::Patch,
        Method::InsertRelation,
        Method::Relate,
        Method::Update,
        Method::Upsert,
        Method::Delete,
        Method::Run,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Version => "version",
            Method::Use => "use",
            Method::Signup => "signup",
            Method::Signin => "signin",
            Method::Authenticate => "authenticate",
            Method::Invalidate => "invalidate",
            Method::Info => "info",
            Method::Let => "let",
            Method::Unset => "unset",
            Method::Live => "live",
            Method::Kill => "kill",
            Method::Query => "query",
            Method::Graphql => "graphql",
            Method::Select => "select",
            Method::Create => "create",
            Method::Insert => "insert",
            Method::Merge => "merge",
            Method::Patch => "patch",
            Method::InsertRelation => "insert_relation",
            Method::Relate => "relate",
            Method::Update => "update",
            Method::Upsert => "upsert",
            Method::Delete => "delete",
            Method::Run => "run",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| DriverError::classification(s, "unknown method"))
    }
}
