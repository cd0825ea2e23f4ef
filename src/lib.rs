//! surreal-sql - a SQL-style client adapter for the SurrealDB RPC protocol.
//!
//! Responses carry no type tags, so every response is first classified by
//! the method that produced it, then consumed either as rows
//! ([`Rows`], `columns()`/`next_row()`) or as a write summary
//! ([`ExecResult`], `rows_affected()`/`last_insert_id()`).
//!
//! ```rust
//! use surreal_sql::{classify, Rows};
//!
//! let raw = br#"{"id":"x","result":[{"id":"books:eragon","title":"The Eragon Book"}]}"#;
//! let mut rows = Rows::new(classify("select", raw).unwrap());
//! assert_eq!(rows.columns(), ["id", "title"]);
//! assert!(rows.next_row().unwrap().is_some());
//! assert!(rows.next_row().unwrap().is_none());
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod result;
pub mod rows;

pub use config::{AuthMethod, ConnectionConfig, Credentials};
pub use connection::{positional_vars, Connection, Statement, Transport, WsTransport};
pub use error::{DriverError, DriverResult};
pub use protocol::{
    classify, classify_method, ClassifiedResponse, Method, RelationOutcome, Request,
    StatementResult, StatementStatus, Vars,
};
pub use result::{fnv1a_64, surrogate_id, ExecResult};
pub use rows::{CursorState, Rows, VALUE_COLUMN};

pub use surreal_types::{IdFormatError, IdKey, Record, RecordId, Records, SqlValue};
