use std::time::Duration;

use surreal_types::IdFormatError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// Malformed or unexpected frame. Fatal to the call, not the connection.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Failure reported by the server in the `error` field.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// One statement of a batched query failed.
    #[error("Statement {index} failed: {message}")]
    Statement { index: usize, message: String },

    #[error("Id error: {0}")]
    IdFormat(#[from] IdFormatError),

    /// Method and response shape do not fit together.
    #[error("Classification error for '{method}': {reason}")]
    Classification { method: String, reason: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("No insert id in response")]
    NoInsertId,

    #[error("Timed out after {0:?}, connection invalidated")]
    Timeout(Duration),

    #[error("Connection is no longer usable: {0}")]
    InvalidConnection(String),

    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),
}

pub type DriverResult<T> = Result<T, DriverError>;

impl DriverError {
    pub(crate) fn classification(method: impl ToString, reason: impl Into<String>) -> Self {
        DriverError::Classification {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the underlying connection can still be used after this error.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            DriverError::Connection(_) | DriverError::Timeout(_) | DriverError::InvalidConnection(_)
        )
    }
}

impl serde::Serialize for DriverError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
