//! Error types for surreal-types.
//!
//! Kept free of transport concerns so the codec can be used on its own.

use thiserror::Error;

/// A record identifier could not be split into `table:identifier`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdFormatError {
    #[error("Invalid record id '{0}': missing ':' separator")]
    MissingSeparator(String),

    #[error("Invalid record id '{0}': empty table name")]
    EmptyTable(String),

    #[error("Invalid record id '{0}': empty identifier")]
    EmptyIdentifier(String),
}

/// Failure while decoding a typed record payload.
#[derive(Error, Debug)]
pub enum ValueError {
    #[error("Id error: {0}")]
    Id(#[from] IdFormatError),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Type error: {0}")]
    TypeError(String),
}

/// Result type for identifier parsing
pub type IdResult<T> = Result<T, IdFormatError>;

impl serde::Serialize for IdFormatError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
