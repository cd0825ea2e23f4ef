//! surreal-types - transport-independent building blocks for the SurrealDB SQL adapter.
//!
//! This crate holds the pieces that never touch a socket:
//!
//! - **Record ids**: parsing and printing `table:identifier` keys in all their encodings
//! - **Record links**: [`Record<T>`], either an unresolved id or the fetched document
//! - **Values**: conversion of JSON leaves into SQL-style scalars
//!
//! # Example
//!
//! ```rust
//! use surreal_types::{IdKey, RecordId, SqlValue};
//! use serde_json::json;
//!
//! let id = RecordId::parse("user:⟨abc-def⟩").unwrap();
//! assert_eq!(id.table, "user");
//! assert_eq!(id.key, IdKey::Raw("abc-def".to_string()));
//! assert_eq!(id.to_string(), "user:⟨abc-def⟩");
//!
//! assert_eq!(SqlValue::from_json(&json!(7)), SqlValue::Int(7));
//! ```

pub mod error;
pub mod record;
pub mod record_id;
pub mod value;

pub use error::{IdFormatError, IdResult, ValueError};
pub use record::{decode_records, Record, Records};
pub use record_id::{IdGenerator, IdKey, RecordId, RAW_CLOSE, RAW_OPEN};
pub use value::{parse_duration, SqlValue};
