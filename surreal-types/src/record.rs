//! Record links that may or may not have been fetched.
//!
//! A field pointing at another record arrives either as the bare id string
//! (not fetched) or as the full document (fetched). [`Record`] keeps the two
//! cases apart instead of carrying "has id" / "has data" flags.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ValueError;
use crate::record_id::RecordId;

#[derive(Debug, Clone, PartialEq)]
pub enum Record<T> {
    /// Only the id is known.
    Unresolved(RecordId),
    /// The linked document itself.
    Resolved(T),
}

/// A list of record links, as returned for array-valued link fields.
pub type Records<T> = Vec<Record<T>>;

impl<T> Record<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Record::Resolved(_))
    }

    /// The id of an unresolved link.
    pub fn id(&self) -> Option<&RecordId> {
        match self {
            Record::Unresolved(id) => Some(id),
            Record::Resolved(_) => None,
        }
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Record::Resolved(data) => Some(data),
            Record::Unresolved(_) => None,
        }
    }

    pub fn into_resolved(self) -> Option<T> {
        match self {
            Record::Resolved(data) => Some(data),
            Record::Unresolved(_) => None,
        }
    }
}

impl<T: DeserializeOwned> Record<T> {
    /// Decode a single link from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::String(text) => Ok(Record::Unresolved(RecordId::parse(&text)?)),
            Value::Array(_) => Err(ValueError::TypeError(
                "expected a single record, got an array".to_string(),
            )),
            other => Ok(Record::Resolved(serde_json::from_value(other)?)),
        }
    }
}

/// Decode an array of links.
pub fn decode_records<T: DeserializeOwned>(value: Value) -> Result<Records<T>, ValueError> {
    match value {
        Value::Array(items) => items.into_iter().map(Record::from_value).collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(ValueError::TypeError(
            "expected an array of records".to_string(),
        )),
    }
}

impl<T: Serialize> Serialize for Record<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Record::Unresolved(id) => id.serialize(serializer),
            Record::Resolved(data) => data.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Record<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Record::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_id::IdKey;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Book {
        id: RecordId,
        title: String,
    }

    #[test]
    fn test_unresolved_from_string() {
        let record: Record<Book> = serde_json::from_value(json!("books:eragon")).unwrap();
        assert!(!record.is_resolved());
        let id = record.id().unwrap();
        assert_eq!(id.table, "books");
        assert_eq!(id.key, IdKey::String("eragon".to_string()));
    }

    #[test]
    fn test_resolved_from_object() {
        let record: Record<Book> =
            serde_json::from_value(json!({"id": "books:eragon", "title": "Eragon"})).unwrap();
        assert!(record.is_resolved());
        assert!(record.id().is_none());
        assert_eq!(record.resolved().unwrap().title, "Eragon");
    }

    #[test]
    fn test_array_is_rejected_for_single() {
        let result = Record::<Book>::from_value(json!(["books:a"]));
        assert!(matches!(result, Err(ValueError::TypeError(_))));
    }

    #[test]
    fn test_serialize_both_forms() {
        let unresolved: Record<Book> = Record::Unresolved(RecordId::parse("books:a").unwrap());
        assert_eq!(serde_json::to_value(&unresolved).unwrap(), json!("books:a"));

        let resolved = Record::Resolved(Book {
            id: RecordId::parse("books:b").unwrap(),
            title: "B".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&resolved).unwrap(),
            json!({"id": "books:b", "title": "B"})
        );
    }

    #[test]
    fn test_decode_mixed_records() {
        let records: Records<Book> = decode_records(json!([
            "books:a",
            {"id": "books:b", "title": "B"}
        ]))
        .unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].is_resolved());
        assert!(records[1].is_resolved());

        assert!(decode_records::<Book>(Value::Null).unwrap().is_empty());
        assert!(decode_records::<Book>(json!({"id": "books:a"})).is_err());
    }
}
