use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use surreal_types::{parse_duration, RecordId};

use crate::error::DriverError;

/// A response frame before classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl RawResponse {
    /// Correlation id as text. Numeric ids are accepted.
    pub fn correlation_id(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Live query notifications carry no id and an `action` in the result.
    pub fn is_notification(&self) -> bool {
        self.correlation_id().is_none()
            && matches!(&self.result, Some(Value::Object(m)) if m.contains_key("action"))
    }

    /// The server-reported error, if the `error` field is present and non-empty.
    pub fn api_error(&self) -> Option<DriverError> {
        match &self.error {
            None | Some(Value::Null) => None,
            Some(Value::Object(m)) if m.is_empty() => None,
            Some(Value::Object(m)) => Some(DriverError::Api {
                code: m.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: match m.get("message") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                },
            }),
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(DriverError::Api {
                code: 0,
                message: s.clone(),
            }),
            Some(other) => Some(DriverError::Api {
                code: 0,
                message: other.to_string(),
            }),
        }
    }
}

/// Outcome tag of one statement in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatementStatus {
    Ok,
    Err(String),
}

impl From<String> for StatementStatus {
    fn from(s: String) -> Self {
        if s == "OK" {
            StatementStatus::Ok
        } else {
            StatementStatus::Err(s)
        }
    }
}

impl From<StatementStatus> for String {
    fn from(status: StatementStatus) -> Self {
        match status {
            StatementStatus::Ok => "OK".to_string(),
            StatementStatus::Err(tag) => tag,
        }
    }
}

impl fmt::Display for StatementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementStatus::Ok => f.write_str("OK"),
            StatementStatus::Err(tag) => f.write_str(tag),
        }
    }
}

/// Result of one statement of a `query` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    pub status: StatementStatus,
    #[serde(default)]
    pub time: String,
    #[serde(default, rename = "result")]
    pub payload: Value,
}

impl StatementResult {
    pub fn is_ok(&self) -> bool {
        self.status == StatementStatus::Ok
    }

    /// Server-side execution time, if it parses.
    pub fn elapsed(&self) -> Option<Duration> {
        parse_duration(&self.time)
    }

    /// For failed statements the payload holds the error text.
    pub fn error_message(&self) -> Option<String> {
        if self.is_ok() {
            return None;
        }
        Some(match &self.payload {
            Value::String(s) => s.clone(),
            Value::Null => self.status.to_string(),
            other => other.to_string(),
        })
    }

    pub(crate) fn to_error(&self, index: usize) -> Option<DriverError> {
        self.error_message()
            .map(|message| DriverError::Statement { index, message })
    }
}

/// A created or inserted graph edge.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationOutcome {
    pub id: RecordId,
    pub in_id: RecordId,
    pub out_id: RecordId,
    /// Every field other than `id`, `in` and `out`.
    pub extra: Map<String, Value>,
}

/// A response reduced to the shape its method promises.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedResponse {
    /// One entry per statement, in statement order.
    QueryBatch(Vec<StatementResult>),
    SingleRecord(Map<String, Value>),
    MultiRecord(Vec<Map<String, Value>>),
    Relation(RelationOutcome),
    Scalar(Value),
    Void,
}

impl ClassifiedResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedResponse::QueryBatch(_) => "query_batch",
            ClassifiedResponse::SingleRecord(_) => "single_record",
            ClassifiedResponse::MultiRecord(_) => "multi_record",
            ClassifiedResponse::Relation(_) => "relation",
            ClassifiedResponse::Scalar(_) => "scalar",
            ClassifiedResponse::Void => "void",
        }
    }

    /// Errors of every failed statement in a batch.
    pub fn statement_errors(&self) -> Vec<DriverError> {
        match self {
            ClassifiedResponse::QueryBatch(statements) => statements
                .iter()
                .enumerate()
                .filter_map(|(index, statement)| statement.to_error(index))
                .collect(),
            _ => Vec::new(),
        }
    }
}
