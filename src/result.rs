use std::marker::PhantomData;

use serde_json::Value;
use surreal_types::RecordId;
use tracing::{debug, Span};

use crate::error::{DriverError, DriverResult};
use crate::protocol::ClassifiedResponse;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

/// 64-bit FNV-1a.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET_BASIS;
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Stable integer stand-in for a record id, hashed from its canonical text.
pub fn surrogate_id(id: &RecordId) -> i64 {
    fnv1a_64(id.to_string().as_bytes()) as i64
}

/// Summary of a write, computed on demand from the response.
#[derive(Debug)]
pub struct ExecResult<'conn> {
    response: ClassifiedResponse,
    span: Span,
    _conn: PhantomData<&'conn mut ()>,
}

impl<'conn> ExecResult<'conn> {
    pub fn new(response: ClassifiedResponse) -> Self {
        Self::with_span(response, Span::none())
    }

    pub fn with_span(response: ClassifiedResponse, span: Span) -> Self {
        Self {
            response,
            span,
            _conn: PhantomData,
        }
    }

    pub fn response(&self) -> &ClassifiedResponse {
        &self.response
    }

    pub fn into_response(self) -> ClassifiedResponse {
        self.response
    }

    /// Number of records touched. Failed statements count for nothing.
    pub fn rows_affected(&self) -> u64 {
        match &self.response {
            ClassifiedResponse::QueryBatch(statements) => statements
                .iter()
                .filter(|s| s.is_ok())
                .map(|s| payload_count(&s.payload))
                .sum(),
            ClassifiedResponse::MultiRecord(rows) => rows.len() as u64,
            ClassifiedResponse::SingleRecord(_) | ClassifiedResponse::Relation(_) => 1,
            ClassifiedResponse::Scalar(value) => payload_count(value),
            ClassifiedResponse::Void => 0,
        }
    }

    /// The last record id present in the response.
    pub fn last_record_id(&self) -> DriverResult<RecordId> {
        let value = match &self.response {
            ClassifiedResponse::Relation(rel) => return Ok(rel.id.clone()),
            ClassifiedResponse::MultiRecord(rows) => rows.iter().rev().find_map(|map| string_id(map.get("id"))),
            ClassifiedResponse::SingleRecord(map) => string_id(map.get("id")),
            ClassifiedResponse::QueryBatch(statements) => statements
                .iter()
                .rev()
                .filter(|s| s.is_ok())
                .find_map(|s| payload_id(&s.payload)),
            ClassifiedResponse::Scalar(_) | ClassifiedResponse::Void => None,
        };

        match value.and_then(RecordId::from_json) {
            Some(parsed) => Ok(parsed?),
            None => Err(DriverError::NoInsertId),
        }
    }

    /// FNV-1a surrogate of [`last_record_id`](Self::last_record_id).
    pub fn last_insert_id(&self) -> DriverResult<i64> {
        let _enter = self.span.enter();
        let id = self.last_record_id()?;
        let surrogate = surrogate_id(&id);
        debug!(record = %id, surrogate, "Derived insert id");
        Ok(surrogate)
    }

    pub fn statement_errors(&self) -> Vec<DriverError> {
        self.response.statement_errors()
    }

    /// Fail with the first failed statement, if any.
    pub fn check(&self) -> DriverResult<()> {
        match self.statement_errors().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn payload_count(value: &Value) -> u64 {
    match value {
        Value::Array(items) => items.iter().filter(|item| item.is_object()).count() as u64,
        // A null payload is a statement that touched nothing (LET, DEFINE,
        // an empty UPDATE), not a scalar row, so it counts 0.
        Value::Null => 0,
        _ => 1,
    }
}

fn payload_id(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items
            .iter()
            .rev()
            .find_map(|item| item.as_object().and_then(|map| string_id(map.get("id")))),
        Value::Object(map) => string_id(map.get("id")),
        _ => None,
    }
}

fn string_id(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| v.is_string())
}
