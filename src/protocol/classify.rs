//! Method-driven response classification.
//!
//! The wire carries no type tags, so the shape a response is read as is
//! decided by the method that produced it. Payload shape only matters
//! inside the family a method belongs to.

use serde_json::{Map, Value};
use surreal_types::RecordId;

use super::codec::decode_response;
use super::method::Method;
use super::response::{ClassifiedResponse, RawResponse, RelationOutcome, StatementResult};
use crate::error::{DriverError, DriverResult};

/// Classify a raw frame produced by the method named `method`.
pub fn classify(method: &str, raw: &[u8]) -> DriverResult<ClassifiedResponse> {
    let method: Method = method.parse()?;
    classify_method(method, raw)
}

pub fn classify_method(method: Method, raw: &[u8]) -> DriverResult<ClassifiedResponse> {
    let response = decode_response(raw)?;
    classify_response(method, response)
}

/// Classify an already decoded frame. A server error wins over any result.
pub fn classify_response(method: Method, response: RawResponse) -> DriverResult<ClassifiedResponse> {
    if let Some(err) = response.api_error() {
        return Err(err);
    }

    let result = response.result.unwrap_or(Value::Null);

    match method {
        Method::Query => query_batch(result),
        Method::Select | Method::Create | Method::Insert | Method::Merge | Method::Patch => {
            record_list(method, result).map(ClassifiedResponse::MultiRecord)
        }
        Method::Update | Method::Upsert | Method::Delete => match result {
            Value::Object(map) => Ok(ClassifiedResponse::SingleRecord(map)),
            other => record_list(method, other).map(ClassifiedResponse::MultiRecord),
        },
        Method::Relate | Method::InsertRelation => relation(method, result),
        Method::Version
        | Method::Info
        | Method::Signin
        | Method::Signup
        | Method::Authenticate
        | Method::Run
        | Method::Graphql
        | Method::Live => Ok(ClassifiedResponse::Scalar(result)),
        Method::Use | Method::Let | Method::Unset | Method::Invalidate | Method::Kill => {
            Ok(ClassifiedResponse::Void)
        }
    }
}

fn query_batch(result: Value) -> DriverResult<ClassifiedResponse> {
    let items = match result {
        Value::Array(items) => items,
        other => {
            return Err(DriverError::classification(
                Method::Query,
                format!("expected an array of statement results, got {}", json_kind(&other)),
            ))
        }
    };

    let statements = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<StatementResult>(item).map_err(|e| {
                DriverError::classification(
                    Method::Query,
                    format!("statement {} is malformed: {}", index, e),
                )
            })
        })
        .collect::<DriverResult<Vec<_>>>()?;

    Ok(ClassifiedResponse::QueryBatch(statements))
}

/// An array of objects. A lone object is one element, null is none.
fn record_list(method: Method, result: Value) -> DriverResult<Vec<Map<String, Value>>> {
    match result {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(DriverError::classification(
                    method,
                    format!("element {} is {}, expected an object", index, json_kind(&other)),
                )),
            })
            .collect(),
        Value::Object(map) => Ok(vec![map]),
        Value::Null => Ok(Vec::new()),
        other => Err(DriverError::classification(
            method,
            format!("expected records, got {}", json_kind(&other)),
        )),
    }
}

fn relation(method: Method, result: Value) -> DriverResult<ClassifiedResponse> {
    let mut map = match result {
        Value::Object(map) => map,
        Value::Array(mut items) if items.len() == 1 => match items.pop() {
            Some(Value::Object(map)) => map,
            _ => {
                return Err(DriverError::classification(
                    method,
                    "expected a relation object",
                ))
            }
        },
        other => {
            return Err(DriverError::classification(
                method,
                format!("expected a relation object, got {}", json_kind(&other)),
            ))
        }
    };

    let id = take_record_id(method, &mut map, "id")?;
    let in_id = take_record_id(method, &mut map, "in")?;
    let out_id = take_record_id(method, &mut map, "out")?;

    Ok(ClassifiedResponse::Relation(RelationOutcome {
        id,
        in_id,
        out_id,
        extra: map,
    }))
}

fn take_record_id(
    method: Method,
    map: &mut Map<String, Value>,
    field: &str,
) -> DriverResult<RecordId> {
    match map.remove(field) {
        Some(value) => match RecordId::from_json(&value) {
            Some(parsed) => Ok(parsed?),
            None => Err(DriverError::classification(
                method,
                format!("field '{}' is {}, expected a record id", field, json_kind(&value)),
            )),
        },
        None => Err(DriverError::classification(
            method,
            format!("relation is missing '{}'", field),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
