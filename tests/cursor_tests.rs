//! Row Cursor Tests
//!
//! Tests for reading classified responses as rows:
//! - Column derivation per response shape
//! - Multi-statement iteration with failed statements
//! - Exhaustion and column stability

use serde_json::{json, Value};
use surreal_sql::{classify, ClassifiedResponse, CursorState, DriverError, Rows, SqlValue};

fn rows_for(method: &str, value: Value) -> Rows<'static> {
    let raw = serde_json::to_vec(&value).unwrap();
    Rows::new(classify(method, &raw).unwrap())
}

fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

// ============================================================================
// Single Response Shapes
// ============================================================================

#[test]
fn test_select_rows() {
    let mut rows = rows_for(
        "select",
        json!({"id": "x", "result": [{"id": "books:eragon", "title": "The Eragon Book"}]}),
    );

    assert_eq!(rows.columns(), ["id", "title"]);
    assert_eq!(
        rows.next_row().unwrap(),
        Some(vec![text("books:eragon"), text("The Eragon Book")])
    );
    assert_eq!(rows.next_row().unwrap(), None);
}

#[test]
fn test_columns_are_sorted_union() {
    let mut rows = rows_for(
        "select",
        json!({"id": "x", "result": [
            {"title": "A", "id": "books:a"},
            {"id": "books:b", "Author": "Paolini", "pages": 509}
        ]}),
    );

    assert_eq!(rows.columns(), ["Author", "id", "pages", "title"]);
    assert_eq!(
        rows.next_row().unwrap(),
        Some(vec![SqlValue::Null, text("books:a"), SqlValue::Null, text("A")])
    );
    assert_eq!(
        rows.next_row().unwrap(),
        Some(vec![text("Paolini"), text("books:b"), SqlValue::Int(509), SqlValue::Null])
    );
}

#[test]
fn test_column_stability_across_rows() {
    let mut rows = rows_for(
        "select",
        json!({"id": "x", "result": [
            {"id": "books:a", "title": "A", "year": 2002},
            {"id": "books:b"}
        ]}),
    );

    let first = rows.columns().to_vec();
    rows.next_row().unwrap();
    assert_eq!(rows.columns(), first.as_slice());
    let second = rows.next_row().unwrap().unwrap();
    assert_eq!(rows.columns(), first.as_slice());
    assert_eq!(second, vec![text("books:b"), SqlValue::Null, SqlValue::Null]);
}

#[test]
fn test_single_record_is_one_row() {
    let mut rows = rows_for(
        "update",
        json!({"id": "x", "result": {"id": "books:a", "title": "Eldest", "meta": {"isbn": "x"}}}),
    );

    assert_eq!(rows.columns(), ["id", "meta", "title"]);
    let row = rows.next_row().unwrap().unwrap();
    assert_eq!(row[1], SqlValue::Bytes(br#"{"isbn":"x"}"#.to_vec()));
    assert_eq!(rows.next_row().unwrap(), None);
}

#[test]
fn test_relation_columns() {
    let mut rows = rows_for(
        "relate",
        json!({"id": "x", "result": {
            "weight": 0.5,
            "out": "books:eragon",
            "id": "wrote:⟨first-edition⟩",
            "in": "person:christopher",
            "at": "2002-08-26T00:00:00Z"
        }}),
    );

    assert_eq!(rows.columns(), ["id", "in", "out", "at", "weight"]);
    let row = rows.next_row().unwrap().unwrap();
    assert_eq!(row[0], text("wrote:⟨first-edition⟩"));
    assert_eq!(row[1], text("person:christopher"));
    assert_eq!(row[2], text("books:eragon"));
    assert!(matches!(row[3], SqlValue::Timestamp(_)));
    assert_eq!(row[4], SqlValue::Float(0.5));
}

#[test]
fn test_scalar_value_column() {
    let mut rows = rows_for("version", json!({"id": "x", "result": "surrealdb-2.1.0"}));
    assert_eq!(rows.columns(), ["value"]);
    assert_eq!(rows.next_row().unwrap(), Some(vec![text("surrealdb-2.1.0")]));
    assert_eq!(rows.next_row().unwrap(), None);
}

#[test]
fn test_void_has_value_column_and_no_rows() {
    let mut rows = rows_for("use", json!({"id": "x", "result": null}));
    assert_eq!(rows.columns(), ["value"]);
    assert_eq!(rows.next_row().unwrap(), None);
}

#[test]
fn test_empty_select() {
    let mut rows = rows_for("select", json!({"id": "x", "result": []}));
    assert!(rows.columns().is_empty());
    assert_eq!(rows.next_row().unwrap(), None);
}

// ============================================================================
// Query Batches
// ============================================================================

#[test]
fn test_failed_statement_reported_at_its_position() {
    let mut rows = rows_for(
        "query",
        json!({"id": "x", "result": [{"status": "ERR", "result": "field required", "time": "1ms"}]}),
    );

    match rows.next_row() {
        Err(DriverError::Statement { index, message }) => {
            assert_eq!(index, 0);
            assert_eq!(message, "field required");
        }
        other => panic!("Expected statement error, got {:?}", other),
    }
    assert_eq!(rows.next_row().unwrap(), None);
}

#[test]
fn test_iteration_continues_after_failed_statement() {
    let mut rows = rows_for(
        "query",
        json!({"id": "x", "result": [
            {"status": "OK", "time": "1ms", "result": [{"id": "a:1", "n": 1}, {"id": "a:2", "n": 2}]},
            {"status": "ERR", "time": "1ms", "result": "boom"},
            {"status": "OK", "time": "1ms", "result": {"count": 2}}
        ]}),
    );

    assert_eq!(rows.columns(), ["id", "n"]);
    assert_eq!(rows.next_row().unwrap(), Some(vec![text("a:1"), SqlValue::Int(1)]));
    assert_eq!(rows.next_row().unwrap(), Some(vec![text("a:2"), SqlValue::Int(2)]));
    assert_eq!(rows.statement_index(), 0);

    assert!(matches!(
        rows.next_row(),
        Err(DriverError::Statement { index: 1, .. })
    ));

    assert_eq!(rows.next_row().unwrap(), Some(vec![SqlValue::Int(2)]));
    assert_eq!(rows.statement_index(), 2);
    assert_eq!(rows.columns(), ["count"]);
    assert_eq!(rows.next_row().unwrap(), None);
}

#[test]
fn test_positional_columns_for_bare_array() {
    let mut rows = rows_for(
        "query",
        json!({"id": "x", "result": [{"status": "OK", "time": "1ms", "result": [1, "two", 3.5]}]}),
    );

    assert_eq!(rows.columns(), ["0", "1", "2"]);
    assert_eq!(
        rows.next_row().unwrap(),
        Some(vec![SqlValue::Int(1), text("two"), SqlValue::Float(3.5)])
    );
    assert_eq!(rows.next_row().unwrap(), None);
}

#[test]
fn test_iterator_collects_errors_in_place() {
    let rows = rows_for(
        "query",
        json!({"id": "x", "result": [
            {"status": "OK", "time": "1ms", "result": 1},
            {"status": "ERR", "time": "1ms", "result": "nope"},
            {"status": "OK", "time": "1ms", "result": 3}
        ]}),
    );

    let results: Vec<_> = rows.collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap(), &vec![SqlValue::Int(3)]);
}

// ============================================================================
// Exhaustion
// ============================================================================

#[test]
fn test_exhaustion_is_idempotent() {
    let mut rows = rows_for("select", json!({"id": "x", "result": [{"id": "a:1"}]}));
    rows.next_row().unwrap();

    for _ in 0..5 {
        assert_eq!(rows.next_row().unwrap(), None);
        assert_eq!(rows.state(), CursorState::Exhausted);
    }
    assert!(rows.columns().is_empty());
}

#[test]
fn test_empty_batch() {
    let mut rows = Rows::new(ClassifiedResponse::QueryBatch(Vec::new()));
    assert!(rows.columns().is_empty());
    assert_eq!(rows.next_row().unwrap(), None);
    assert_eq!(rows.next_row().unwrap(), None);
}
