//! Row cursor over a classified response.
//!
//! Rows are produced lazily from the response the cursor owns. A `query`
//! batch is walked statement by statement; each statement gets its own
//! column list, computed the first time it is needed and kept until the
//! cursor moves to the next statement.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use serde_json::{Map, Value};
use surreal_types::SqlValue;
use tracing::{debug, trace, Span};

use crate::error::{DriverError, DriverResult};
use crate::protocol::{ClassifiedResponse, RelationOutcome, StatementResult};

/// Column used for scalar and void results.
pub const VALUE_COLUMN: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    AtStatement,
    AtEntry,
    Exhausted,
}

/// Cursor over the rows of one response.
///
/// Borrows the connection that produced it, so no further request can be
/// issued while it is alive.
#[derive(Debug)]
pub struct Rows<'conn> {
    response: ClassifiedResponse,
    statement: usize,
    row: usize,
    state: CursorState,
    cache: Option<StatementCache>,
    span: Span,
    _conn: PhantomData<&'conn mut ()>,
}

#[derive(Debug)]
struct StatementCache {
    statement: usize,
    layout: Layout,
    columns: Vec<String>,
}

/// How a payload maps onto rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Failed,
    /// One row per object, columns are keys.
    Keyed,
    /// One row per inner array, columns are positions.
    Tuples,
    /// The whole array is one row, columns are positions.
    Positional,
    Single,
    Relation,
    Empty,
}

enum Segment<'a> {
    Failed(&'a StatementResult),
    Payload(&'a Value),
    Records(&'a [Map<String, Value>]),
    Record(&'a Map<String, Value>),
    Relation(&'a RelationOutcome),
    Scalar(&'a Value),
    Void,
}

enum Step {
    Row(Vec<SqlValue>),
    Failed(String),
    Advance,
    Done,
}

impl<'conn> Rows<'conn> {
    pub fn new(response: ClassifiedResponse) -> Self {
        Self::with_span(response, Span::none())
    }

    pub fn with_span(response: ClassifiedResponse, span: Span) -> Self {
        let state = if segment_count(&response) == 0 {
            CursorState::Exhausted
        } else {
            CursorState::AtStatement
        };

        Self {
            response,
            statement: 0,
            row: 0,
            state,
            cache: None,
            span,
            _conn: PhantomData,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Index of the statement the cursor is positioned on.
    pub fn statement_index(&self) -> usize {
        self.statement
    }

    pub fn statement_count(&self) -> usize {
        segment_count(&self.response)
    }

    pub fn response(&self) -> &ClassifiedResponse {
        &self.response
    }

    pub fn into_response(self) -> ClassifiedResponse {
        self.response
    }

    /// Column names for the current statement. Empty when there is no data.
    pub fn columns(&mut self) -> &[String] {
        if self.state == CursorState::Exhausted {
            return &[];
        }
        self.ensure_cache();
        match &self.cache {
            Some(cache) => &cache.columns,
            None => &[],
        }
    }

    /// Read the next row, one value per column.
    ///
    /// A failed statement yields its error once, then iteration continues
    /// with the statement after it. Once `Ok(None)` is returned every later
    /// call returns it too.
    pub fn next_row(&mut self) -> DriverResult<Option<Vec<SqlValue>>> {
        let span = self.span.clone();
        let _enter = span.enter();

        loop {
            if self.state == CursorState::Exhausted {
                return Ok(None);
            }
            self.ensure_cache();

            let step = match (segment_at(&self.response, self.statement), &self.cache) {
                (Some(Segment::Failed(statement)), _) => {
                    Step::Failed(statement.error_message().unwrap_or_default())
                }
                (Some(segment), Some(cache)) => {
                    if self.row < row_count(&segment, cache.layout) {
                        Step::Row(row_values(&segment, cache.layout, self.row, &cache.columns))
                    } else {
                        Step::Advance
                    }
                }
                _ => Step::Done,
            };

            match step {
                Step::Row(values) => {
                    self.row += 1;
                    self.state = CursorState::AtEntry;
                    return Ok(Some(values));
                }
                Step::Failed(message) => {
                    let index = self.statement;
                    debug!(statement = index, "Statement failed: {}", message);
                    self.advance();
                    return Err(DriverError::Statement { index, message });
                }
                Step::Advance => self.advance(),
                Step::Done => {
                    self.state = CursorState::Exhausted;
                    return Ok(None);
                }
            }
        }
    }

    fn advance(&mut self) {
        self.statement += 1;
        self.row = 0;
        self.state = if self.statement < segment_count(&self.response) {
            CursorState::AtStatement
        } else {
            CursorState::Exhausted
        };
        trace!(statement = self.statement, state = ?self.state, "Cursor advanced");
    }

    fn ensure_cache(&mut self) {
        if matches!(&self.cache, Some(cache) if cache.statement == self.statement) {
            return;
        }

        let statement = self.statement;
        self.cache = segment_at(&self.response, statement).map(|segment| {
            let layout = layout_of(&segment);
            StatementCache {
                statement,
                layout,
                columns: columns_of(&segment, layout),
            }
        });
    }
}

impl Iterator for Rows<'_> {
    type Item = DriverResult<Vec<SqlValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

fn segment_count(response: &ClassifiedResponse) -> usize {
    match response {
        ClassifiedResponse::QueryBatch(statements) => statements.len(),
        _ => 1,
    }
}

fn segment_at(response: &ClassifiedResponse, index: usize) -> Option<Segment<'_>> {
    match response {
        ClassifiedResponse::QueryBatch(statements) => statements.get(index).map(|s| {
            if s.is_ok() {
                Segment::Payload(&s.payload)
            } else {
                Segment::Failed(s)
            }
        }),
        _ if index > 0 => None,
        ClassifiedResponse::MultiRecord(rows) => Some(Segment::Records(rows)),
        ClassifiedResponse::SingleRecord(map) => Some(Segment::Record(map)),
        ClassifiedResponse::Relation(rel) => Some(Segment::Relation(rel)),
        ClassifiedResponse::Scalar(value) => Some(Segment::Scalar(value)),
        ClassifiedResponse::Void => Some(Segment::Void),
    }
}

fn layout_of(segment: &Segment<'_>) -> Layout {
    match segment {
        Segment::Failed(_) => Layout::Failed,
        Segment::Records(_) | Segment::Record(_) => Layout::Keyed,
        Segment::Relation(_) => Layout::Relation,
        Segment::Scalar(_) => Layout::Single,
        Segment::Void => Layout::Empty,
        Segment::Payload(value) => match value {
            Value::Object(_) => Layout::Keyed,
            Value::Array(items) if items.iter().all(Value::is_object) => Layout::Keyed,
            Value::Array(items) if items.iter().all(Value::is_array) => Layout::Tuples,
            Value::Array(_) => Layout::Positional,
            _ => Layout::Single,
        },
    }
}

fn columns_of(segment: &Segment<'_>, layout: Layout) -> Vec<String> {
    match segment {
        Segment::Failed(_) => Vec::new(),
        Segment::Records(maps) => key_union(maps.iter()),
        Segment::Record(map) => key_union(std::iter::once(*map)),
        Segment::Relation(rel) => {
            let mut columns = vec!["id".to_string(), "in".to_string(), "out".to_string()];
            columns.extend(key_union(std::iter::once(&rel.extra)));
            columns
        }
        Segment::Scalar(_) | Segment::Void => vec![VALUE_COLUMN.to_string()],
        Segment::Payload(value) => match (value, layout) {
            (Value::Object(map), _) => key_union(std::iter::once(map)),
            (Value::Array(items), Layout::Keyed) => {
                key_union(items.iter().filter_map(Value::as_object))
            }
            (Value::Array(items), Layout::Tuples) => index_columns(
                items
                    .iter()
                    .filter_map(Value::as_array)
                    .map(Vec::len)
                    .max()
                    .unwrap_or(0),
            ),
            (Value::Array(items), _) => index_columns(items.len()),
            _ => vec![VALUE_COLUMN.to_string()],
        },
    }
}

/// Sorted, de-duplicated union of top-level keys.
fn key_union<'a>(maps: impl Iterator<Item = &'a Map<String, Value>>) -> Vec<String> {
    maps.flat_map(|map| map.keys().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn index_columns(width: usize) -> Vec<String> {
    (0..width).map(|i| i.to_string()).collect()
}

fn row_count(segment: &Segment<'_>, layout: Layout) -> usize {
    match segment {
        Segment::Failed(_) | Segment::Void => 0,
        Segment::Records(maps) => maps.len(),
        Segment::Payload(Value::Array(items))
            if matches!(layout, Layout::Keyed | Layout::Tuples) =>
        {
            items.len()
        }
        _ => 1,
    }
}

fn row_values(segment: &Segment<'_>, layout: Layout, row: usize, columns: &[String]) -> Vec<SqlValue> {
    match segment {
        Segment::Failed(_) | Segment::Void => Vec::new(),
        Segment::Records(maps) => maps
            .get(row)
            .map(|map| object_row(map, columns))
            .unwrap_or_default(),
        Segment::Record(map) => object_row(map, columns),
        Segment::Relation(rel) => relation_row(rel, columns),
        Segment::Scalar(value) => vec![SqlValue::from_json(value)],
        Segment::Payload(value) => match (value, layout) {
            (Value::Object(map), _) => object_row(map, columns),
            (Value::Array(items), Layout::Keyed) => items
                .get(row)
                .and_then(Value::as_object)
                .map(|map| object_row(map, columns))
                .unwrap_or_default(),
            (Value::Array(items), Layout::Tuples) => match items.get(row) {
                Some(Value::Array(cells)) => (0..columns.len())
                    .map(|i| cells.get(i).map_or(SqlValue::Null, SqlValue::from_json))
                    .collect(),
                _ => Vec::new(),
            },
            (Value::Array(items), _) => items.iter().map(SqlValue::from_json).collect(),
            (other, _) => vec![SqlValue::from_json(other)],
        },
    }
}

fn object_row(map: &Map<String, Value>, columns: &[String]) -> Vec<SqlValue> {
    columns
        .iter()
        .map(|column| map.get(column).map_or(SqlValue::Null, SqlValue::from_json))
        .collect()
}

fn relation_row(rel: &RelationOutcome, columns: &[String]) -> Vec<SqlValue> {
    columns
        .iter()
        .map(|column| match column.as_str() {
            "id" => SqlValue::Text(rel.id.to_string()),
            "in" => SqlValue::Text(rel.in_id.to_string()),
            "out" => SqlValue::Text(rel.out_id.to_string()),
            other => rel.extra.get(other).map_or(SqlValue::Null, SqlValue::from_json),
        })
        .collect()
}
