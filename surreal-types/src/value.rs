//! Leaf value conversion from JSON to SQL-style scalars.
//!
//! The wire format carries no type tags, so strings are probed: RFC 3339
//! timestamps first, then duration text, then plain text. A plain string
//! that happens to look like a duration (`"1h"`, `"0"`) is read as a
//! duration; callers that need the raw text should use the JSON directly.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset};
use serde_json::{Number, Value};

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SEC: i128 = 1_000_000_000;

/// A single converted column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Nested object or array, as serialized JSON.
    Bytes(Vec<u8>),
    Timestamp(DateTime<FixedOffset>),
    Duration(Duration),
}

impl SqlValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => SqlValue::from_number(n),
            Value::String(s) => SqlValue::from_text(s),
            Value::Array(_) | Value::Object(_) => SqlValue::Bytes(value.to_string().into_bytes()),
        }
    }

    /// Integers stay integers unless they overflow `i64`; anything written
    /// with a fraction or exponent is a float.
    pub fn from_number(n: &Number) -> Self {
        let text = n.to_string();
        if !text.contains(['.', 'e', 'E']) {
            if let Ok(int) = text.parse::<i64>() {
                return SqlValue::Int(int);
            }
        }
        match text.parse::<f64>() {
            Ok(float) => SqlValue::Float(float),
            Err(_) => SqlValue::Text(text),
        }
    }

    pub fn from_text(text: &str) -> Self {
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return SqlValue::Timestamp(ts);
        }
        if let Some(duration) = parse_duration(text) {
            return SqlValue::Duration(duration);
        }
        SqlValue::Text(text.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Re-decode a nested value.
    pub fn as_json(&self) -> Option<Value> {
        match self {
            SqlValue::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Float(x) => write!(f, "{}", x),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            SqlValue::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
            SqlValue::Duration(d) => write!(f, "{}", d),
        }
    }
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        SqlValue::from_json(value)
    }
}

/// Parse duration text such as `1h30m`, `1.5s`, `-300ms` or `2w3d`.
///
/// Accepts the units `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`, `d`, `w` and `y`
/// (365 days). A bare `0` is the zero duration.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let (negative, mut rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    if rest == "0" {
        return Some(Duration::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_frac) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                after_dot.split_at(frac_len)
            }
            None => ("", after_int),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let unit_len = after_frac
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_frac.len());
        let (unit, next) = after_frac.split_at(unit_len);
        let scale = unit_nanos(unit)?;

        let whole: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        total = total.checked_add(whole.checked_mul(scale)?)?;

        if !frac_part.is_empty() {
            // Extra digits below nanosecond precision are dropped.
            let digits = &frac_part[..frac_part.len().min(18)];
            let numerator: i128 = digits.parse().ok()?;
            let denominator = 10_i128.pow(digits.len() as u32);
            total = total.checked_add(numerator * scale / denominator)?;
        }

        if total > i64::MAX as i128 {
            return None;
        }
        rest = next;
    }

    let nanos = if negative { -total } else { total };
    Some(Duration::nanoseconds(i64::try_from(nanos).ok()?))
}

fn unit_nanos(unit: &str) -> Option<i128> {
    let scale = match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => NANOS_PER_MICRO,
        "ms" => NANOS_PER_MILLI,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3_600 * NANOS_PER_SEC,
        "d" => 86_400 * NANOS_PER_SEC,
        "w" => 7 * 86_400 * NANOS_PER_SEC,
        "y" => 365 * 86_400 * NANOS_PER_SEC,
        _ => return None,
    };
    Some(scale)
}
