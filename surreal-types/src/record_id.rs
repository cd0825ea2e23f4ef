//! Record identifier codec.
//!
//! A record identifier ("thing") is written as `<table>:<identifier>`. The
//! identifier has several mutually exclusive encodings which are tried in a
//! fixed priority order when parsing:
//!
//! 1. `⟨...⟩` or `` `...` `` wrapped literal -> [`IdKey::Raw`]
//! 2. `rand()` / `uuid()` / `ulid()` -> [`IdKey::Auto`]
//! 3. base-10 `i64` -> [`IdKey::Int`]
//! 4. `f64` -> [`IdKey::Float`]
//! 5. strict ULID -> [`IdKey::Ulid`]
//! 6. hyphenated UUID -> [`IdKey::Uuid`]
//! 7. JSON object or array -> [`IdKey::Object`]
//! 8. anything else -> [`IdKey::String`]

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use ulid::Ulid;
use uuid::Uuid;

use crate::error::{IdFormatError, IdResult};

/// Opening delimiter of a raw identifier literal.
pub const RAW_OPEN: char = '⟨';
/// Closing delimiter of a raw identifier literal.
pub const RAW_CLOSE: char = '⟩';

const CROCKFORD: &str = "0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Server-side id generator requested on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdGenerator {
    Rand,
    Uuid,
    Ulid,
}

impl IdGenerator {
    /// The function call text understood by the server.
    pub fn as_call(&self) -> &'static str {
        match self {
            IdGenerator::Rand => "rand()",
            IdGenerator::Uuid => "uuid()",
            IdGenerator::Ulid => "ulid()",
        }
    }

    fn from_call(text: &str) -> Option<Self> {
        match text {
            "rand()" => Some(IdGenerator::Rand),
            "uuid()" => Some(IdGenerator::Uuid),
            "ulid()" => Some(IdGenerator::Ulid),
            _ => None,
        }
    }
}

/// Identifier payload of a [`RecordId`].
#[derive(Debug, Clone, PartialEq)]
pub enum IdKey {
    String(String),
    Int(i64),
    /// Finite values round-trip. `inf` and `NaN` have no id syntax, print
    /// as-is and read back as `String`; JSON never carries them.
    Float(f64),
    /// Verbatim text that needed `⟨⟩` wrapping on the wire.
    Raw(String),
    /// Embedded JSON document, kept opaque.
    Object(Value),
    Ulid(Ulid),
    Uuid(Uuid),
    /// Placeholder for an id the server assigns on write.
    Auto(IdGenerator),
}

impl IdKey {
    /// Decode an identifier payload, taking the first strategy that matches.
    pub fn decode(payload: &str) -> IdKey {
        if let Some(inner) = unwrap_raw(payload) {
            let inner = unescape_raw(inner);
            // UUIDs are written bracketed, read them back as UUIDs.
            if let Some(uuid) = parse_uuid(&inner) {
                return IdKey::Uuid(uuid);
            }
            return IdKey::Raw(inner);
        }

        if let Some(generator) = IdGenerator::from_call(payload) {
            return IdKey::Auto(generator);
        }

        if !payload.contains(['.', 'e', 'E']) {
            if let Ok(int) = payload.parse::<i64>() {
                return IdKey::Int(int);
            }
        }

        if looks_numeric(payload) {
            if let Ok(float) = payload.parse::<f64>() {
                return IdKey::Float(float);
            }
        }

        if let Some(ulid) = parse_strict_ulid(payload) {
            return IdKey::Ulid(ulid);
        }

        if let Some(uuid) = parse_uuid(payload) {
            return IdKey::Uuid(uuid);
        }

        if payload.starts_with('{') || payload.starts_with('[') {
            if let Ok(value) = serde_json::from_str::<Value>(payload) {
                return IdKey::Object(value);
            }
        }

        IdKey::String(payload.to_string())
    }

    /// Name of the encoding, used in logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            IdKey::String(_) => "string",
            IdKey::Int(_) => "int",
            IdKey::Float(_) => "float",
            IdKey::Raw(_) => "raw",
            IdKey::Object(_) => "object",
            IdKey::Ulid(_) => "ulid",
            IdKey::Uuid(_) => "uuid",
            IdKey::Auto(_) => "auto",
        }
    }
}

impl fmt::Display for IdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKey::String(s) if is_plain(s) => f.write_str(s),
            IdKey::String(s) | IdKey::Raw(s) => write_raw(f, s),
            IdKey::Int(i) => write!(f, "{}", i),
            IdKey::Float(x) => {
                let text = x.to_string();
                if x.is_finite() && !text.contains(['.', 'e', 'E']) {
                    write!(f, "{}.0", text)
                } else {
                    f.write_str(&text)
                }
            }
            IdKey::Object(value) => write!(f, "{}", value),
            IdKey::Ulid(ulid) => write!(f, "{}", ulid),
            IdKey::Uuid(uuid) => write_raw(f, &uuid.hyphenated().to_string()),
            IdKey::Auto(generator) => f.write_str(generator.as_call()),
        }
    }
}

/// A fully qualified `table:identifier` key.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordId {
    pub table: String,
    pub key: IdKey,
}

impl RecordId {
    pub fn new(table: impl Into<String>, key: IdKey) -> Self {
        Self {
            table: table.into(),
            key,
        }
    }

    /// Parse `table:identifier` text.
    ///
    /// One layer of JSON string quoting is removed first, since ids nested
    /// inside already-encoded documents often arrive as `"\"t:x\""`.
    pub fn parse(text: &str) -> IdResult<Self> {
        let unquoted = strip_outer_quotes(text);
        let (table, payload) = split_table(&unquoted)
            .ok_or_else(|| IdFormatError::MissingSeparator(text.to_string()))?;

        let table = drop_quote_runs(table);
        // Raw and JSON payloads are verbatim.
        let payload = if payload.starts_with(['{', '[']) || unwrap_raw(payload).is_some() {
            Cow::Borrowed(payload)
        } else {
            drop_quote_runs(payload)
        };

        if table.is_empty() {
            return Err(IdFormatError::EmptyTable(text.to_string()));
        }
        if payload.is_empty() {
            return Err(IdFormatError::EmptyIdentifier(text.to_string()));
        }

        Ok(Self {
            table: table.into_owned(),
            key: IdKey::decode(&payload),
        })
    }

    /// Parse the id held in a JSON value, if it is a string.
    pub fn from_json(value: &Value) -> Option<IdResult<Self>> {
        value.as_str().map(Self::parse)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.key)
    }
}

impl FromStr for RecordId {
    type Err = IdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordIdVisitor;

        impl Visitor<'_> for RecordIdVisitor {
            type Value = RecordId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a `table:identifier` string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
                RecordId::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(RecordIdVisitor)
    }
}

fn split_table(text: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            ':' if !escaped => return Some((&text[..idx], &text[idx + 1..])),
            _ => escaped = false,
        }
    }
    None
}

fn strip_outer_quotes(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        match serde_json::from_str::<String>(trimmed) {
            Ok(decoded) => Cow::Owned(decoded),
            Err(_) => Cow::Borrowed(&trimmed[1..trimmed.len() - 1]),
        }
    } else {
        Cow::Borrowed(trimmed)
    }
}

/// Remove runs of three or more `"` / `\"` markers left over from repeated
/// string encoding. Shorter runs are kept as they are.
fn drop_quote_runs(text: &str) -> Cow<'_, str> {
    if !text.contains('"') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    let mut markers = 0;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        let marker = match ch {
            '"' => Some("\""),
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                Some("\\\"")
            }
            _ => None,
        };
        match marker {
            Some(m) => {
                run.push_str(m);
                markers += 1;
            }
            None => {
                flush_quote_run(&mut out, &mut run, &mut markers);
                out.push(ch);
            }
        }
    }
    flush_quote_run(&mut out, &mut run, &mut markers);
    Cow::Owned(out)
}

fn flush_quote_run(out: &mut String, run: &mut String, markers: &mut usize) {
    if *markers < 3 {
        out.push_str(run);
    }
    run.clear();
    *markers = 0;
}

fn unwrap_raw(payload: &str) -> Option<&str> {
    let pairs = [(RAW_OPEN, RAW_CLOSE), ('`', '`')];
    pairs.iter().find_map(|&(open, close)| {
        let inner = payload.strip_prefix(open)?.strip_suffix(close)?;
        // `\⟩` at the very end means the closing delimiter was escaped.
        if inner.ends_with('\\') && !inner.ends_with("\\\\") {
            return None;
        }
        Some(inner)
    })
}

fn unescape_raw(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some(&next) if next == RAW_CLOSE || next == '`' || next == '\\' => {
                    out.push(next);
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        out.push(ch);
    }
    out
}

fn write_raw(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "{}", RAW_OPEN)?;
    for ch in text.chars() {
        if ch == RAW_CLOSE || ch == '\\' {
            write!(f, "\\")?;
        }
        write!(f, "{}", ch)?;
    }
    write!(f, "{}", RAW_CLOSE)
}

fn looks_numeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

fn parse_strict_ulid(text: &str) -> Option<Ulid> {
    if text.len() != 26 || !text.chars().all(|c| CROCKFORD.contains(c)) {
        return None;
    }
    // The first character may only carry 3 bits.
    if text.as_bytes()[0] > b'7' {
        return None;
    }
    Ulid::from_string(text).ok()
}

fn parse_uuid(text: &str) -> Option<Uuid> {
    if text.len() != 36 {
        return None;
    }
    Uuid::try_parse(text).ok()
}

/// True when a string id can be written bare and still parse as a string.
fn is_plain(text: &str) -> bool {
    !text.is_empty()
        && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && matches!(IdKey::decode(text), IdKey::String(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> RecordId {
        RecordId::parse(text).unwrap()
    }

    #[test]
    fn test_parse_string_id() {
        let id = parse("books:eragon");
        assert_eq!(id.table, "books");
        assert_eq!(id.key, IdKey::String("eragon".to_string()));
        assert_eq!(id.to_string(), "books:eragon");
    }

    #[test]
    fn test_parse_raw_brackets_and_backticks() {
        assert_eq!(parse("user:⟨abc-def⟩").key, IdKey::Raw("abc-def".to_string()));
        assert_eq!(parse("user:`a:b`").key, IdKey::Raw("a:b".to_string()));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse("t:42").key, IdKey::Int(42));
        assert_eq!(parse("t:-7").key, IdKey::Int(-7));
        assert_eq!(parse("t:1.5").key, IdKey::Float(1.5));
        assert_eq!(parse("t:1e3").key, IdKey::Float(1000.0));
        // Does not fit i64, falls to float.
        assert!(matches!(parse("t:99999999999999999999").key, IdKey::Float(_)));
    }

    #[test]
    fn test_parse_ulid_and_uuid() {
        let id = parse("t:01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert!(matches!(id.key, IdKey::Ulid(_)));

        // Lowercase is not a strict ULID.
        let id = parse("t:01arz3ndektsv4rrffq69g5fav");
        assert!(matches!(id.key, IdKey::String(_)));

        let id = parse("t:8c54161f-d4fe-4a74-9409-ed1e137040c1");
        assert!(matches!(id.key, IdKey::Uuid(_)));

        let id = parse("t:⟨8c54161f-d4fe-4a74-9409-ed1e137040c1⟩");
        assert!(matches!(id.key, IdKey::Uuid(_)));
    }

    #[test]
    fn test_parse_object_and_auto() {
        let id = parse(r#"t:{"a":1,"b":[true]}"#);
        assert_eq!(id.key, IdKey::Object(json!({"a": 1, "b": [true]})));

        assert_eq!(parse("t:rand()").key, IdKey::Auto(IdGenerator::Rand));
        assert_eq!(parse("t:uuid()").key, IdKey::Auto(IdGenerator::Uuid));
        assert_eq!(parse("t:ulid()").key, IdKey::Auto(IdGenerator::Ulid));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            RecordId::parse("books"),
            Err(IdFormatError::MissingSeparator("books".to_string()))
        );
        assert!(matches!(
            RecordId::parse(":x"),
            Err(IdFormatError::EmptyTable(_))
        ));
        assert!(matches!(
            RecordId::parse("books:"),
            Err(IdFormatError::EmptyIdentifier(_))
        ));
    }

    #[test]
    fn test_escaped_separator_stays_in_table() {
        let id = parse(r"a\:b:c");
        assert_eq!(id.table, r"a\:b");
        assert_eq!(id.key, IdKey::String("c".to_string()));
    }

    #[test]
    fn test_strip_incidental_quoting() {
        assert_eq!(parse("\"books:eragon\""), parse("books:eragon"));
        assert_eq!(parse(r#""\"\"\"books:eragon\"\"\"""#).to_string(), "books:eragon");
        assert_eq!(parse(r#"books:\"\"\"eragon\"\"\""#), parse("books:eragon"));
    }

    #[test]
    fn test_display_forms() {
        let cases = vec![
            (RecordId::new("t", IdKey::Int(5)), "t:5"),
            (RecordId::new("t", IdKey::Float(2.0)), "t:2.0"),
            (RecordId::new("t", IdKey::Float(0.25)), "t:0.25"),
            (RecordId::new("t", IdKey::Raw("a-b".into())), "t:⟨a-b⟩"),
            (RecordId::new("t", IdKey::String("a-b".into())), "t:⟨a-b⟩"),
            (RecordId::new("t", IdKey::String("123".into())), "t:⟨123⟩"),
            (RecordId::new("t", IdKey::Auto(IdGenerator::Ulid)), "t:ulid()"),
        ];
        for (id, text) in cases {
            assert_eq!(id.to_string(), text);
        }
    }

    #[test]
    fn test_raw_escaping_roundtrip() {
        let id = RecordId::new("t", IdKey::Raw("odd⟩name\\".to_string()));
        let text = id.to_string();
        assert_eq!(parse(&text), id);
    }

    #[test]
    fn test_raw_content_keeps_quote_runs() {
        for raw in ["a\"\"\"b", "\"\"\"", "x\\\"\\\"\\\"y"] {
            let id = RecordId::new("t", IdKey::Raw(raw.to_string()));
            assert_eq!(parse(&id.to_string()), id, "{}", id);
        }

        let backticked = parse("t:`a\"\"\"b`");
        assert_eq!(backticked.key, IdKey::Raw("a\"\"\"b".to_string()));
    }

    #[test]
    fn test_non_finite_float_reads_back_as_string() {
        let id = RecordId::new("t", IdKey::Float(f64::INFINITY));
        assert_eq!(id.to_string(), "t:inf");
        assert_eq!(parse("t:inf").key, IdKey::String("inf".to_string()));
        assert_eq!(parse("t:NaN").key, IdKey::String("NaN".to_string()));
    }

    #[test]
    fn test_serde_as_string() {
        let id = parse("books:eragon");
        let encoded = serde_json::to_value(&id).unwrap();
        assert_eq!(encoded, json!("books:eragon"));

        let decoded: RecordId = serde_json::from_value(json!("user:⟨abc-def⟩")).unwrap();
        assert_eq!(decoded.key, IdKey::Raw("abc-def".to_string()));

        assert!(serde_json::from_value::<RecordId>(json!("nope")).is_err());
    }
}
