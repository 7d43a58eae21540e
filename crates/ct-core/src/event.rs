//! Parsed and normalized log events.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::event_type::EventType;
use crate::types::EventId;

/// A dynamically typed field extracted from a log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Timestamp(DateTime<FixedOffset>),
    Str(String),
}

impl FieldValue {
    /// Types captured text: integers become `Int`, decimals `Float`, anything
    /// else stays a string.
    pub fn infer(text: &str) -> Self {
        if let Ok(i) = text.parse::<i64>() {
            return Self::Int(i);
        }
        let looks_decimal = text.contains('.')
            && text
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.' || c == '-');
        if looks_decimal {
            if let Ok(f) = text.parse::<f64>() {
                return Self::Float(f);
            }
        }
        Self::Str(text.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; numeric strings are accepted as well.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Str(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// Field map shared by parsed entries and normalized events.
pub type Fields = BTreeMap<String, FieldValue>;

/// One physical line (or multiline group) matched by a parser, before its
/// timestamp has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedLogEntry {
    /// 1-based line number in the source file of the first consumed line.
    pub line_number: usize,
    pub section_id: String,
    pub event_type: EventType,
    pub fields: Fields,
    pub raw_line: String,
    /// The text captured by the `timestamp` group, if any.
    pub raw_timestamp_token: Option<String>,
}

/// A typed event with an absolute timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLogEvent {
    /// Unique within a parse run.
    pub event_id: EventId,
    pub timestamp: DateTime<FixedOffset>,
    pub event_type: EventType,
    pub source_section: String,
    pub source_file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default)]
    pub attributes: Fields,
    pub raw_line: String,
}

impl NormalizedLogEvent {
    pub fn attr(&self, key: &str) -> Option<&FieldValue> {
        self.attributes.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(FieldValue::as_str)
    }

    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attr(key).and_then(FieldValue::as_i64)
    }

    /// The first path-like attribute (`file_path`, `path`, then `uri`).
    pub fn path_attribute(&self) -> Option<String> {
        ["file_path", "path", "uri"]
            .iter()
            .find_map(|key| self.attr(key).map(ToString::to_string))
    }
}
