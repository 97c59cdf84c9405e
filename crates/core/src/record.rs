use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::StrataError;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Sort key of a stored cell.
///
/// Keys order by row, family, qualifier and visibility ascending, then by
/// timestamp descending so that the newest version of a cell comes first.
/// For identical timestamps a deletion marker sorts ahead of a put.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub row: String,
    pub family: String,
    pub qualifier: String,
    #[serde(default)]
    pub visibility: String,
    pub timestamp: i64,
    #[serde(default)]
    pub deleted: bool,
}

/// Prefix of a key used for partial comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialKey {
    Row,
    RowFamily,
    RowFamilyQualifier,
    RowFamilyQualifierVisibility,
}

impl Key {
    pub fn new(
        row: impl Into<String>,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            visibility: String::new(),
            timestamp,
            deleted: false,
        }
    }

    pub fn with_visibility(mut self, visibility: impl Into<String>) -> Self {
        self.visibility = visibility.into();
        self
    }

    /// Turn this key into a deletion marker.
    pub fn into_delete(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Compare only the leading components named by `part`.
    pub fn equals(&self, other: &Key, part: PartialKey) -> bool {
        let row = self.row == other.row;
        match part {
            PartialKey::Row => row,
            PartialKey::RowFamily => row && self.family == other.family,
            PartialKey::RowFamilyQualifier => {
                row && self.family == other.family && self.qualifier == other.qualifier
            }
            PartialKey::RowFamilyQualifierVisibility => {
                row && self.family == other.family
                    && self.qualifier == other.qualifier
                    && self.visibility == other.visibility
            }
        }
    }

    /// Wall-clock view of the timestamp, when it is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.family.cmp(&other.family))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
            .then_with(|| self.visibility.cmp(&other.visibility))
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| other.deleted.cmp(&self.deleted))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} [{}] {}",
            self.row, self.family, self.qualifier, self.visibility, self.timestamp
        )?;
        if self.deleted {
            write!(f, " (deleted)")?;
        }
        Ok(())
    }
}

/// Raw cell value. Values are opaque bytes; most are UTF-8 text.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Value(Vec<u8>);

impl Value {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "Value({:?})", s),
            None => write!(f, "Value({:02x?})", self.0),
        }
    }
}

/// A key paired with its value: the unit every pipeline stage consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: Key,
    pub value: Value,
}

impl Record {
    pub fn new(key: Key, value: impl Into<Value>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}    {}", self.key, self.value)
    }
}

// ── Columns ───────────────────────────────────────────────────

/// A column family, optionally narrowed to one qualifier.
///
/// Textual form is `family` or `family:qualifier`. Literal `,`, `:` and `%`
/// are written as `%2C`, `%3A` and `%25`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Column {
    pub family: String,
    pub qualifier: Option<String>,
}

impl Column {
    pub fn family(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: None,
        }
    }

    pub fn qualified(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    pub fn parse(text: &str) -> Result<Self, StrataError> {
        let mut parts = text.split(':');
        let family = parts.next().unwrap_or_default();
        let qualifier = parts.next();
        if parts.next().is_some() {
            return Err(StrataError::InvalidColumn(format!(
                "'{}' has more than one ':'",
                text
            )));
        }
        if family.is_empty() {
            return Err(StrataError::InvalidColumn(format!(
                "'{}' has an empty family",
                text
            )));
        }
        Ok(Self {
            family: decode_component(family)?,
            qualifier: qualifier.map(decode_component).transpose()?,
        })
    }

    pub fn matches(&self, key: &Key) -> bool {
        self.family == key.family
            && self
                .qualifier
                .as_ref()
                .map_or(true, |q| *q == key.qualifier)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_component(&self.family))?;
        if let Some(q) = &self.qualifier {
            write!(f, ":{}", encode_component(q))?;
        }
        Ok(())
    }
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ',' => out.push_str("%2C"),
            ':' => out.push_str("%3A"),
            other => out.push(other),
        }
    }
    out
}

fn decode_component(s: &str) -> Result<String, StrataError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| {
                    StrataError::InvalidColumn(format!("bad escape in '{}'", s))
                })?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map_err(|_| StrataError::InvalidColumn(format!("'{}' is not valid UTF-8", s)))
}
