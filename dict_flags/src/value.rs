//! Runtime values held by leaf flags and aggregate dict views.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// A parsed flag value.
///
/// This is the closed set of value shapes the library can carry: the scalar
/// kinds, an ISO-8601-like timestamp and flat sequences of scalars. Nested
/// structure is expressed through [`DictValue`], never through `Value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar, also used for enumeration members.
    String(String),
    /// Possibly-naive timestamp.
    DateTime(Timestamp),
    /// Flat sequence of scalar values.
    Seq(Vec<Value>),
}

impl Value {
    /// Returns the contained boolean, if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the contained integer, if this is an `Int`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the contained float, if this is a `Float`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the contained string, if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained sequence, if this is a `Seq`.
    #[must_use]
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(values) => Some(values),
            _ => None,
        }
    }

    /// Converts this value into a `serde_json` value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::DateTime(ts) => serde_json::Value::String(ts.to_string()),
            Self::Seq(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
            Self::DateTime(ts) => write!(f, "{ts}"),
            Self::Seq(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! impl_int_from {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::Int(i64::from(v))
            }
        })+
    };
}

impl_int_from!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Self::DateTime(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(Timestamp::Naive(v))
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::DateTime(Timestamp::Aware(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::Seq(values.into_iter().map(Into::into).collect())
    }
}

/// An ISO-8601-like timestamp that may or may not carry a UTC offset.
///
/// Mirrors the behaviour of parsing with `fromisoformat`-style rules: a bare
/// date, a naive date-time, or a date-time with an explicit offset are all
/// accepted. The date and time parts may be separated by `T` or a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// A timestamp without offset information.
    Naive(NaiveDateTime),
    /// A timestamp with a fixed UTC offset.
    Aware(DateTime<FixedOffset>),
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

impl Timestamp {
    /// Parses an ISO-8601-like string.
    ///
    /// A `+` or `-` in the position separating date and time is rejected:
    /// `2000-01-01+01:00` reads equally well as "one in the morning" and as
    /// "midnight at UTC+1", and silently picking one of the two has burnt
    /// users of the originating framework before.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the input matches none of the
    /// accepted shapes.
    pub fn parse(input: &str) -> std::result::Result<Self, String> {
        if matches!(input.as_bytes().get(10), Some(b'+' | b'-')) {
            return Err(format!(
                "datetime value '{input}' uses '+' or '-' as separator between \
                 date and time; use 'T' or a space instead"
            ));
        }

        for format in AWARE_FORMATS {
            if let Ok(parsed) = DateTime::parse_from_str(input, format) {
                return Ok(Self::Aware(parsed));
            }
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self::Aware(parsed));
        }
        for format in NAIVE_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Self::Naive(parsed));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self::Naive(midnight));
            }
        }
        Err(format!("invalid datetime value '{input}'"))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Naive(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Self::Aware(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f%:z")),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The live aggregate value of a dict flag.
///
/// A `DictValue` is rebuilt from the underlying leaf flags on every access;
/// it is a view, never a snapshot. A leaf slot is `None` when the
/// corresponding flag has no default and has not been set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DictValue {
    /// Current value of one leaf flag.
    Leaf(Option<Value>),
    /// Nested mapping mirroring the schema shape.
    Map(BTreeMap<String, DictValue>),
}

impl DictValue {
    /// Looks up an immediate child by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DictValue> {
        match self {
            Self::Map(entries) => entries.get(name),
            Self::Leaf(_) => None,
        }
    }

    /// Walks a dotted path down the mapping.
    ///
    /// ```rust
    /// use dict_flags::{DictValue, Value};
    /// # use std::collections::BTreeMap;
    /// let leaf = DictValue::Leaf(Some(Value::Int(7)));
    /// let inner = DictValue::Map(BTreeMap::from([("height".into(), leaf)]));
    /// let value = DictValue::Map(BTreeMap::from([("sizes".into(), inner)]));
    /// assert_eq!(
    ///     value.at("sizes.height").and_then(DictValue::as_value),
    ///     Some(&Value::Int(7)),
    /// );
    /// ```
    #[must_use]
    pub fn at(&self, path: &str) -> Option<&DictValue> {
        let mut node = self;
        for segment in path.split('.') {
            node = node.get(segment)?;
        }
        Some(node)
    }

    /// Returns the leaf value, if this node is a set leaf.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Leaf(value) => value.as_ref(),
            Self::Map(_) => None,
        }
    }

    /// Returns the nested entries, if this node is a mapping.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, DictValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            Self::Leaf(_) => None,
        }
    }

    /// Converts the whole view into a `serde_json` value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Leaf(None) => serde_json::Value::Null,
            Self::Leaf(Some(value)) => value.to_json(),
            Self::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_json()))
                    .collect(),
            ),
        }
    }
}
