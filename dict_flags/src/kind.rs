//! Leaf kinds: the closed set of value shapes a flag can parse.
//!
//! Each kind carries its own string-to-value and value-to-string conversion.
//! Extensibility is modelled as a registered capability: a parse/serialize
//! function pair keyed by a kind tag (see [`register_custom_kind`]), rather
//! than open subclassing.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use uncased::UncasedStr;

use crate::error::{FlagError, Result};
use crate::value::{Timestamp, Value};

/// Scalar element kinds permitted inside sequences and tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// Boolean element.
    Bool,
    /// Integer element.
    Int,
    /// Floating-point element.
    Float,
    /// String element.
    Str,
}

impl ScalarKind {
    fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
        }
    }

    fn parse(self, input: &str) -> std::result::Result<Value, String> {
        match self {
            Self::Bool => parse_bool(input),
            Self::Int => input
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("'{input}' is not an integer")),
            Self::Float => input
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("'{input}' is not a number")),
            Self::Str => Ok(Value::String(input.to_owned())),
        }
    }

    fn check(self, value: &Value) -> std::result::Result<Value, String> {
        match (self, value) {
            (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::Str, Value::String(_)) => Ok(value.clone()),
            (Self::Float, Value::Int(i)) => {
                // Integer defaults are accepted for float elements.
                Ok(Value::Float(*i as f64))
            }
            _ => Err(format!("expected a {} element, got {value}", self.name())),
        }
    }
}

/// Element specification for sequence kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeqSpec {
    /// All elements share one scalar kind.
    Homogeneous(ScalarKind),
    /// Fixed-arity tuple with per-position scalar kinds.
    Tuple(Vec<ScalarKind>),
}

/// A fixed choice set for enumeration kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValues {
    values: Vec<String>,
    case_sensitive: bool,
}

impl EnumValues {
    /// Builds a choice set.
    #[must_use]
    pub fn new<I, S>(values: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            case_sensitive,
        }
    }

    /// Names in the choice set, in declaration order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Resolves `input` to the canonical member name, honouring case
    /// sensitivity.
    fn resolve(&self, input: &str) -> std::result::Result<String, String> {
        let found = self.values.iter().find(|v| {
            if self.case_sensitive {
                v.as_str() == input
            } else {
                UncasedStr::new(v) == UncasedStr::new(input)
            }
        });
        found.cloned().ok_or_else(|| {
            format!(
                "value should be one of <{}>",
                self.values.join("|")
            )
        })
    }
}

/// Parse/serialize function pair registered under a kind tag.
#[derive(Clone)]
pub struct CustomKind {
    tag: String,
    parse: Arc<dyn Fn(&str) -> std::result::Result<Value, String> + Send + Sync>,
    serialize: Arc<dyn Fn(&Value) -> String + Send + Sync>,
}

impl CustomKind {
    /// The tag this kind was registered under.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Debug for CustomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomKind").field("tag", &self.tag).finish()
    }
}

impl PartialEq for CustomKind {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

static CUSTOM_KINDS: LazyLock<RwLock<HashMap<String, CustomKind>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Registers a custom kind capability under `tag`.
///
/// The pair is consulted by [`Item::custom`](crate::Item::custom) when
/// constructing items of this kind. Registration is process-global and
/// happens once, before flag definition.
///
/// # Errors
///
/// Returns [`FlagError::DuplicateName`] when `tag` is already taken.
pub fn register_custom_kind<P, S>(tag: &str, parse: P, serialize: S) -> Result<()>
where
    P: Fn(&str) -> std::result::Result<Value, String> + Send + Sync + 'static,
    S: Fn(&Value) -> String + Send + Sync + 'static,
{
    let mut table = CUSTOM_KINDS
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if table.contains_key(tag) {
        return Err(FlagError::DuplicateName { name: tag.to_owned() });
    }
    table.insert(
        tag.to_owned(),
        CustomKind {
            tag: tag.to_owned(),
            parse: Arc::new(parse),
            serialize: Arc::new(serialize),
        },
    );
    Ok(())
}

pub(crate) fn custom_kind(tag: &str) -> Result<CustomKind> {
    let table = CUSTOM_KINDS.read().unwrap_or_else(PoisonError::into_inner);
    table
        .get(tag)
        .cloned()
        .ok_or_else(|| FlagError::UnknownKind { tag: tag.to_owned() })
}

/// The closed set of leaf kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    /// `true`/`false`, with the `--name`/`--noname` command-line surface.
    Boolean,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float; integer defaults are widened.
    Float,
    /// Arbitrary string.
    String,
    /// String constrained to a fixed choice set.
    Enumeration(EnumValues),
    /// Sequence of members of a fixed choice set.
    MultiEnumeration(EnumValues),
    /// Comma-separated sequence, homogeneous or fixed-arity tuple.
    Sequence(SeqSpec),
    /// Comma-separated list of strings.
    StringList,
    /// String flag that may appear multiple times on the command line.
    MultiString,
    /// ISO-8601-like timestamp.
    DateTime,
    /// A registered custom capability.
    Custom(CustomKind),
}

impl Kind {
    /// Short name used in error messages and help text.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Enumeration(_) => "enum",
            Self::MultiEnumeration(_) => "multi enum",
            Self::Sequence(_) => "sequence",
            Self::StringList => "string list",
            Self::MultiString => "multi string",
            Self::DateTime => "datetime",
            Self::Custom(_) => "custom",
        }
    }

    pub(crate) fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }

    /// Whether command-line occurrences accumulate instead of replacing.
    pub(crate) fn is_multi(&self) -> bool {
        matches!(self, Self::MultiString)
    }

    /// Parses one command-line value into a [`Value`].
    pub(crate) fn parse_str(&self, input: &str) -> std::result::Result<Value, String> {
        match self {
            Self::Boolean => parse_bool(input),
            Self::Integer => ScalarKind::Int.parse(input),
            Self::Float => ScalarKind::Float.parse(input),
            Self::String | Self::MultiString => Ok(Value::String(input.to_owned())),
            Self::Enumeration(values) => values.resolve(input).map(Value::String),
            Self::MultiEnumeration(values) => split_sequence(input)?
                .iter()
                .map(|element| values.resolve(element).map(Value::String))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Seq),
            Self::Sequence(spec) => {
                let elements = split_sequence(input)?;
                parse_sequence(spec, &elements)
            }
            Self::StringList => Ok(Value::Seq(if input.is_empty() {
                Vec::new()
            } else {
                input
                    .split(',')
                    .map(|item| Value::String(item.trim().to_owned()))
                    .collect()
            })),
            Self::DateTime => Timestamp::parse(input).map(Value::DateTime),
            Self::Custom(custom) => (custom.parse)(input),
        }
    }

    /// Validates `value` against this kind, widening where the originating
    /// framework does (integer defaults for float kinds).
    pub(crate) fn check(&self, value: &Value) -> std::result::Result<Value, String> {
        match self {
            Self::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err(self.mismatch(value)),
            },
            Self::Integer => match value {
                Value::Int(_) => Ok(value.clone()),
                _ => Err(self.mismatch(value)),
            },
            Self::Float => ScalarKind::Float
                .check(value)
                .map_err(|_| self.mismatch(value)),
            Self::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(self.mismatch(value)),
            },
            Self::Enumeration(values) => match value {
                Value::String(s) => values.resolve(s).map(Value::String),
                _ => Err(self.mismatch(value)),
            },
            Self::MultiEnumeration(values) => match value {
                Value::Seq(elements) => elements
                    .iter()
                    .map(|element| match element {
                        Value::String(s) => values.resolve(s).map(Value::String),
                        _ => Err(self.mismatch(element)),
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(Value::Seq),
                _ => Err(self.mismatch(value)),
            },
            Self::Sequence(spec) => match value {
                Value::Seq(elements) => check_sequence(spec, elements),
                _ => Err(self.mismatch(value)),
            },
            Self::StringList | Self::MultiString => match value {
                Value::Seq(elements) if elements.iter().all(|e| matches!(e, Value::String(_))) => {
                    Ok(value.clone())
                }
                _ => Err(self.mismatch(value)),
            },
            Self::DateTime => match value {
                Value::DateTime(_) => Ok(value.clone()),
                _ => Err(self.mismatch(value)),
            },
            Self::Custom(_) => Ok(value.clone()),
        }
    }

    /// Serializes a value back to its command-line string form.
    pub(crate) fn serialize(&self, value: &Value) -> String {
        match self {
            Self::StringList => value.as_seq().map_or_else(
                || value.to_string(),
                |elements| {
                    elements
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(",")
                },
            ),
            Self::Custom(custom) => (custom.serialize)(value),
            // Sequences and multi enums use the bracketed display form, which
            // `parse_str` accepts back.
            _ => value.to_string(),
        }
    }

    fn mismatch(&self, value: &Value) -> String {
        format!("expected a {} value, got {value}", self.name())
    }
}

fn parse_bool(input: &str) -> std::result::Result<Value, String> {
    let lowered = input.to_ascii_lowercase();
    match lowered.as_str() {
        "true" | "t" | "1" => Ok(Value::Bool(true)),
        "false" | "f" | "0" => Ok(Value::Bool(false)),
        _ => Err(format!("'{input}' is not a boolean")),
    }
}

/// Splits a comma-separated sequence, tolerating `[...]` / `(...)` wrapping.
fn split_sequence(input: &str) -> std::result::Result<Vec<String>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(
            "empty sequences should be given explicitly as [] or () and not as an empty string"
                .to_owned(),
        );
    }
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .or_else(|| {
            trimmed
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
        })
        .unwrap_or(trimmed);
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(',').map(|item| item.trim().to_owned()).collect())
}

fn parse_sequence(
    spec: &SeqSpec,
    elements: &[String],
) -> std::result::Result<Value, String> {
    match spec {
        SeqSpec::Homogeneous(scalar) => elements
            .iter()
            .map(|element| scalar.parse(element))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Seq),
        SeqSpec::Tuple(scalars) => {
            if elements.len() != scalars.len() {
                return Err(format!(
                    "expected {} tuple elements, got {}",
                    scalars.len(),
                    elements.len()
                ));
            }
            scalars
                .iter()
                .zip(elements)
                .map(|(scalar, element)| scalar.parse(element))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Seq)
        }
    }
}

fn check_sequence(
    spec: &SeqSpec,
    elements: &[Value],
) -> std::result::Result<Value, String> {
    match spec {
        SeqSpec::Homogeneous(scalar) => elements
            .iter()
            .map(|element| scalar.check(element))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Seq),
        SeqSpec::Tuple(scalars) => {
            if elements.len() != scalars.len() {
                return Err(format!(
                    "expected {} tuple elements, got {}",
                    scalars.len(),
                    elements.len()
                ));
            }
            scalars
                .iter()
                .zip(elements)
                .map(|(scalar, element)| scalar.check(element))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Seq)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{EnumValues, Kind, ScalarKind, SeqSpec, parse_bool};
    use crate::value::Value;

    #[rstest]
    #[case("true", true)]
    #[case("T", true)]
    #[case("1", true)]
    #[case("false", false)]
    #[case("F", false)]
    #[case("0", false)]
    fn boolean_accepts_framework_spellings(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(parse_bool(input).unwrap(), Value::Bool(expected));
    }

    #[test]
    fn boolean_rejects_other_strings() {
        assert!(parse_bool("maybe").is_err());
    }

    #[rstest]
    #[case("[1,2,3]")]
    #[case("(1, 2, 3)")]
    #[case("1,2,3")]
    fn sequence_accepts_wrapped_and_bare_forms(#[case] input: &str) {
        let kind = Kind::Sequence(SeqSpec::Homogeneous(ScalarKind::Int));
        let parsed = kind.parse_str(input).unwrap();
        assert_eq!(parsed, Value::from(vec![1, 2, 3]));
    }

    #[test]
    fn sequence_rejects_empty_string() {
        let kind = Kind::Sequence(SeqSpec::Homogeneous(ScalarKind::Int));
        let err = kind.parse_str("").unwrap_err();
        assert!(err.contains("explicitly"), "{err}");
    }

    #[test]
    fn sequence_parses_empty_brackets() {
        let kind = Kind::Sequence(SeqSpec::Homogeneous(ScalarKind::Int));
        assert_eq!(kind.parse_str("[]").unwrap(), Value::Seq(Vec::new()));
    }

    #[test]
    fn tuple_enforces_arity() {
        let kind = Kind::Sequence(SeqSpec::Tuple(vec![ScalarKind::Int, ScalarKind::Str]));
        assert_eq!(
            kind.parse_str("3,pad").unwrap(),
            Value::Seq(vec![Value::Int(3), Value::String("pad".into())]),
        );
        assert!(kind.parse_str("3,pad,extra").is_err());
    }

    #[rstest]
    #[case(true, "Pad", false)]
    #[case(false, "Pad", true)]
    #[case(false, "CROP", true)]
    fn enumeration_case_handling(
        #[case] case_sensitive: bool,
        #[case] input: &str,
        #[case] ok: bool,
    ) {
        let kind = Kind::Enumeration(EnumValues::new(["pad", "crop"], case_sensitive));
        assert_eq!(kind.parse_str(input).is_ok(), ok);
    }

    #[test]
    fn enumeration_resolves_to_canonical_member() {
        let kind = Kind::Enumeration(EnumValues::new(["pad", "crop"], false));
        assert_eq!(
            kind.parse_str("PAD").unwrap(),
            Value::String("pad".into()),
        );
    }

    #[test]
    fn float_check_widens_integers() {
        let normalized = Kind::Float.check(&Value::Int(1)).unwrap();
        assert_eq!(normalized, Value::Float(1.0));
    }

    #[test]
    fn string_list_splits_and_trims() {
        let parsed = Kind::StringList.parse_str("a, list ,of").unwrap();
        assert_eq!(
            parsed,
            Value::Seq(vec![
                Value::String("a".into()),
                Value::String("list".into()),
                Value::String("of".into()),
            ]),
        );
    }

    #[test]
    fn string_list_serializes_as_csv() {
        let value = Value::Seq(vec![Value::String("a".into()), Value::String("b".into())]);
        assert_eq!(Kind::StringList.serialize(&value), "a,b");
    }

    #[rstest]
    #[case(Kind::Integer, "3")]
    #[case(Kind::Float, "0.5")]
    #[case(Kind::String, "pad")]
    #[case(Kind::DateTime, "2000-01-02T03:04:05")]
    #[case(Kind::Sequence(SeqSpec::Homogeneous(ScalarKind::Int)), "[1, 2, 3]")]
    fn serialized_values_reparse_equal(#[case] kind: Kind, #[case] input: &str) {
        let parsed = kind.parse_str(input).unwrap();
        let reparsed = kind.parse_str(&kind.serialize(&parsed)).unwrap();
        assert_eq!(parsed, reparsed);
    }
}
