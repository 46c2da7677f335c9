//! Leaf items and the nested schema tree they are arranged in.

use std::collections::BTreeMap;

use clap::ValueEnum;

use crate::error::{FlagError, Result};
use crate::kind::{EnumValues, Kind, ScalarKind, SeqSpec, custom_kind};
use crate::value::{Timestamp, Value};

/// Separator joining schema names into dotted flag names.
pub const SEPARATOR: char = '.';

/// A leaf definition: kind, validated default and optional help string.
///
/// Items are schema-time objects. They do not hold a live value; that lives
/// in the [`Registry`](crate::Registry) once the item is defined under a
/// dotted name.
#[derive(Debug, Clone)]
pub struct Item {
    kind: Kind,
    default: Option<Value>,
    help: Option<String>,
    required: bool,
}

impl Item {
    /// Builds an item, validating the default against the kind.
    ///
    /// The default is checked here rather than at definition time so that
    /// mistakes surface where the schema is written.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::TypeMismatch`] when the default does not fit the
    /// kind.
    pub fn new(kind: Kind, default: Option<Value>) -> Result<Self> {
        let default = match default {
            Some(value) => Some(kind.check(&value).map_err(|message| {
                FlagError::TypeMismatch {
                    name: "default".to_owned(),
                    kind: kind.name().to_owned(),
                    value: message,
                }
            })?),
            None => None,
        };
        Ok(Self {
            kind,
            default,
            help: None,
            required: false,
        })
    }

    /// A required item: no default, and parsing fails when the flag is
    /// absent from the command line.
    #[must_use]
    pub fn required(kind: Kind) -> Self {
        Self {
            kind,
            default: None,
            help: None,
            required: true,
        }
    }

    /// Boolean item.
    #[must_use]
    pub fn boolean(default: bool) -> Self {
        Self {
            kind: Kind::Boolean,
            default: Some(Value::Bool(default)),
            help: None,
            required: false,
        }
    }

    /// Integer item.
    #[must_use]
    pub fn integer(default: i64) -> Self {
        Self {
            kind: Kind::Integer,
            default: Some(Value::Int(default)),
            help: None,
            required: false,
        }
    }

    /// Float item.
    #[must_use]
    pub fn float(default: f64) -> Self {
        Self {
            kind: Kind::Float,
            default: Some(Value::Float(default)),
            help: None,
            required: false,
        }
    }

    /// String item.
    #[must_use]
    pub fn string(default: impl Into<String>) -> Self {
        Self {
            kind: Kind::String,
            default: Some(Value::String(default.into())),
            help: None,
            required: false,
        }
    }

    /// String item constrained to `values`, matched case-sensitively.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::TypeMismatch`] when the default is not a member
    /// of `values`.
    pub fn enumeration<I, S>(default: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            Kind::Enumeration(EnumValues::new(values, true)),
            Some(Value::String(default.to_owned())),
        )
    }

    /// Item for a typed enumeration, deriving the choice set from a
    /// [`clap::ValueEnum`]. Matching is case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::TypeMismatch`] when the default variant is
    /// hidden from the value set.
    pub fn enum_of<E: ValueEnum>(default: &E) -> Result<Self> {
        let values: Vec<String> = E::value_variants()
            .iter()
            .filter_map(|variant| {
                variant
                    .to_possible_value()
                    .map(|possible| possible.get_name().to_owned())
            })
            .collect();
        let default = default
            .to_possible_value()
            .map(|possible| possible.get_name().to_owned())
            .ok_or_else(|| FlagError::TypeMismatch {
                name: "default".to_owned(),
                kind: "enum".to_owned(),
                value: "default variant is skipped from the value set".to_owned(),
            })?;
        Self::new(
            Kind::Enumeration(EnumValues::new(values, false)),
            Some(Value::String(default)),
        )
    }

    /// Sequence item of members of a fixed choice set.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::TypeMismatch`] when a default element is not a
    /// member of `values`.
    pub fn multi_enumeration<I, S>(default: impl Into<Value>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            Kind::MultiEnumeration(EnumValues::new(values, true)),
            Some(default.into()),
        )
    }

    /// Homogeneous sequence item.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::TypeMismatch`] when a default element does not
    /// fit `element`.
    pub fn sequence(element: ScalarKind, default: impl Into<Value>) -> Result<Self> {
        Self::new(
            Kind::Sequence(SeqSpec::Homogeneous(element)),
            Some(default.into()),
        )
    }

    /// Fixed-arity tuple item with per-position element kinds.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::TypeMismatch`] when the default's arity or
    /// element kinds disagree with `elements`.
    pub fn tuple(elements: Vec<ScalarKind>, default: impl Into<Value>) -> Result<Self> {
        Self::new(Kind::Sequence(SeqSpec::Tuple(elements)), Some(default.into()))
    }

    /// Comma-separated list of strings.
    #[must_use]
    pub fn string_list<I, S>(default: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = default
            .into_iter()
            .map(|item| Value::String(item.into()))
            .collect();
        Self {
            kind: Kind::StringList,
            default: Some(Value::Seq(values)),
            help: None,
            required: false,
        }
    }

    /// String item that accumulates repeated command-line occurrences.
    #[must_use]
    pub fn multi_string<I, S>(default: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = default
            .into_iter()
            .map(|item| Value::String(item.into()))
            .collect();
        Self {
            kind: Kind::MultiString,
            default: Some(Value::Seq(values)),
            help: None,
            required: false,
        }
    }

    /// Timestamp item with an ISO-8601-like default.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::TypeMismatch`] when the default string does not
    /// parse as a timestamp.
    pub fn date_time(default: &str) -> Result<Self> {
        let parsed = Timestamp::parse(default).map_err(|message| FlagError::TypeMismatch {
            name: "default".to_owned(),
            kind: "datetime".to_owned(),
            value: message,
        })?;
        Ok(Self {
            kind: Kind::DateTime,
            default: Some(Value::DateTime(parsed)),
            help: None,
            required: false,
        })
    }

    /// Item backed by a custom kind registered under `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::UnknownKind`] when no capability was registered
    /// under `tag`, or [`FlagError::TypeMismatch`] for a bad default.
    pub fn custom(tag: &str, default: Option<Value>) -> Result<Self> {
        let kind = Kind::Custom(custom_kind(tag)?);
        Self::new(kind, default)
    }

    /// Attaches a help string. Without one, the dotted flag name is used.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// The item's kind.
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// The validated default value, if any.
    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The help string, if one was supplied.
    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Whether the flag must be supplied on the command line.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// One entry in an [`ItemTree`]: a leaf item or a nested tree.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// Leaf definition.
    Leaf(Item),
    /// Nested subtree.
    Tree(ItemTree),
}

impl From<Item> for SchemaNode {
    fn from(item: Item) -> Self {
        Self::Leaf(item)
    }
}

impl From<ItemTree> for SchemaNode {
    fn from(tree: ItemTree) -> Self {
        Self::Tree(tree)
    }
}

/// A flat or nested mapping of names to items.
///
/// Names may not contain the dot separator (dots are reserved for joining
/// paths) and must be unique within one level. Iteration order is the
/// names' sort order, which keeps flag registration deterministic.
#[derive(Debug, Clone, Default)]
pub struct ItemTree {
    entries: BTreeMap<String, SchemaNode>,
}

impl ItemTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a leaf or subtree under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::InvalidName`] for an empty name or one
    /// containing a dot, and [`FlagError::DuplicateName`] when `name` is
    /// already taken at this level.
    pub fn insert(&mut self, name: &str, node: impl Into<SchemaNode>) -> Result<()> {
        validate_segment(name)?;
        if self.entries.contains_key(name) {
            return Err(FlagError::DuplicateName {
                name: name.to_owned(),
            });
        }
        self.entries.insert(name.to_owned(), node.into());
        Ok(())
    }

    /// Chaining form of [`insert`](Self::insert).
    ///
    /// ```rust
    /// use dict_flags::{Item, ItemTree};
    /// # fn main() -> dict_flags::Result<()> {
    /// let tree = ItemTree::new()
    ///     .with("mode", Item::string("pad"))?
    ///     .with(
    ///         "sizes",
    ///         ItemTree::new()
    ///             .with("width", Item::integer(5))?
    ///             .with("height", Item::integer(7))?,
    ///     )?;
    /// assert_eq!(tree.leaves().len(), 3);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// As [`insert`](Self::insert).
    pub fn with(mut self, name: &str, node: impl Into<SchemaNode>) -> Result<Self> {
        self.insert(name, node)?;
        Ok(self)
    }

    /// Whether the tree has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Immediate entries at this level.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Every leaf item paired with its dotted path relative to this tree.
    ///
    /// The returned paths are exactly the leaf-to-root joins, each unique:
    /// leaves and dotted paths are in bijection.
    #[must_use]
    pub fn leaves(&self) -> Vec<(String, &Item)> {
        let mut out = Vec::new();
        collect_leaves(self, None, &mut out);
        out
    }
}

fn collect_leaves<'tree>(
    tree: &'tree ItemTree,
    prefix: Option<&str>,
    out: &mut Vec<(String, &'tree Item)>,
) {
    for (name, node) in &tree.entries {
        let path = prefix.map_or_else(
            || name.clone(),
            |prefix| format!("{prefix}{SEPARATOR}{name}"),
        );
        match node {
            SchemaNode::Leaf(item) => out.push((path, item)),
            SchemaNode::Tree(subtree) => collect_leaves(subtree, Some(&path), out),
        }
    }
}

pub(crate) fn validate_segment(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("names must not be empty")
    } else if name.contains(SEPARATOR) {
        Some("names must not contain '.', which is reserved as the path separator")
    } else if name.chars().any(char::is_whitespace) {
        Some("names must not contain whitespace")
    } else if name.contains('=') || name.starts_with('-') {
        Some("names must not look like command-line syntax")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(FlagError::InvalidName {
            name: name.to_owned(),
            reason: reason.to_owned(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rstest::rstest;

    use super::{Item, ItemTree};
    use crate::error::FlagError;
    use crate::kind::ScalarKind;
    use crate::value::Value;

    fn sample_tree() -> ItemTree {
        ItemTree::new()
            .with("mode", Item::string("pad"))
            .and_then(|tree| {
                tree.with(
                    "sizes",
                    ItemTree::new()
                        .with("width", Item::integer(5))
                        .and_then(|t| t.with("height", Item::integer(7)))
                        .and_then(|t| t.with("scale", Item::float(0.5)))
                        .unwrap(),
                )
            })
            .unwrap()
    }

    #[test]
    fn leaves_are_in_bijection_with_dotted_paths() {
        let tree = sample_tree();
        let paths: Vec<String> = tree.leaves().into_iter().map(|(path, _)| path).collect();
        let unique: BTreeSet<&String> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());
        assert_eq!(
            unique.into_iter().cloned().collect::<Vec<_>>(),
            vec![
                "mode".to_owned(),
                "sizes.height".to_owned(),
                "sizes.scale".to_owned(),
                "sizes.width".to_owned(),
            ],
        );
    }

    #[rstest]
    #[case("has.dot")]
    #[case("")]
    #[case("has space")]
    #[case("-leading")]
    fn invalid_names_are_rejected(#[case] name: &str) {
        let mut tree = ItemTree::new();
        let err = tree.insert(name, Item::integer(1)).unwrap_err();
        assert!(matches!(err, FlagError::InvalidName { .. }), "{err}");
    }

    #[test]
    fn duplicate_names_are_rejected_within_a_level() {
        let mut tree = ItemTree::new();
        tree.insert("x", Item::integer(1)).unwrap();
        let err = tree.insert("x", Item::integer(2)).unwrap_err();
        assert!(matches!(err, FlagError::DuplicateName { .. }));
    }

    #[test]
    fn defaults_are_validated_at_construction() {
        let err = Item::sequence(ScalarKind::Int, vec![Value::String("nope".into())]);
        assert!(matches!(err, Err(FlagError::TypeMismatch { .. })));
    }

    #[test]
    fn enumeration_default_must_be_a_member() {
        let err = Item::enumeration("wrap", ["pad", "crop"]);
        assert!(matches!(err, Err(FlagError::TypeMismatch { .. })));
    }

    #[test]
    fn tuple_defaults_check_arity() {
        let ok = Item::tuple(
            vec![ScalarKind::Int, ScalarKind::Str],
            vec![Value::Int(3), Value::String("pad".into())],
        );
        assert!(ok.is_ok());
        let err = Item::tuple(vec![ScalarKind::Int], vec![Value::Int(3), Value::Int(4)]);
        assert!(matches!(err, Err(FlagError::TypeMismatch { .. })));
    }

    #[test]
    fn required_items_have_no_default() {
        let item = Item::required(crate::Kind::Integer);
        assert!(item.is_required());
        assert!(item.default().is_none());
    }

    #[test]
    fn float_items_accept_integer_defaults() {
        let item = Item::new(crate::Kind::Float, Some(Value::Int(1))).unwrap();
        assert_eq!(item.default(), Some(&Value::Float(1.0)));
    }
}
