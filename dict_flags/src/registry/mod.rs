//! The flag registry: a named, typed, help-stringed settings store with
//! lookup, set, parse and teardown operations.
//!
//! The registry is an explicit context object rather than process-global
//! state, so the core stays testable without cross-test interference. It is
//! cheap to clone (handles share the same underlying store) and is
//! deliberately single-threaded: registration happens once during program
//! setup, the parse step mutates each flag at most once, and reads happen
//! afterwards.

mod cli;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{FlagError, Result};
use crate::item::{Item, ItemTree, SEPARATOR, SchemaNode, validate_segment};
use crate::kind::ScalarKind;
use crate::value::{DictValue, Value};

/// Shared, single-threaded flag store.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Default)]
struct Inner {
    slots: BTreeMap<String, Slot>,
    /// Negated boolean alias (`no<name>`) to flag name.
    aliases: BTreeMap<String, String>,
}

enum Slot {
    Leaf(LeafSlot),
    Aggregate(AggregateSlot),
}

struct LeafSlot {
    item: Item,
    current: Option<Value>,
}

struct AggregateSlot {
    shape: BTreeMap<String, ShapeNode>,
    help: String,
}

/// Shape of an aggregate flag: leaf slots hold the full dotted flag name.
enum ShapeNode {
    Leaf(String),
    Tree(BTreeMap<String, ShapeNode>),
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single leaf flag under `name` (which may be dotted).
    ///
    /// Boolean leaves atomically reserve their negated `no<name>` alias as
    /// well.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::InvalidName`] for a malformed name and
    /// [`FlagError::DuplicateName`] when the name or its negated alias is
    /// already taken.
    pub fn define_leaf(&self, name: &str, item: Item) -> Result<LeafHandle> {
        validate_flag_name(name)?;
        let mut inner = self.inner.borrow_mut();
        inner.check_available(name)?;
        if item.kind().is_boolean() {
            inner.check_available(&format!("no{name}"))?;
        }
        inner.insert_leaf(name, item);
        debug!(flag = name, "registered leaf flag");
        Ok(LeafHandle {
            registry: self.clone(),
            name: name.to_owned(),
        })
    }

    /// Convenience for a standalone homogeneous sequence flag.
    ///
    /// # Errors
    ///
    /// As [`define_leaf`](Self::define_leaf), plus
    /// [`FlagError::TypeMismatch`] for a bad default.
    pub fn define_sequence(
        &self,
        name: &str,
        element: ScalarKind,
        default: impl Into<Value>,
        help: &str,
    ) -> Result<LeafHandle> {
        self.define_leaf(name, Item::sequence(element, default)?.with_help(help))
    }

    /// Convenience for a standalone repeated-occurrence string flag.
    ///
    /// # Errors
    ///
    /// As [`define_leaf`](Self::define_leaf).
    pub fn define_multi_string<I, S>(&self, name: &str, default: I, help: &str) -> Result<LeafHandle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.define_leaf(name, Item::multi_string(default).with_help(help))
    }

    /// Whether any flag (leaf or aggregate) is registered under `name`.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.inner.borrow().slots.contains_key(name)
    }

    /// Names of every registered flag, in sorted order.
    #[must_use]
    pub fn flag_names(&self) -> Vec<String> {
        self.inner.borrow().slots.keys().cloned().collect()
    }

    /// The current value of a flag.
    ///
    /// Leaves yield [`DictValue::Leaf`]; aggregate flags yield a
    /// [`DictValue::Map`] reconstructed from their leaf flags on every call.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::UnknownFlag`] when no flag is registered under
    /// `name`.
    pub fn value_of(&self, name: &str) -> Result<DictValue> {
        let inner = self.inner.borrow();
        match inner.slots.get(name) {
            Some(Slot::Leaf(leaf)) => Ok(DictValue::Leaf(leaf.current.clone())),
            Some(Slot::Aggregate(aggregate)) => Ok(inner.view(&aggregate.shape)),
            None => Err(FlagError::UnknownFlag {
                name: name.to_owned(),
            }),
        }
    }

    /// Overrides a leaf flag's current value, checking it against the
    /// leaf's kind.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::UnknownFlag`] for an unregistered name,
    /// [`FlagError::DirectOverride`] when `name` is an aggregate flag, and
    /// [`FlagError::TypeMismatch`] when the value does not fit.
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        match inner.slots.get_mut(name) {
            Some(Slot::Leaf(leaf)) => {
                let checked =
                    leaf.item
                        .kind()
                        .check(&value)
                        .map_err(|message| FlagError::TypeMismatch {
                            name: name.to_owned(),
                            kind: leaf.item.kind().name().to_owned(),
                            value: message,
                        })?;
                leaf.current = Some(checked);
                Ok(())
            }
            Some(Slot::Aggregate(_)) => Err(FlagError::DirectOverride {
                name: name.to_owned(),
            }),
            None => Err(FlagError::UnknownFlag {
                name: name.to_owned(),
            }),
        }
    }

    /// Serializes a flag back to its command-line token form.
    ///
    /// Booleans serialize to `--name` / `--noname`; repeated-occurrence
    /// flags to one `--name=value` token per element, newline-joined; and
    /// aggregate flags to the empty sentinel accepted (and ignored) on
    /// re-parse. An unset flag serializes to the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::UnknownFlag`] when no flag is registered under
    /// `name`.
    pub fn serialize_flag(&self, name: &str) -> Result<String> {
        let inner = self.inner.borrow();
        match inner.slots.get(name) {
            Some(Slot::Leaf(leaf)) => {
                let Some(current) = &leaf.current else {
                    return Ok(String::new());
                };
                if leaf.item.kind().is_boolean() {
                    return Ok(match current.as_bool() {
                        Some(true) => format!("--{name}"),
                        _ => format!("--no{name}"),
                    });
                }
                if leaf.item.kind().is_multi() {
                    let elements = current.as_seq().unwrap_or_default();
                    return Ok(elements
                        .iter()
                        .map(|element| format!("--{name}={element}"))
                        .collect::<Vec<_>>()
                        .join("\n"));
                }
                Ok(format!("--{name}={}", leaf.item.kind().serialize(current)))
            }
            Some(Slot::Aggregate(_)) => Ok(String::new()),
            None => Err(FlagError::UnknownFlag {
                name: name.to_owned(),
            }),
        }
    }

    /// Clears every registered flag. Handles held by callers keep working
    /// as names only; their lookups will miss until redefinition.
    pub fn reset(&self) {
        self.inner.borrow_mut().slots.clear();
        self.inner.borrow_mut().aliases.clear();
    }

    /// Registers every leaf of `tree` under `name.<path>` plus the
    /// aggregate slot for `name` itself. The whole batch is validated
    /// before anything is registered: a dict flag is fully defined or not
    /// defined at all.
    pub(crate) fn define_tree(&self, name: &str, tree: &ItemTree, help: Option<&str>) -> Result<()> {
        validate_flag_name(name)?;
        if tree.is_empty() {
            return Err(FlagError::EmptySchema {
                name: name.to_owned(),
            });
        }

        let leaves: Vec<(String, &Item)> = tree
            .leaves()
            .into_iter()
            .map(|(path, item)| (format!("{name}{SEPARATOR}{path}"), item))
            .collect();

        {
            let inner = self.inner.borrow();
            inner.check_available(name)?;
            let mut batch = std::collections::BTreeSet::new();
            for (dotted, item) in &leaves {
                inner.check_available(dotted)?;
                if !batch.insert(dotted.clone()) {
                    return Err(FlagError::DuplicateName {
                        name: dotted.clone(),
                    });
                }
                if item.kind().is_boolean() {
                    let alias = format!("no{dotted}");
                    inner.check_available(&alias)?;
                    if !batch.insert(alias.clone()) {
                        return Err(FlagError::DuplicateName { name: alias });
                    }
                }
            }
        }

        let mut inner = self.inner.borrow_mut();
        for (dotted, item) in leaves {
            inner.insert_leaf(&dotted, item.clone());
        }
        inner.slots.insert(
            name.to_owned(),
            Slot::Aggregate(AggregateSlot {
                shape: shape_of(name, tree),
                help: help.map_or_else(|| name.to_owned(), str::to_owned),
            }),
        );
        debug!(flag = name, "registered dict flag");
        Ok(())
    }

    pub(crate) fn leaf_value(&self, name: &str) -> Option<Value> {
        match self.inner.borrow().slots.get(name) {
            Some(Slot::Leaf(leaf)) => leaf.current.clone(),
            _ => None,
        }
    }

    /// Restores a saved value without kind checking; used by scoped
    /// overrides, whose snapshots came out of the same slot.
    pub(crate) fn restore(&self, name: &str, value: Option<Value>) {
        if let Some(Slot::Leaf(leaf)) = self.inner.borrow_mut().slots.get_mut(name) {
            leaf.current = value;
        }
    }

    pub(crate) fn leaf_kind(&self, name: &str) -> Option<crate::kind::Kind> {
        match self.inner.borrow().slots.get(name) {
            Some(Slot::Leaf(leaf)) => Some(leaf.item.kind().clone()),
            _ => None,
        }
    }

    pub(crate) fn is_leaf(&self, name: &str) -> bool {
        matches!(self.inner.borrow().slots.get(name), Some(Slot::Leaf(_)))
    }

    pub(crate) fn set_parsed(&self, name: &str, value: Value) {
        if let Some(Slot::Leaf(leaf)) = self.inner.borrow_mut().slots.get_mut(name) {
            leaf.current = Some(value);
        }
    }
}

impl Inner {
    fn check_available(&self, name: &str) -> Result<()> {
        if self.slots.contains_key(name) || self.aliases.contains_key(name) {
            return Err(FlagError::DuplicateName {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn insert_leaf(&mut self, name: &str, item: Item) {
        if item.kind().is_boolean() {
            self.aliases.insert(format!("no{name}"), name.to_owned());
        }
        let current = item.default().cloned();
        self.slots
            .insert(name.to_owned(), Slot::Leaf(LeafSlot { item, current }));
    }

    /// Rebuilds the aggregate view from the live leaf slots.
    fn view(&self, shape: &BTreeMap<String, ShapeNode>) -> DictValue {
        DictValue::Map(
            shape
                .iter()
                .map(|(name, node)| (name.clone(), self.view_node(node)))
                .collect(),
        )
    }

    fn view_node(&self, node: &ShapeNode) -> DictValue {
        match node {
            ShapeNode::Leaf(dotted) => DictValue::Leaf(match self.slots.get(dotted) {
                Some(Slot::Leaf(leaf)) => leaf.current.clone(),
                _ => None,
            }),
            ShapeNode::Tree(entries) => self.view(entries),
        }
    }
}

fn shape_of(prefix: &str, tree: &ItemTree) -> BTreeMap<String, ShapeNode> {
    tree.entries()
        .map(|(name, node)| {
            let dotted = format!("{prefix}{SEPARATOR}{name}");
            let shape = match node {
                SchemaNode::Leaf(_) => ShapeNode::Leaf(dotted),
                SchemaNode::Tree(subtree) => ShapeNode::Tree(shape_of(&dotted, subtree)),
            };
            (name.to_owned(), shape)
        })
        .collect()
}

fn validate_flag_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FlagError::InvalidName {
            name: name.to_owned(),
            reason: "flag names must not be empty".to_owned(),
        });
    }
    for segment in name.split(SEPARATOR) {
        validate_segment(segment).map_err(|_| FlagError::InvalidName {
            name: name.to_owned(),
            reason: "flag name segments must be non-empty and free of separators".to_owned(),
        })?;
    }
    Ok(())
}

/// Handle to a registered leaf flag.
///
/// `value` is a live read of the registry slot, not a cached copy, so
/// later overrides are observed without re-registration.
#[derive(Clone)]
pub struct LeafHandle {
    registry: Registry,
    name: String,
}

impl fmt::Debug for LeafHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafHandle")
            .field("name", &self.name)
            .finish()
    }
}

impl LeafHandle {
    /// The full dotted flag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value of the flag; `None` when the flag has no default and
    /// has not been set.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.registry.leaf_value(&self.name)
    }

    /// Overrides the flag's value, as [`Registry::set`].
    ///
    /// # Errors
    ///
    /// As [`Registry::set`].
    pub fn set(&self, value: Value) -> Result<()> {
        self.registry.set(&self.name, value)
    }
}
