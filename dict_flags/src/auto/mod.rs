//! Auto flags: flag groups derived from a callable-style signature.

mod signature;

pub use signature::{AutoOptions, Param, ParamDefault, Signature, TypeSpec, auto_schema};

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{FlagError, Result};
use crate::registry::Registry;
use crate::value::{DictValue, Value};

/// Types that can describe themselves as a flag signature.
///
/// Usually implemented via `#[derive(FlagSignature)]` on a struct with a
/// `Default` implementation; the fields become parameters, the field types
/// become annotations and `Default::default()` supplies the defaults.
pub trait FlagSignature {
    /// The signature derived from the type's definition.
    fn signature() -> Signature;
}

impl Registry {
    /// Defines an auto flag group for a [`FlagSignature`] type.
    ///
    /// Equivalent to deriving a schema with [`auto_schema`] and defining it
    /// as a dict flag named `name`; each parameter becomes an overridable
    /// `name.<param>` flag.
    ///
    /// # Errors
    ///
    /// As [`auto_schema`] and
    /// [`define_dict`](Registry::define_dict).
    pub fn define_auto<T: FlagSignature>(
        &self,
        name: &str,
        options: &AutoOptions,
    ) -> Result<AutoHandle> {
        self.define_auto_signature(name, &T::signature(), options)
    }

    /// Defines an auto flag group from a hand-built signature.
    ///
    /// # Errors
    ///
    /// As [`define_auto`](Registry::define_auto).
    pub fn define_auto_signature(
        &self,
        name: &str,
        signature: &Signature,
        options: &AutoOptions,
    ) -> Result<AutoHandle> {
        let tree = auto_schema(signature, options)?;
        self.define_tree(name, &tree, None)?;
        let keys = tree
            .leaves()
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        Ok(AutoHandle {
            registry: self.clone(),
            name: name.to_owned(),
            keys,
        })
    }
}

/// Handle to a defined auto flag group.
///
/// Besides the live aggregate read, the handle supports call-site-local
/// keyword overrides: [`value_with`](Self::value_with) layers ad hoc
/// values over the current mapping without touching the registered flags,
/// which stay the single source of truth for everyone else.
#[derive(Clone)]
pub struct AutoHandle {
    registry: Registry,
    name: String,
    keys: BTreeSet<String>,
}

impl fmt::Debug for AutoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoHandle")
            .field("name", &self.name)
            .field("keys", &self.keys)
            .finish()
    }
}

impl AutoHandle {
    /// The aggregate flag's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the generated leaf flags, relative to this group.
    #[must_use]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// The current aggregate mapping, rebuilt from the live leaf flags.
    #[must_use]
    pub fn value(&self) -> DictValue {
        self.registry
            .value_of(&self.name)
            .unwrap_or_else(|_| DictValue::Map(std::collections::BTreeMap::new()))
    }

    /// The current aggregate mapping with `overrides` applied on top.
    ///
    /// The registered flags are not mutated: two calls with different
    /// overrides see the same underlying values.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::UnknownOverride`] for a key that does not name
    /// a generated leaf, and [`FlagError::TypeMismatch`] when an override
    /// value does not fit the leaf's kind.
    pub fn value_with<I, S>(&self, overrides: I) -> Result<DictValue>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut entries = match self.value() {
            DictValue::Map(entries) => entries,
            DictValue::Leaf(_) => std::collections::BTreeMap::new(),
        };
        for (key, value) in overrides {
            let key = key.into();
            if !self.keys.contains(&key) {
                return Err(FlagError::UnknownOverride {
                    name: self.name.clone(),
                    key,
                });
            }
            let dotted = format!("{}.{}", self.name, key);
            let checked = match self.registry.leaf_kind(&dotted) {
                Some(kind) => {
                    kind.check(&value)
                        .map_err(|message| FlagError::TypeMismatch {
                            name: dotted,
                            kind: kind.name().to_owned(),
                            value: message,
                        })?
                }
                None => value,
            };
            entries.insert(key, DictValue::Leaf(Some(checked)));
        }
        Ok(DictValue::Map(entries))
    }
}
