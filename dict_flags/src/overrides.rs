//! Scoped flag overrides for test code.
//!
//! Dotted flag names are not valid identifiers, so overrides are supplied
//! as name/value pairs rather than keyword-style arguments. The guard
//! snapshots every named leaf flag individually and restores the snapshots
//! when dropped, on all exit paths including unwinding. Aggregate flags
//! need no snapshot of their own: they are read-through views over the
//! leaves, so there is no aggregate storage to desynchronize.

use std::fmt;

use crate::error::{FlagError, Result};
use crate::registry::Registry;
use crate::value::Value;

impl Registry {
    /// Applies `overrides` to leaf flags and returns a guard that restores
    /// the prior values when dropped.
    ///
    /// ```rust
    /// use dict_flags::{Item, ItemTree, Registry, Value};
    /// # fn main() -> dict_flags::Result<()> {
    /// let registry = Registry::new();
    /// let dict = registry.define_dict(
    ///     "settings",
    ///     ItemTree::new().with("nested", Item::float(1.0))?,
    /// )?;
    /// {
    ///     let _guard = registry
    ///         .scoped_override([("settings.nested", Value::Float(-1.0))])?;
    ///     assert_eq!(dict.leaf("nested"), Some(Value::Float(-1.0)));
    /// }
    /// assert_eq!(dict.leaf("nested"), Some(Value::Float(1.0)));
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::UnknownFlag`] for an unregistered name,
    /// [`FlagError::DirectOverride`] when a name refers to an aggregate
    /// flag, and [`FlagError::TypeMismatch`] for an ill-typed value. On
    /// error, overrides already applied by this call are rolled back.
    pub fn scoped_override<I, S>(&self, overrides: I) -> Result<OverrideGuard>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut guard = OverrideGuard {
            registry: self.clone(),
            saved: Vec::new(),
        };
        for (name, value) in overrides {
            let name = name.into();
            if !self.is_leaf(&name) {
                // Distinguish "not registered" from "that's the aggregate".
                let err = if self.is_defined(&name) {
                    FlagError::DirectOverride { name }
                } else {
                    FlagError::UnknownFlag { name }
                };
                return Err(err);
            }
            let prior = self.leaf_value(&name);
            self.set(&name, value)?;
            guard.saved.push((name, prior));
        }
        Ok(guard)
    }
}

/// RAII guard restoring overridden flags to their prior values.
#[must_use = "dropping the guard immediately restores the prior values"]
pub struct OverrideGuard {
    registry: Registry,
    saved: Vec<(String, Option<Value>)>,
}

impl fmt::Debug for OverrideGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideGuard")
            .field("saved", &self.saved)
            .finish()
    }
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        while let Some((name, prior)) = self.saved.pop() {
            self.registry.restore(&name, prior);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::AssertUnwindSafe;

    use serde_json::json;

    use crate::error::FlagError;
    use crate::item::{Item, ItemTree};
    use crate::registry::Registry;
    use crate::value::Value;

    fn test_registry() -> Registry {
        let registry = Registry::new();
        registry
            .define_leaf("string_flag", Item::string("unchanged"))
            .unwrap();
        let tree = ItemTree::new()
            .with(
                "dict",
                ItemTree::new().with("nested", Item::float(1.0)).unwrap(),
            )
            .unwrap()
            .with("unnested", Item::integer(4))
            .unwrap();
        registry.define_dict("test_dict_flag", tree).unwrap();
        registry
    }

    #[test]
    fn overrides_are_restored_on_drop() {
        let registry = test_registry();
        {
            let _guard = registry
                .scoped_override([
                    ("string_flag".to_owned(), Value::String("new value".into())),
                    ("test_dict_flag.dict.nested".to_owned(), Value::Float(-1.0)),
                ])
                .unwrap();
            assert_eq!(
                registry.value_of("string_flag").unwrap().as_value(),
                Some(&Value::String("new value".into())),
            );
            assert_eq!(
                registry.value_of("test_dict_flag").unwrap().to_json(),
                json!({"dict": {"nested": -1.0}, "unnested": 4}),
            );
        }
        assert_eq!(
            registry.value_of("string_flag").unwrap().as_value(),
            Some(&Value::String("unchanged".into())),
        );
        assert_eq!(
            registry.value_of("test_dict_flag").unwrap().to_json(),
            json!({"dict": {"nested": 1.0}, "unnested": 4}),
        );
    }

    #[test]
    fn leaf_to_aggregate_sync_survives_repeated_scopes() {
        let registry = test_registry();
        for _ in 0..2 {
            let _guard = registry
                .scoped_override([("test_dict_flag.dict.nested", Value::Float(-1.0))])
                .unwrap();
            assert_eq!(
                registry
                    .value_of("test_dict_flag.dict.nested")
                    .unwrap()
                    .as_value(),
                Some(&Value::Float(-1.0)),
            );
        }
        assert_eq!(
            registry.value_of("test_dict_flag").unwrap().to_json(),
            json!({"dict": {"nested": 1.0}, "unnested": 4}),
        );
    }

    #[test]
    fn restoration_happens_on_unwind() {
        let registry = test_registry();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = registry
                .scoped_override([("string_flag", Value::String("boom".into()))])
                .unwrap();
            panic!("scope exits abnormally");
        }));
        assert!(result.is_err());
        assert_eq!(
            registry.value_of("string_flag").unwrap().as_value(),
            Some(&Value::String("unchanged".into())),
        );
    }

    #[test]
    fn aggregate_names_are_rejected() {
        let registry = test_registry();
        let err = registry
            .scoped_override([("test_dict_flag", Value::Int(1))])
            .unwrap_err();
        assert!(matches!(err, FlagError::DirectOverride { .. }));
    }

    #[test]
    fn failed_overrides_roll_back_earlier_ones() {
        let registry = test_registry();
        let err = registry.scoped_override([
            ("string_flag", Value::String("applied".into())),
            ("missing_flag", Value::Int(1)),
        ]);
        assert!(matches!(err, Err(FlagError::UnknownFlag { .. })));
        assert_eq!(
            registry.value_of("string_flag").unwrap().as_value(),
            Some(&Value::String("unchanged".into())),
        );
    }
}
