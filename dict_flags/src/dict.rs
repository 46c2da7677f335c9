//! Dict flags: one aggregate flag backed by dot-named leaf flags.

use std::fmt;

use crate::error::Result;
use crate::item::ItemTree;
use crate::registry::Registry;
use crate::value::{DictValue, Value};

impl Registry {
    /// Defines a flat or nested dict flag.
    ///
    /// Every leaf of `tree` is registered as its own flag under
    /// `name.<path>`, and `name` itself is registered as the aggregate
    /// flag. The leaves are the single source of truth: the aggregate is a
    /// read-through view over them, so overriding `name.sub.leaf` on the
    /// command line is immediately visible through the returned handle.
    ///
    /// ```rust
    /// use dict_flags::{Item, ItemTree, Registry, Value};
    /// # fn main() -> dict_flags::Result<()> {
    /// let registry = Registry::new();
    /// let settings = registry.define_dict(
    ///     "image_settings",
    ///     ItemTree::new()
    ///         .with("mode", Item::string("pad"))?
    ///         .with(
    ///             "sizes",
    ///             ItemTree::new()
    ///                 .with("width", Item::integer(5))?
    ///                 .with("height", Item::integer(7))?,
    ///         )?,
    /// )?;
    /// registry.parse_from(["--image_settings.sizes.height=10"])?;
    /// assert_eq!(
    ///     settings.leaf("sizes.height"),
    ///     Some(Value::Int(10)),
    /// );
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::EmptySchema`](crate::FlagError::EmptySchema)
    /// for an empty tree and
    /// [`FlagError::DuplicateName`](crate::FlagError::DuplicateName) when
    /// `name` or any generated dotted name collides with an existing flag.
    /// On error nothing is registered: a dict flag is fully defined or not
    /// defined at all.
    pub fn define_dict(&self, name: &str, tree: ItemTree) -> Result<DictHandle> {
        self.define_tree(name, &tree, None)?;
        Ok(DictHandle {
            registry: self.clone(),
            name: name.to_owned(),
        })
    }
}

/// Handle to a defined dict flag.
#[derive(Clone)]
pub struct DictHandle {
    registry: Registry,
    name: String,
}

impl fmt::Debug for DictHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictHandle")
            .field("name", &self.name)
            .finish()
    }
}

impl DictHandle {
    /// The aggregate flag's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current aggregate mapping, rebuilt from the live leaf flags on
    /// every call.
    #[must_use]
    pub fn value(&self) -> DictValue {
        self.registry
            .value_of(&self.name)
            .unwrap_or_else(|_| DictValue::Map(std::collections::BTreeMap::new()))
    }

    /// Convenience read of one leaf by its path relative to this dict.
    #[must_use]
    pub fn leaf(&self, path: &str) -> Option<Value> {
        self.value().at(path)?.as_value().cloned()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::error::FlagError;
    use crate::item::{Item, ItemTree};
    use crate::registry::Registry;
    use crate::value::Value;

    fn image_settings() -> crate::error::Result<ItemTree> {
        Ok(ItemTree::new()
            .with("mode", Item::string("pad"))?
            .with(
                "sizes",
                ItemTree::new()
                    .with("width", Item::integer(5))?
                    .with("height", Item::integer(7))?
                    .with("scale", Item::float(0.5))?,
            )?)
    }

    #[test]
    fn aggregate_reflects_defaults() {
        let registry = Registry::new();
        let handle = registry
            .define_dict("image_settings", image_settings().unwrap())
            .unwrap();
        assert_eq!(
            handle.value().to_json(),
            json!({
                "mode": "pad",
                "sizes": {"width": 5, "height": 7, "scale": 0.5},
            }),
        );
    }

    #[test]
    fn overriding_one_leaf_changes_only_that_path() {
        let registry = Registry::new();
        let handle = registry
            .define_dict("image_settings", image_settings().unwrap())
            .unwrap();
        registry
            .parse_from(["--image_settings.sizes.height=10"])
            .unwrap();
        assert_eq!(
            handle.value().to_json(),
            json!({
                "mode": "pad",
                "sizes": {"width": 5, "height": 10, "scale": 0.5},
            }),
        );
    }

    #[test]
    fn aggregate_is_read_through_not_a_snapshot() {
        let registry = Registry::new();
        let handle = registry
            .define_dict("image_settings", image_settings().unwrap())
            .unwrap();
        let before = handle.value();
        registry
            .set("image_settings.mode", Value::String("crop".into()))
            .unwrap();
        assert_ne!(handle.value(), before);
        assert_eq!(handle.leaf("mode"), Some(Value::String("crop".into())));
        // Repeated overrides keep being observed.
        registry
            .set("image_settings.mode", Value::String("pad".into()))
            .unwrap();
        assert_eq!(handle.value(), before);
    }

    #[test]
    fn dotted_leaf_and_aggregate_are_both_entry_points() {
        let registry = Registry::new();
        let handle = registry
            .define_dict("image_settings", image_settings().unwrap())
            .unwrap();
        registry.parse_from(["--image_settings.mode=crop"]).unwrap();
        assert_eq!(
            registry.value_of("image_settings.mode").unwrap().as_value(),
            Some(&Value::String("crop".into())),
        );
        assert_eq!(handle.leaf("mode"), Some(Value::String("crop".into())));
    }

    #[test]
    fn same_leaf_name_under_different_dicts_does_not_collide() {
        let registry = Registry::new();
        let replay = ItemTree::new().with("capacity", Item::integer(100)).unwrap();
        let cache = ItemTree::new().with("capacity", Item::integer(16)).unwrap();
        registry.define_dict("replay", replay).unwrap();
        registry.define_dict("cache", cache).unwrap();
        registry.parse_from(["--replay.capacity=200"]).unwrap();
        assert_eq!(
            registry.value_of("replay.capacity").unwrap().as_value(),
            Some(&Value::Int(200)),
        );
        assert_eq!(
            registry.value_of("cache.capacity").unwrap().as_value(),
            Some(&Value::Int(16)),
        );
    }

    #[test]
    fn empty_schemas_are_rejected() {
        let registry = Registry::new();
        let err = registry
            .define_dict("empty", ItemTree::new())
            .unwrap_err();
        assert!(matches!(err, FlagError::EmptySchema { .. }));
    }

    #[test]
    fn colliding_definitions_register_nothing() {
        let registry = Registry::new();
        registry
            .define_leaf("settings.mode", Item::string("taken"))
            .unwrap();
        let tree = ItemTree::new()
            .with("other", Item::integer(1))
            .unwrap()
            .with("mode", Item::string("pad"))
            .unwrap();
        let err = registry.define_dict("settings", tree).unwrap_err();
        assert!(matches!(err, FlagError::DuplicateName { .. }));
        // The non-colliding leaf must not have been registered either.
        assert!(!registry.is_defined("settings.other"));
        assert!(!registry.is_defined("settings"));
    }

    #[test]
    fn dict_top_level_name_collision_is_rejected() {
        let registry = Registry::new();
        registry.define_leaf("settings", Item::integer(1)).unwrap();
        let tree = ItemTree::new().with("mode", Item::string("pad")).unwrap();
        let err = registry.define_dict("settings", tree).unwrap_err();
        assert!(matches!(err, FlagError::DuplicateName { .. }));
    }
}
