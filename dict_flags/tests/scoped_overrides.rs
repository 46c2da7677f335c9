//! End-to-end tests: scoped overrides across plain, dict and auto flags.

use anyhow::Result;
use dict_flags::{Item, Registry, Value};
use serde_json::json;
use test_helpers::{image_settings_tree, two_param_signature};

fn build_registry() -> Result<Registry> {
    let registry = Registry::new();
    registry.define_leaf("string_flag", Item::string("unchanged"))?;
    registry.define_dict("image_settings", image_settings_tree()?)?;
    registry.define_auto_signature("cfg", &two_param_signature(), &dict_flags::AutoOptions::new())?;
    Ok(registry)
}

#[test]
fn overrides_span_flag_categories_and_restore() -> Result<()> {
    let registry = build_registry()?;
    {
        let _guard = registry.scoped_override([
            ("string_flag", Value::String("new value".into())),
            ("image_settings.sizes.height", Value::Int(10)),
            ("cfg.b", Value::String("y".into())),
        ])?;
        assert_eq!(
            registry.value_of("image_settings")?.to_json(),
            json!({
                "mode": "pad",
                "sizes": {"width": 5, "height": 10, "scale": 0.5},
            }),
        );
        assert_eq!(registry.value_of("cfg")?.to_json(), json!({"a": 1, "b": "y"}));
    }
    assert_eq!(
        registry.value_of("image_settings")?.to_json(),
        json!({
            "mode": "pad",
            "sizes": {"width": 5, "height": 7, "scale": 0.5},
        }),
    );
    assert_eq!(registry.value_of("cfg")?.to_json(), json!({"a": 1, "b": "x"}));
    assert_eq!(
        registry.value_of("string_flag")?.as_value(),
        Some(&Value::String("unchanged".into())),
    );
    Ok(())
}

#[test]
fn leaf_sync_still_works_after_restoration() -> Result<()> {
    // Guards restore leaf flags individually; the aggregate keeps tracking
    // them afterwards because it is a view, not a restored snapshot.
    let registry = build_registry()?;
    {
        let _guard = registry
            .scoped_override([("image_settings.sizes.height", Value::Int(10))])?;
    }
    registry.parse_from(["--image_settings.sizes.height=11"])?;
    assert_eq!(
        registry
            .value_of("image_settings")?
            .at("sizes.height")
            .and_then(|node| node.as_value()),
        Some(&Value::Int(11)),
    );
    Ok(())
}
