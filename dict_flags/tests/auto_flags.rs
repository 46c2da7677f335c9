//! End-to-end tests: auto flag groups derived from struct definitions.

use anyhow::Result;
use chrono::NaiveDate;
use dict_flags::{AutoOptions, FlagError, FlagSignature, Registry, Value};
use serde_json::json;

#[derive(Clone, Copy, clap::ValueEnum)]
enum SplitName {
    Train,
    Test,
}

#[derive(FlagSignature)]
struct DataSettings {
    dataset_name: String,
    #[flag(enumeration, help = "which split to load")]
    split: SplitName,
    batch_size: i64,
    shuffle: bool,
    sizes: Vec<i32>,
    crop: (i64, i64),
    threshold: Option<f64>,
    #[flag(skip)]
    rng_seed: u64,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dataset_name: "mnist".to_owned(),
            split: SplitName::Train,
            batch_size: 128,
            shuffle: true,
            sizes: vec![28, 28],
            crop: (24, 24),
            threshold: None,
            rng_seed: 0,
        }
    }
}

#[test]
fn derived_signatures_define_dotted_flags() -> Result<()> {
    let registry = Registry::new();
    let data = registry.define_auto::<DataSettings>("data", &AutoOptions::new())?;
    assert_eq!(
        data.value().to_json(),
        json!({
            "dataset_name": "mnist",
            "split": "train",
            "batch_size": 128,
            "shuffle": true,
            "sizes": [28, 28],
            "crop": [24, 24],
            "threshold": null,
        }),
    );

    registry.parse_from([
        "--data.dataset_name=cifar10",
        "--data.split=TEST",
        "--data.batch_size=256",
        "--nodata.shuffle",
        "--data.sizes=[32, 32]",
        "--data.crop=16,16",
        "--data.threshold=0.9",
    ])?;
    assert_eq!(
        data.value().to_json(),
        json!({
            "dataset_name": "cifar10",
            "split": "test",
            "batch_size": 256,
            "shuffle": false,
            "sizes": [32, 32],
            "crop": [16, 16],
            "threshold": 0.9,
        }),
    );
    Ok(())
}

#[test]
fn skipped_fields_generate_no_flags() -> Result<()> {
    let registry = Registry::new();
    registry.define_auto::<DataSettings>("data", &AutoOptions::new())?;
    assert!(!registry.is_defined("data.rng_seed"));
    let err = registry.parse_from(["--data.rng_seed=7"]).unwrap_err();
    assert!(matches!(err, FlagError::Cli(_)));
    Ok(())
}

#[test]
fn call_site_overrides_do_not_touch_the_flags() -> Result<()> {
    let registry = Registry::new();
    let data = registry.define_auto::<DataSettings>("data", &AutoOptions::new())?;
    let eval_settings = data.value_with([
        ("split", Value::String("test".into())),
        ("shuffle", Value::Bool(false)),
    ])?;
    assert_eq!(
        eval_settings.at("split").and_then(|node| node.as_value()),
        Some(&Value::String("test".into())),
    );
    // The registered flags still hold the defaults.
    assert_eq!(
        data.value().at("split").and_then(|node| node.as_value()),
        Some(&Value::String("train".into())),
    );
    let err = data.value_with([("rng_seed", Value::Int(7))]).unwrap_err();
    assert!(matches!(err, FlagError::UnknownOverride { .. }));
    Ok(())
}

#[derive(FlagSignature)]
struct Schedule {
    start: chrono::NaiveDateTime,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2000, 1, 1)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
        }
    }
}

#[test]
fn datetime_fields_parse_iso_strings() -> Result<()> {
    let registry = Registry::new();
    let schedule = registry.define_auto::<Schedule>("schedule", &AutoOptions::new())?;
    registry.parse_from(["--schedule.start=2024-06-01T12:30:00"])?;
    assert_eq!(
        schedule.value().to_json(),
        json!({"start": "2024-06-01T12:30:00"}),
    );
    Ok(())
}

#[derive(Default, FlagSignature)]
struct HasUnsupported {
    supported: i64,
    lookup: std::collections::HashMap<String, String>,
}

#[test]
fn unsupported_fields_fail_at_definition_time() {
    let registry = Registry::new();
    let err = registry
        .define_auto::<HasUnsupported>("cfg", &AutoOptions::new())
        .unwrap_err();
    match err {
        FlagError::UnsupportedType { param, .. } => assert_eq!(param, "lookup"),
        other => panic!("expected UnsupportedType, got {other:?}"),
    }
    // Nothing was registered for the supported field either.
    assert!(!registry.is_defined("cfg.supported"));
}

#[test]
fn unsupported_fields_can_be_skipped_at_the_call_site() -> Result<()> {
    let registry = Registry::new();
    let handle = registry.define_auto::<HasUnsupported>(
        "cfg",
        &AutoOptions::new().skip(["lookup"]),
    )?;
    assert_eq!(handle.value().to_json(), json!({"supported": 0}));
    Ok(())
}
