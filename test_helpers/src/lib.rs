//! Test helpers shared across the dict-flags workspace.
//!
//! Provides common schema fixtures plus a guard serializing access to the
//! process-global custom-kind table, which is the one piece of shared
//! state tests can race on.

use dict_flags::{Item, ItemTree, Param, Result, Signature, TypeSpec};
use parking_lot::{Mutex, MutexGuard};

static KIND_TABLE_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that touch the process-global custom-kind table.
///
/// Hold the returned guard for the duration of the test.
pub fn kind_table_guard() -> MutexGuard<'static, ()> {
    KIND_TABLE_LOCK.lock()
}

/// The nested image-settings schema used as a worked example throughout
/// the test suites.
///
/// # Errors
///
/// Propagates schema construction failures; the fixture is well-formed,
/// so callers treat an error as a test bug.
pub fn image_settings_tree() -> Result<ItemTree> {
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

/// A two-parameter signature `(a: int = 1, b: str = "x")`.
#[must_use]
pub fn two_param_signature() -> Signature {
    Signature::new()
        .with(Param::new("a").annotated(TypeSpec::Int).with_default(1))
        .with(Param::new("b").annotated(TypeSpec::Str).with_default("x"))
}
