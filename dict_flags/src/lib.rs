//! Structured "dict" and "auto" flag groups with dotted-name overrides.
//!
//! This crate is a thin extension over command-line flag parsing: a schema
//! of [`Item`]s arranged in an [`ItemTree`] is registered as one aggregate
//! flag plus one dot-named flag per leaf, so `--settings.sizes.height=10`
//! overrides a single entry while `settings` reads back as a live nested
//! mapping. Auto flag groups derive the schema from a type's
//! [`FlagSignature`] instead of a hand-written tree.
//!
//! ```rust
//! use dict_flags::{Item, ItemTree, Registry, Value};
//! # fn main() -> dict_flags::Result<()> {
//! let registry = Registry::new();
//! let settings = registry.define_dict(
//!     "image_settings",
//!     ItemTree::new()
//!         .with("mode", Item::string("pad"))?
//!         .with(
//!             "sizes",
//!             ItemTree::new()
//!                 .with("width", Item::integer(5))?
//!                 .with("height", Item::integer(7))?,
//!         )?,
//! )?;
//!
//! registry.parse_from(["--image_settings.sizes.height=10"])?;
//! assert_eq!(settings.leaf("sizes.height"), Some(Value::Int(10)));
//! # Ok(())
//! # }
//! ```
//!
//! The aggregate value is always a read-through view over the leaf flags,
//! never a snapshot: the leaves are the single source of truth, and every
//! access reconstructs the mapping from their current values.

pub use dict_flags_macros::FlagSignature;

mod auto;
mod dict;
mod error;
mod item;
mod kind;
mod overrides;
mod registry;
mod value;

pub use auto::{AutoHandle, AutoOptions, FlagSignature, Param, ParamDefault, Signature, TypeSpec, auto_schema};
pub use dict::DictHandle;
pub use error::{FlagError, Result};
pub use item::{Item, ItemTree, SEPARATOR, SchemaNode};
pub use kind::{CustomKind, EnumValues, Kind, ScalarKind, SeqSpec, register_custom_kind};
pub use overrides::OverrideGuard;
pub use registry::{LeafHandle, Registry};
pub use value::{DictValue, Timestamp, Value};
