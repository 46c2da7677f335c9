//! Signature model for auto-derived flag schemas.
//!
//! A [`Signature`] is the explicit, runtime description of a callable's
//! parameter list: names in declaration order, optional type annotations
//! and optional defaults. Signatures are either hand-built or generated by
//! `#[derive(FlagSignature)]` from a struct with a `Default` implementation.

use std::collections::BTreeSet;

use clap::ValueEnum;
use tracing::warn;

use crate::error::{FlagError, Result};
use crate::item::{Item, ItemTree};
use crate::kind::{EnumValues, Kind, ScalarKind, SeqSpec};
use crate::value::Value;

/// Type annotation of one signature parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// `bool`.
    Bool,
    /// Any integer type.
    Int,
    /// Any floating-point type.
    Float,
    /// String.
    Str,
    /// ISO-8601-like timestamp.
    DateTime,
    /// Enumeration over a fixed name set, matched case-insensitively.
    Enumeration(Vec<String>),
    /// Homogeneous sequence of one scalar kind.
    Sequence(ScalarKind),
    /// Fixed-arity tuple with per-position scalar kinds.
    Tuple(Vec<ScalarKind>),
    /// Optional wrapper; derivation unwraps to the inner spec.
    Optional(Box<TypeSpec>),
    /// Any annotation the schema builder cannot map to a flag kind.
    /// Carries the type's display name for error reporting.
    Other(String),
}

impl TypeSpec {
    /// Enumeration spec for a [`clap::ValueEnum`] type.
    #[must_use]
    pub fn enumeration_of<E: ValueEnum>() -> Self {
        Self::Enumeration(
            E::value_variants()
                .iter()
                .filter_map(|variant| {
                    variant
                        .to_possible_value()
                        .map(|possible| possible.get_name().to_owned())
                })
                .collect(),
        )
    }

    fn display_name(&self) -> String {
        match self {
            Self::Bool => "bool".to_owned(),
            Self::Int => "int".to_owned(),
            Self::Float => "float".to_owned(),
            Self::Str => "str".to_owned(),
            Self::DateTime => "datetime".to_owned(),
            Self::Enumeration(values) => format!("enum<{}>", values.join("|")),
            Self::Sequence(_) => "sequence".to_owned(),
            Self::Tuple(_) => "tuple".to_owned(),
            Self::Optional(inner) => format!("optional {}", inner.display_name()),
            Self::Other(name) => name.clone(),
        }
    }
}

/// Default state of one signature parameter.
///
/// Distinguishes a parameter with *no* default from one whose default is
/// an explicit "nothing" (an optional parameter defaulting to `None`).
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDefault {
    /// The parameter has no default at all.
    Missing,
    /// The parameter defaults to "no value".
    Null,
    /// A concrete default value.
    Value(Value),
}

/// One formal parameter of a signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    spec: Option<TypeSpec>,
    default: ParamDefault,
    help: Option<String>,
}

impl Param {
    /// A parameter with no annotation and no default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: None,
            default: ParamDefault::Missing,
            help: None,
        }
    }

    /// Attaches a type annotation.
    #[must_use]
    pub fn annotated(mut self, spec: TypeSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Attaches a concrete default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = ParamDefault::Value(value.into());
        self
    }

    /// Marks the default as an explicit "no value".
    #[must_use]
    pub fn with_null_default(mut self) -> Self {
        self.default = ParamDefault::Null;
        self
    }

    /// Sets the default state directly; used by generated code.
    #[must_use]
    pub fn defaulted(mut self, default: ParamDefault) -> Self {
        self.default = default;
        self
    }

    /// Attaches a help string.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// The parameter's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An ordered parameter list describing a callable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    /// An empty signature.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn push(&mut self, param: Param) {
        self.params.push(param);
    }

    /// Chaining form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, param: Param) -> Self {
        self.push(param);
        self
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

/// Options controlling [`auto_schema`] derivation.
#[derive(Debug, Clone, Default)]
pub struct AutoOptions {
    skip: BTreeSet<String>,
    allow_no_defaults: bool,
}

impl AutoOptions {
    /// The default options: nothing skipped, missing defaults are errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameter names to skip defining flags for.
    #[must_use]
    pub fn skip<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip.extend(names.into_iter().map(Into::into));
        self
    }

    /// Opt into omitting (rather than erroring on) parameters without a
    /// default value. Never the default: silent omission hides mistakes.
    #[must_use]
    pub fn allow_no_defaults(mut self, allow: bool) -> Self {
        self.allow_no_defaults = allow;
        self
    }
}

/// Builds an [`ItemTree`] from a signature.
///
/// Parameters named in the skip set are omitted. The derivation fails
/// eagerly, at definition time, never at parse time.
///
/// # Errors
///
/// Returns [`FlagError::MissingDefault`] for a parameter without a default
/// (unless `allow_no_defaults` was opted into, in which case the parameter
/// is omitted with a warning), [`FlagError::MissingAnnotation`] for one
/// without a type annotation, [`FlagError::UnsupportedType`] for an
/// annotation with no matching flag kind, and
/// [`FlagError::TypeMismatch`] when a default disagrees with its
/// annotation.
pub fn auto_schema(signature: &Signature, options: &AutoOptions) -> Result<ItemTree> {
    let mut tree = ItemTree::new();
    for param in signature.params() {
        if options.skip.contains(param.name()) {
            continue;
        }
        let default = match &param.default {
            ParamDefault::Missing => {
                if options.allow_no_defaults {
                    warn!(
                        param = param.name(),
                        "omitting parameter without a default value"
                    );
                    continue;
                }
                return Err(FlagError::MissingDefault {
                    param: param.name().to_owned(),
                });
            }
            ParamDefault::Null => None,
            ParamDefault::Value(value) => Some(value.clone()),
        };
        let Some(spec) = &param.spec else {
            return Err(FlagError::MissingAnnotation {
                param: param.name().to_owned(),
            });
        };
        let kind = kind_for(spec, param.name())?;
        let mut item = Item::new(kind, default)?;
        if let Some(help) = &param.help {
            item = item.with_help(help.clone());
        }
        tree.insert(param.name(), item)?;
    }
    Ok(tree)
}

fn kind_for(spec: &TypeSpec, param: &str) -> Result<Kind> {
    match spec {
        TypeSpec::Bool => Ok(Kind::Boolean),
        TypeSpec::Int => Ok(Kind::Integer),
        TypeSpec::Float => Ok(Kind::Float),
        TypeSpec::Str => Ok(Kind::String),
        TypeSpec::DateTime => Ok(Kind::DateTime),
        TypeSpec::Enumeration(values) => Ok(Kind::Enumeration(EnumValues::new(
            values.clone(),
            false,
        ))),
        TypeSpec::Sequence(scalar) => Ok(Kind::Sequence(SeqSpec::Homogeneous(*scalar))),
        TypeSpec::Tuple(scalars) => Ok(Kind::Sequence(SeqSpec::Tuple(scalars.clone()))),
        TypeSpec::Optional(inner) => kind_for(inner, param),
        TypeSpec::Other(_) => Err(FlagError::UnsupportedType {
            param: param.to_owned(),
            annotation: spec.display_name(),
        }),
    }
}
