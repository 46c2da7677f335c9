//! Error types produced while defining, parsing and overriding flags.

use thiserror::Error;

/// Convenience alias for results carrying a [`FlagError`].
pub type Result<T> = std::result::Result<T, FlagError>;

/// Errors raised by flag definition, command-line parsing and overrides.
///
/// Definition-time variants (`DuplicateName`, `InvalidName`, `EmptySchema`,
/// `MissingAnnotation`, `MissingDefault`, `UnsupportedType`, `TypeMismatch`,
/// `UnknownKind`) are fatal: they are raised before the command line is
/// parsed, so configuration mistakes surface during program setup rather
/// than in the middle of a run. Parse-time variants (`Cli`, `Parse`) are
/// reported to the end user by the caller of
/// [`Registry::parse_from`](crate::Registry::parse_from).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlagError {
    /// A flag with this name (or its negated boolean alias) already exists.
    #[error("a flag named '{name}' is already defined")]
    DuplicateName {
        /// Name that collided with an existing registration.
        name: String,
    },

    /// A schema-level name was empty or contained the reserved separator.
    #[error("invalid flag name '{name}': {reason}")]
    InvalidName {
        /// Offending name.
        name: String,
        /// Explanation of the violated naming rule.
        reason: String,
    },

    /// A dict flag was defined with no leaf items at all.
    #[error("dict flag '{name}' must define at least one item")]
    EmptySchema {
        /// Name of the offending dict flag.
        name: String,
    },

    /// A signature parameter carried no type annotation.
    #[error("missing type annotation for parameter '{param}'")]
    MissingAnnotation {
        /// Name of the unannotated parameter.
        param: String,
    },

    /// A signature parameter carried no default value.
    #[error("missing default value for parameter '{param}'")]
    MissingDefault {
        /// Name of the undefaulted parameter.
        param: String,
    },

    /// A signature parameter's type has no matching flag kind.
    #[error("no matching flag kind for parameter '{param}' with type {annotation}")]
    UnsupportedType {
        /// Name of the parameter.
        param: String,
        /// Display form of the unsupported annotation.
        annotation: String,
    },

    /// A default or override value disagrees with the leaf's kind.
    #[error("value for '{name}' does not match its {kind} kind: {value}")]
    TypeMismatch {
        /// Flag or parameter name.
        name: String,
        /// Kind the value was checked against.
        kind: String,
        /// Display form of the rejected value.
        value: String,
    },

    /// Error while tokenizing the command line.
    #[error("failed to parse command-line arguments: {0}")]
    Cli(#[from] Box<clap::Error>),

    /// A command-line value could not be converted to the leaf's kind.
    #[error("invalid value for flag '{name}': {message}")]
    Parse {
        /// Dotted name of the flag whose value was rejected.
        name: String,
        /// Description of the conversion failure.
        message: String,
    },

    /// An aggregate flag was overridden directly instead of via its items.
    #[error(
        "can't override dict flag '{name}' directly; \
         did you mean to override one of its items instead?"
    )]
    DirectOverride {
        /// Name of the aggregate flag.
        name: String,
    },

    /// A call-style override referenced a leaf that was never generated.
    #[error("unknown override key '{key}' for auto flag '{name}'")]
    UnknownOverride {
        /// Name of the auto flag.
        name: String,
        /// Offending override key.
        key: String,
    },

    /// A lookup referenced a flag that was never registered.
    #[error("no flag named '{name}' is registered")]
    UnknownFlag {
        /// Name that failed to resolve.
        name: String,
    },

    /// A custom item referenced a kind tag that was never registered.
    #[error("no custom kind registered under tag '{tag}'")]
    UnknownKind {
        /// Tag that failed to resolve.
        tag: String,
    },
}

impl From<clap::Error> for FlagError {
    fn from(err: clap::Error) -> Self {
        Self::Cli(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::FlagError;

    #[test]
    fn duplicate_name_names_the_flag() {
        let err = FlagError::DuplicateName {
            name: "replay.capacity".into(),
        };
        assert_eq!(
            err.to_string(),
            "a flag named 'replay.capacity' is already defined"
        );
    }

    #[test]
    fn direct_override_points_at_items() {
        let err = FlagError::DirectOverride {
            name: "settings".into(),
        };
        assert!(err.to_string().contains("one of its items"));
    }

    #[test]
    fn clap_errors_convert_to_boxed_cli() {
        let clap_err = clap::Command::new("demo")
            .error(clap::error::ErrorKind::UnknownArgument, "boom");
        let err = FlagError::from(clap_err);
        assert!(matches!(err, FlagError::Cli(_)));
    }
}
