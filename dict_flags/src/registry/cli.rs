//! Command-line parsing, delegated to a dynamically-built `clap::Command`.
//!
//! The registry compiles its flag table into clap `Arg`s, lets clap do the
//! tokenizing, then routes every matched string through the owning leaf's
//! kind parser. Boolean flags are normalised up front: `--name` becomes
//! `--name=true` and `--noname` becomes `--name=false`, so clap only ever
//! sees explicit `key=value` pairs for booleans.

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::debug;

use super::{Registry, Slot};
use crate::error::{FlagError, Result};
use crate::kind::Kind;
use crate::value::Value;

impl Registry {
    /// Parses command-line tokens and applies them to the registered flags.
    ///
    /// Accepts `--name=value` and `--name value` for non-boolean leaves,
    /// `--name` / `--noname` / `--name=<bool>` for booleans, and repeated
    /// occurrences for multi kinds. The last occurrence wins for single
    /// kinds. Aggregate flags reject direct overrides, but accept an empty
    /// value as a serialization sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::Cli`] when clap rejects the token stream,
    /// [`FlagError::Parse`] when a value fails its kind's conversion (with
    /// the dotted flag name attached), and [`FlagError::DirectOverride`]
    /// for a direct aggregate override.
    pub fn parse_from<I, T>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        let tokens = self.rewrite_boolean_tokens(tokens);
        let matches = self
            .build_command()
            .try_get_matches_from(tokens)
            .map_err(FlagError::from)?;
        self.apply_matches(&matches)
    }

    /// Rewrites boolean shorthand tokens into explicit `key=value` pairs.
    ///
    /// Rewriting stops at a bare `--`, which clap treats as the end of
    /// options.
    fn rewrite_boolean_tokens(&self, tokens: Vec<String>) -> Vec<String> {
        let inner = self.inner.borrow();
        let mut passthrough = false;
        tokens
            .into_iter()
            .map(|token| {
                if passthrough {
                    return token;
                }
                if token == "--" {
                    passthrough = true;
                    return token;
                }
                let Some(rest) = token.strip_prefix("--") else {
                    return token;
                };
                if rest.contains('=') {
                    return token;
                }
                if let Some(target) = inner.aliases.get(rest) {
                    return format!("--{target}=false");
                }
                if let Some(Slot::Leaf(leaf)) = inner.slots.get(rest) {
                    if leaf.item.kind().is_boolean() {
                        return format!("--{rest}=true");
                    }
                }
                token
            })
            .collect()
    }

    fn build_command(&self) -> Command {
        let inner = self.inner.borrow();
        let mut cmd = Command::new("flags")
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true);
        for (name, slot) in &inner.slots {
            let arg = Arg::new(name.clone())
                .long(name.clone())
                .action(ArgAction::Append)
                .num_args(1);
            cmd = cmd.arg(match slot {
                Slot::Leaf(leaf) => {
                    let help = leaf
                        .item
                        .help()
                        .map_or_else(|| name.clone(), str::to_owned);
                    let mut arg = arg.help(help);
                    if leaf.item.kind().is_boolean() {
                        arg = arg.require_equals(true);
                    } else {
                        arg = arg.allow_hyphen_values(true);
                    }
                    if leaf.item.is_required() {
                        arg = arg.required(true);
                    }
                    arg
                }
                Slot::Aggregate(aggregate) => arg
                    .help(aggregate.help.clone())
                    .require_equals(true)
                    .hide(true),
            });
        }
        cmd
    }

    fn apply_matches(&self, matches: &ArgMatches) -> Result<()> {
        // Snapshot the table first so kind parsers (which may call into
        // registered custom capabilities) never run under the borrow.
        let table: Vec<(String, Option<Kind>)> = {
            let inner = self.inner.borrow();
            inner
                .slots
                .iter()
                .map(|(name, slot)| match slot {
                    Slot::Leaf(leaf) => (name.clone(), Some(leaf.item.kind().clone())),
                    Slot::Aggregate(_) => (name.clone(), None),
                })
                .collect()
        };

        let mut updates: Vec<(String, Value)> = Vec::new();
        for (name, kind) in table {
            let Some(occurrences) = matches.get_many::<String>(&name) else {
                continue;
            };
            let occurrences: Vec<&String> = occurrences.collect();
            let Some(kind) = kind else {
                if occurrences.iter().any(|value| !value.is_empty()) {
                    return Err(FlagError::DirectOverride { name });
                }
                // Empty-string sentinel from flag serialization: ignore.
                continue;
            };
            if kind.is_multi() {
                let values = occurrences
                    .iter()
                    .map(|occurrence| {
                        kind.parse_str(occurrence.as_str())
                            .map_err(|message| FlagError::Parse {
                                name: name.clone(),
                                message,
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                updates.push((name, Value::Seq(values)));
            } else if let Some(last) = occurrences.last() {
                let value = kind
                    .parse_str(last.as_str())
                    .map_err(|message| FlagError::Parse {
                        name: name.clone(),
                        message,
                    })?;
                updates.push((name, value));
            }
        }

        debug!(overrides = updates.len(), "applying command-line overrides");
        for (name, value) in updates {
            self.set_parsed(&name, value);
        }
        Ok(())
    }
}
