//! Error types for command tree operations.
//!
//! [`Error`] is the unified error for tree construction, resolution and
//! execution. Flag parsing and positional validation have their own enums
//! ([`FlagError`], [`ArgsError`]) so hooks and validators can produce them
//! without depending on the whole surface.

use thiserror::Error;

use crate::lifecycle::Phase;
use crate::spec::SpecError;

/// Boxed error returned by lifecycle hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while parsing or querying a [`FlagSet`](crate::FlagSet).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    /// A `--name` token did not match any flag in the set.
    #[error("unknown flag: --{0}")]
    UnknownFlag(String),
    /// A shorthand, alone or inside a `-abc` cluster, did not match any flag.
    #[error("unknown shorthand flag: '{0}'")]
    UnknownShorthand(char),
    /// A value-taking flag was the last token.
    #[error("flag needs an argument: {0}")]
    MissingValue(String),
    /// The supplied value could not be converted to the flag's kind.
    #[error("invalid argument {value:?} for \"{flag}\" flag: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },
    /// Malformed flag token the parser could not classify.
    #[error("bad flag syntax: {0}")]
    BadSyntax(String),
    /// Lookup of a flag the set does not define.
    #[error("flag accessed but not defined: {0}")]
    NotDefined(String),
    /// Typed getter used on a flag of another kind.
    #[error("trying to get {expected} value of flag of type {actual}")]
    WrongKind {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Positional argument validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgsError {
    /// Leftover token that names no subcommand.
    #[error("unknown command {command:?} for {path:?}{}", format_suggestions(.suggestions))]
    UnknownCommand {
        command: String,
        path: String,
        suggestions: Vec<String>,
    },
    #[error("requires at least {min} arg(s), only received {received}")]
    TooFew { min: usize, received: usize },
    #[error("accepts at most {max} arg(s), received {received}")]
    TooMany { max: usize, received: usize },
    #[error("accepts {expected} arg(s), received {received}")]
    WrongCount { expected: usize, received: usize },
    #[error("accepts between {min} and {max} arg(s), received {received}")]
    OutOfRange {
        min: usize,
        max: usize,
        received: usize,
    },
    /// Argument outside the node's valid-args list.
    #[error("invalid argument {arg:?} for {path:?}")]
    InvalidArg { arg: String, path: String },
    /// Free-form failure from a user supplied validator.
    #[error("{0}")]
    Custom(String),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\nDid you mean this?\n");
    for suggestion in suggestions {
        out.push('\t');
        out.push_str(suggestion);
        out.push('\n');
    }
    out
}

/// Unified error for the command tree.
#[derive(Debug, Error)]
pub enum Error {
    /// Attaching a node beneath itself or one of its descendants.
    #[error("command {0:?} can't be a child of itself")]
    Structural(String),

    /// Flag parsing failure that no flag-error hook rewrote.
    #[error(transparent)]
    Flag(#[from] FlagError),

    /// Positional validation failure.
    #[error(transparent)]
    Args(#[from] ArgsError),

    /// Every required flag that was left unset.
    #[error("required flag(s) \"{}\" not set", .0.join("\", \""))]
    MissingRequiredFlags(Vec<String>),

    /// Failure returned by a lifecycle hook, reported with the hook's own message.
    #[error("{source}")]
    Hook {
        phase: Phase,
        #[source]
        source: BoxError,
    },

    /// Invalid tree or engine configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Definition that cannot be turned into a tree.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// Stream write or definition file read failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON definition parsing failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML definition parsing failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Phase in which a hook failed, if this is a hook error.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Hook { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
