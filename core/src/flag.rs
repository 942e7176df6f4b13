//! Flag definitions.
//!
//! A [`Flag`] is a named option with an optional one-character shorthand,
//! a typed value, and string-keyed annotations. Flags are declared on a
//! command either locally or globally and collected into a
//! [`FlagSet`](crate::FlagSet) for parsing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FlagError;

/// Annotation marking a flag that must be set before the run hook fires.
pub const ANNOTATION_REQUIRED: &str = "cmdtree_annotation_one_required_flag";
/// Annotation listing file extensions offered when completing the flag's value.
pub const ANNOTATION_FILENAME_EXT: &str = "cmdtree_annotation_filename_extensions";
/// Annotation restricting value completion to subdirectories of a directory.
pub const ANNOTATION_SUBDIRS_IN_DIR: &str = "cmdtree_annotation_subdirs_in_dir";

/// Value kind of a flag.
///
/// # Examples
///
/// ```
/// use cmdtree_core::FlagKind;
///
/// assert_eq!(FlagKind::default(), FlagKind::Bool);
/// assert_eq!(FlagKind::Int.to_string(), "int");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    /// Boolean switch; takes no value unless given `--name=false`.
    #[default]
    Bool,
    /// Free-form string.
    String,
    /// Signed integer.
    Int,
    /// Repeatable string list; values may also be comma separated.
    StringList,
}

impl FlagKind {
    fn as_str(self) -> &'static str {
        match self {
            FlagKind::Bool => "bool",
            FlagKind::String => "string",
            FlagKind::Int => "int",
            FlagKind::StringList => "stringSlice",
        }
    }
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current value held by a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    String(String),
    Int(i64),
    StringList(Vec<String>),
}

impl FlagValue {
    /// Kind of this value.
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::Bool(_) => FlagKind::Bool,
            FlagValue::String(_) => FlagKind::String,
            FlagValue::Int(_) => FlagKind::Int,
            FlagValue::StringList(_) => FlagKind::StringList,
        }
    }

    /// Parses `raw` into a value of `kind`.
    pub fn parse(kind: FlagKind, raw: &str) -> Result<Self, String> {
        match kind {
            FlagKind::Bool => parse_bool(raw).map(FlagValue::Bool),
            FlagKind::String => Ok(FlagValue::String(raw.to_string())),
            FlagKind::Int => raw
                .parse::<i64>()
                .map(FlagValue::Int)
                .map_err(|err| err.to_string()),
            FlagKind::StringList => Ok(FlagValue::StringList(split_list(raw))),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{b}"),
            FlagValue::String(s) => f.write_str(s),
            FlagValue::Int(n) => write!(f, "{n}"),
            FlagValue::StringList(items) => write!(f, "[{}]", items.join(",")),
        }
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(format!("parse error on {raw:?}: invalid syntax")),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

/// A command-line flag.
///
/// Use the kind-specific constructors, then chain builder methods.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Flag, FlagKind};
///
/// let verbose = Flag::bool("verbose", Some('v'), "enable verbose output");
/// assert!(verbose.has_no_opt_default());
///
/// let port = Flag::int("port", Some('p'), 8080, "port to listen on").required();
/// assert_eq!(port.kind(), FlagKind::Int);
/// assert!(port.is_required());
/// assert!(!port.has_no_opt_default());
/// ```
#[derive(Debug, Clone)]
pub struct Flag {
    /// Long name without leading dashes.
    pub name: String,
    /// Optional one-character shorthand.
    pub shorthand: Option<char>,
    /// Usage text shown in help.
    pub usage: String,
    value: FlagValue,
    default_value: FlagValue,
    /// Value used when the flag is given without one (`--name`).
    pub no_opt_default: Option<String>,
    /// Whether the flag was set on the command line.
    pub changed: bool,
    /// Hidden flags are parsed but never listed or completed.
    pub hidden: bool,
    /// Deprecation notice; the flag still parses.
    pub deprecated: Option<String>,
    /// String-keyed annotations, e.g. [`ANNOTATION_REQUIRED`].
    pub annotations: BTreeMap<String, Vec<String>>,
}

impl Flag {
    fn with_default(name: &str, shorthand: Option<char>, value: FlagValue, usage: &str) -> Self {
        let no_opt_default = matches!(value, FlagValue::Bool(_)).then(|| "true".to_string());
        Self {
            name: name.to_string(),
            shorthand,
            usage: usage.to_string(),
            value: value.clone(),
            default_value: value,
            no_opt_default,
            changed: false,
            hidden: false,
            deprecated: None,
            annotations: BTreeMap::new(),
        }
    }

    /// Boolean flag defaulting to `false`.
    pub fn bool(name: &str, shorthand: Option<char>, usage: &str) -> Self {
        Self::with_default(name, shorthand, FlagValue::Bool(false), usage)
    }

    /// String flag.
    pub fn string(name: &str, shorthand: Option<char>, default: &str, usage: &str) -> Self {
        Self::with_default(
            name,
            shorthand,
            FlagValue::String(default.to_string()),
            usage,
        )
    }

    /// Integer flag.
    pub fn int(name: &str, shorthand: Option<char>, default: i64, usage: &str) -> Self {
        Self::with_default(name, shorthand, FlagValue::Int(default), usage)
    }

    /// Repeatable string-list flag.
    pub fn string_list(name: &str, shorthand: Option<char>, default: &[&str], usage: &str) -> Self {
        let items = default.iter().map(|s| s.to_string()).collect();
        Self::with_default(name, shorthand, FlagValue::StringList(items), usage)
    }

    /// Builds a flag of `kind` from a textual default.
    ///
    /// An empty default yields the kind's zero value.
    pub fn from_kind(
        name: &str,
        shorthand: Option<char>,
        kind: FlagKind,
        default: &str,
        usage: &str,
    ) -> Result<Self, FlagError> {
        let value = if default.is_empty() {
            match kind {
                FlagKind::Bool => FlagValue::Bool(false),
                FlagKind::String => FlagValue::String(String::new()),
                FlagKind::Int => FlagValue::Int(0),
                FlagKind::StringList => FlagValue::StringList(Vec::new()),
            }
        } else {
            FlagValue::parse(kind, default).map_err(|reason| FlagError::InvalidValue {
                flag: name.to_string(),
                value: default.to_string(),
                reason,
            })?
        };
        Ok(Self::with_default(name, shorthand, value, usage))
    }

    /// Marks the flag as required.
    pub fn required(self) -> Self {
        self.with_annotation(ANNOTATION_REQUIRED, &["true"])
    }

    /// Hides the flag from listings and completion.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Sets the value used when the flag appears without one.
    pub fn with_no_opt_default(mut self, value: &str) -> Self {
        self.no_opt_default = Some(value.to_string());
        self
    }

    /// Adds an annotation.
    pub fn with_annotation(mut self, key: &str, values: &[&str]) -> Self {
        self.annotations.insert(
            key.to_string(),
            values.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Value kind.
    pub fn kind(&self) -> FlagKind {
        self.default_value.kind()
    }

    /// Current value.
    pub fn value(&self) -> &FlagValue {
        &self.value
    }

    /// Declared default value.
    pub fn default_value(&self) -> &FlagValue {
        &self.default_value
    }

    /// Whether the flag can appear without a value.
    pub fn has_no_opt_default(&self) -> bool {
        self.no_opt_default.is_some()
    }

    /// Whether the flag carries the required annotation.
    pub fn is_required(&self) -> bool {
        self.annotations
            .get(ANNOTATION_REQUIRED)
            .and_then(|values| values.first())
            .is_some_and(|v| v == "true")
    }

    /// Assigns a raw value, marking the flag changed.
    ///
    /// String lists replace their default on the first assignment and
    /// append afterwards.
    pub fn set(&mut self, raw: &str) -> Result<(), FlagError> {
        let parsed =
            FlagValue::parse(self.kind(), raw).map_err(|reason| FlagError::InvalidValue {
                flag: self.name.clone(),
                value: raw.to_string(),
                reason,
            })?;
        match (&mut self.value, parsed) {
            (FlagValue::StringList(current), FlagValue::StringList(items)) if self.changed => {
                current.extend(items);
            }
            (slot, parsed) => *slot = parsed,
        }
        self.changed = true;
        Ok(())
    }

    /// Restores the default value and clears `changed`.
    pub fn reset(&mut self) {
        self.value = self.default_value.clone();
        self.changed = false;
    }
}
