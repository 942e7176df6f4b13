//! Declarative command tree definitions.
//!
//! A [`CommandSpec`] describes a command, its flags and its subcommands as
//! plain data. Definitions are read from JSON or YAML and turned into a
//! live [`CommandTree`] with [`CommandTree::from_spec`]. Hooks cannot be
//! expressed as data; callers install them on the built nodes through
//! [`CommandNode::hooks_mut`](crate::CommandNode::hooks_mut).
//!
//! # Examples
//!
//! ```
//! use cmdtree_core::{CommandSpec, CommandTree};
//!
//! let spec = CommandSpec::from_yaml_str(
//!     r#"
//! use: app
//! global_flags:
//!   - name: verbose
//!     shorthand: v
//! commands:
//!   - use: serve <addr>
//!     aliases: [s]
//!     flags:
//!       - name: port
//!         kind: int
//!         default: "8080"
//! "#,
//! )
//! .unwrap();
//!
//! let (mut tree, root) = CommandTree::from_spec(&spec).unwrap();
//! let serve = tree.declared_children(root)[0];
//! assert_eq!(tree.path(serve), "app serve");
//! assert_eq!(tree.flags(serve).get_int("port").unwrap(), 8080);
//! assert!(tree.flags(serve).lookup("verbose").is_some());
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::args::{
    ArbitraryArgs, ExactArgs, MaximumNArgs, MinimumNArgs, NoArgs, OnlyValidArgs, RangeArgs,
};
use crate::completion::CompletionOptions;
use crate::error::{FlagError, Result};
use crate::flag::{Flag, FlagKind};
use crate::flagset::word_separator_normalizer;
use crate::node::{CommandId, CommandNode};
use crate::tree::CommandTree;

/// Problems turning a definition into a tree.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The file extension names no supported format.
    #[error("unsupported definition format: {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),
    /// A flag default does not parse as the flag's kind.
    #[error("invalid flag in {command:?}: {source}")]
    InvalidFlag {
        command: String,
        #[source]
        source: FlagError,
    },
}

/// Positional-argument rule of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgsSpec {
    None,
    Arbitrary,
    Minimum { n: usize },
    Maximum { n: usize },
    Exact { n: usize },
    Range { min: usize, max: usize },
    OnlyValid,
}

/// A flag declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FlagSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shorthand: Option<char>,
    pub kind: FlagKind,
    /// Textual default, parsed according to `kind`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub usage: String,
    pub required: bool,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_opt_default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Vec<String>>,
}

impl FlagSpec {
    pub fn new(name: &str, kind: FlagKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ..Self::default()
        }
    }

    /// Builds the runtime flag.
    pub fn to_flag(&self) -> std::result::Result<Flag, FlagError> {
        let mut flag = Flag::from_kind(
            &self.name,
            self.shorthand,
            self.kind,
            self.default.as_deref().unwrap_or_default(),
            &self.usage,
        )?;
        if self.required {
            flag = flag.required();
        }
        if let Some(no_opt) = &self.no_opt_default {
            flag = flag.with_no_opt_default(no_opt);
        }
        flag.hidden = self.hidden;
        flag.deprecated = self.deprecated.clone();
        flag.annotations
            .extend(self.annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(flag)
    }
}

/// A command and, recursively, its subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CommandSpec {
    /// Use line; its first word is the command name.
    #[serde(rename = "use")]
    pub use_line: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggest_for: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub short: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub long: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub example: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<ArgsSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub valid_args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arg_aliases: Vec<String>,
    pub hidden: bool,
    pub silence_errors: bool,
    pub silence_usage: bool,
    pub disable_flag_parsing: bool,
    pub disable_suggestions: bool,
    pub disable_flags_in_use_line: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions_min_distance: Option<usize>,
    /// Treat `_` and `.` in flag names as `-` for this subtree.
    pub normalize_word_separators: bool,
    /// Completion settings; honored on the root only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub global_flags: Vec<FlagSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandSpec>,
}

impl CommandSpec {
    pub fn new(use_line: &str) -> Self {
        Self {
            use_line: use_line.to_string(),
            ..Self::default()
        }
    }

    /// Command name: first word of the use line.
    pub fn name(&self) -> &str {
        self.use_line.split_whitespace().next().unwrap_or_default()
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Reads a definition file; `.json` is JSON, `.yaml`/`.yml` is YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), format = %ext, "loading command definition");
        match ext.as_str() {
            "json" => Self::from_json_str(&content),
            "yaml" | "yml" => Self::from_yaml_str(&content),
            _ => Err(SpecError::UnsupportedFormat(path.display().to_string()).into()),
        }
    }

    fn to_node(&self) -> Result<CommandNode> {
        let mut node = CommandNode::new(&self.use_line)
            .short(&self.short)
            .long(&self.long)
            .example(&self.example);
        for alias in &self.aliases {
            node = node.alias(alias);
        }
        for token in &self.suggest_for {
            node = node.suggest_for(token);
        }
        if let Some(message) = &self.deprecated {
            node = node.deprecated(message);
        }
        if let Some(version) = &self.version {
            node = node.version(version);
        }
        if let Some(template) = &self.version_template {
            node = node.version_template(template);
        }
        node = match self.args {
            None => node,
            Some(ArgsSpec::None) => node.args(NoArgs),
            Some(ArgsSpec::Arbitrary) => node.args(ArbitraryArgs),
            Some(ArgsSpec::Minimum { n }) => node.args(MinimumNArgs(n)),
            Some(ArgsSpec::Maximum { n }) => node.args(MaximumNArgs(n)),
            Some(ArgsSpec::Exact { n }) => node.args(ExactArgs(n)),
            Some(ArgsSpec::Range { min, max }) => node.args(RangeArgs(min, max)),
            Some(ArgsSpec::OnlyValid) => node.args(OnlyValidArgs),
        };
        let valid: Vec<&str> = self.valid_args.iter().map(String::as_str).collect();
        let aliases: Vec<&str> = self.arg_aliases.iter().map(String::as_str).collect();
        node = node.valid_args(&valid).arg_aliases(&aliases);

        node.hidden = self.hidden;
        node.silence_errors = self.silence_errors;
        node.silence_usage = self.silence_usage;
        node.disable_flag_parsing = self.disable_flag_parsing;
        node.disable_suggestions = self.disable_suggestions;
        node.disable_flags_in_use_line = self.disable_flags_in_use_line;
        node.suggestions_min_distance = self.suggestions_min_distance;

        let invalid = |source| SpecError::InvalidFlag {
            command: self.name().to_string(),
            source,
        };
        for flag in &self.flags {
            node = node.flag(flag.to_flag().map_err(invalid)?);
        }
        for flag in &self.global_flags {
            node = node.global_flag(flag.to_flag().map_err(invalid)?);
        }
        Ok(node)
    }
}

impl CommandTree {
    /// Builds a new tree from `spec`, returning it with the root id.
    pub fn from_spec(spec: &CommandSpec) -> Result<(CommandTree, CommandId)> {
        let mut tree = CommandTree::new();
        let root = tree.build(None, spec)?;
        if let Some(options) = &spec.completion {
            tree.set_completion_options(options.clone());
        }
        Ok((tree, root))
    }

    /// Inserts `spec` and its subcommands, beneath `parent` when given.
    pub fn build(&mut self, parent: Option<CommandId>, spec: &CommandSpec) -> Result<CommandId> {
        let node = spec.to_node()?;
        let id = match parent {
            Some(parent) => self.add_command(parent, node)?,
            None => self.insert(node),
        };
        for child in &spec.commands {
            self.build(Some(id), child)?;
        }
        if spec.normalize_word_separators {
            self.set_global_normalization(id, word_separator_normalizer());
        }
        Ok(id)
    }
}
