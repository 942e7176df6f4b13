//! Definition linting.
//!
//! [`validate_spec`] checks a [`CommandSpec`] for problems that building a
//! tree silently tolerates: colliding sibling names (the first declared
//! command would always win), duplicate flags (the later one is dropped),
//! malformed flag names and thresholds that disable suggestions. Every
//! problem found is returned; an empty list means the definition is clean.
//!
//! # Examples
//!
//! ```
//! use cmdtree_core::*;
//!
//! let mut spec = CommandSpec::new("app");
//! spec.commands.push(CommandSpec::new("status"));
//! assert!(validate_spec(&spec).is_empty());
//!
//! let mut other = CommandSpec::new("stats");
//! other.aliases.push("status".into());
//! spec.commands.push(other);
//! assert_eq!(
//!     validate_spec(&spec),
//!     vec![SpecIssue::NameCollision {
//!         parent: "app".into(),
//!         name: "status".into(),
//!     }]
//! );
//! ```

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::flagset::is_flag_name;
use crate::spec::{ArgsSpec, CommandSpec, FlagSpec};

/// A problem found in a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum SpecIssue {
    /// Use line is empty or whitespace-only.
    #[error("command under {parent:?} has an empty name")]
    EmptyName { parent: String },
    /// Two siblings share a name or alias.
    #[error("name or alias {name:?} is used by more than one child of {parent:?}")]
    NameCollision { parent: String, name: String },
    /// Flag name is empty, starts with a dash, or contains `=` or spaces.
    #[error("invalid flag name {flag:?} on {command:?}")]
    InvalidFlagName { command: String, flag: String },
    /// Shorthand is not a single printable ASCII character.
    #[error("invalid shorthand {shorthand:?} for flag {flag:?} on {command:?}")]
    InvalidShorthand {
        command: String,
        flag: String,
        shorthand: char,
    },
    /// Flag name declared twice on one command (local and global share a scope).
    #[error("duplicate flag {flag:?} on {command:?}")]
    DuplicateFlag { command: String, flag: String },
    /// Shorthand declared twice on one command.
    #[error("duplicate shorthand {shorthand:?} on {command:?}")]
    DuplicateShorthand { command: String, shorthand: char },
    /// Default value does not parse as the flag's kind.
    #[error("invalid default for flag {flag:?} on {command:?}: {reason}")]
    InvalidDefault {
        command: String,
        flag: String,
        reason: String,
    },
    /// Range rule with `min > max`.
    #[error("argument range {min}..={max} on {command:?} is empty")]
    EmptyArgsRange {
        command: String,
        min: usize,
        max: usize,
    },
    /// Suggestion threshold of zero.
    #[error("suggestion distance on {command:?} must be positive")]
    ZeroSuggestionDistance { command: String },
}

/// Lints `spec` and all of its subcommands.
pub fn validate_spec(spec: &CommandSpec) -> Vec<SpecIssue> {
    let mut issues = Vec::new();
    if spec.name().is_empty() {
        issues.push(SpecIssue::EmptyName {
            parent: String::new(),
        });
    }
    validate_command(spec, spec.name(), &mut issues);
    issues
}

fn validate_command(spec: &CommandSpec, path: &str, issues: &mut Vec<SpecIssue>) {
    validate_flags(spec, path, issues);

    if let Some(ArgsSpec::Range { min, max }) = spec.args {
        if min > max {
            issues.push(SpecIssue::EmptyArgsRange {
                command: path.to_string(),
                min,
                max,
            });
        }
    }
    if spec.suggestions_min_distance == Some(0) {
        issues.push(SpecIssue::ZeroSuggestionDistance {
            command: path.to_string(),
        });
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for child in &spec.commands {
        let name = child.name();
        if name.is_empty() {
            issues.push(SpecIssue::EmptyName {
                parent: path.to_string(),
            });
        }
        for spelling in std::iter::once(name).chain(child.aliases.iter().map(String::as_str)) {
            if !spelling.is_empty() && !seen.insert(spelling) {
                issues.push(SpecIssue::NameCollision {
                    parent: path.to_string(),
                    name: spelling.to_string(),
                });
            }
        }
        let child_path = format!("{path} {name}");
        validate_command(child, &child_path, issues);
    }
}

fn validate_flags(spec: &CommandSpec, path: &str, issues: &mut Vec<SpecIssue>) {
    let mut names = HashSet::new();
    let mut shorthands = HashSet::new();

    for flag in spec.flags.iter().chain(&spec.global_flags) {
        if !is_flag_name(&flag.name) {
            issues.push(SpecIssue::InvalidFlagName {
                command: path.to_string(),
                flag: flag.name.clone(),
            });
            continue;
        }
        if !names.insert(flag.name.as_str()) {
            issues.push(SpecIssue::DuplicateFlag {
                command: path.to_string(),
                flag: flag.name.clone(),
            });
        }
        if let Some(c) = flag.shorthand {
            if !c.is_ascii_graphic() || c == '-' || c == '=' {
                issues.push(SpecIssue::InvalidShorthand {
                    command: path.to_string(),
                    flag: flag.name.clone(),
                    shorthand: c,
                });
            } else if !shorthands.insert(c) {
                issues.push(SpecIssue::DuplicateShorthand {
                    command: path.to_string(),
                    shorthand: c,
                });
            }
        }
        check_default(flag, path, issues);
    }
}

fn check_default(flag: &FlagSpec, path: &str, issues: &mut Vec<SpecIssue>) {
    if let Err(err) = flag.to_flag() {
        issues.push(SpecIssue::InvalidDefault {
            command: path.to_string(),
            flag: flag.name.clone(),
            reason: err.to_string(),
        });
    }
}
