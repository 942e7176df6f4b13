//! GNU-style flag parsing.
//!
//! [`FlagSet`] is the parser every command hands its tokens to. It keeps
//! flags in declaration order, resolves spellings through an optional
//! normalization function, and records the positional leftovers of the
//! last [`parse`](FlagSet::parse). Tokens are parsed by a `clap` command
//! generated from the flags in the set.

use std::fmt;
use std::sync::Arc;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, Command, value_parser};
use tracing::trace;

use crate::error::FlagError;
use crate::flag::{Flag, FlagValue};

/// Canonicalizes a flag name before it is stored or looked up.
pub type NormalizeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Normalizer treating `_` and `.` as `-`, so `--dry_run` and `--dry.run`
/// resolve to `--dry-run`.
pub fn word_separator_normalizer() -> NormalizeFn {
    Arc::new(|name: &str| name.replace(['_', '.'], "-"))
}

pub(crate) static EMPTY_FLAGS: FlagSet = FlagSet::empty();

/// Id of the catch-all positional in the generated parser.
const POSITIONALS: &str = "cmdtree positionals";

/// An ordered collection of flags plus the leftovers of the last parse.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Flag, FlagSet};
///
/// let mut flags = FlagSet::new("serve");
/// flags.add(Flag::int("port", Some('p'), 8080, "port"));
/// flags.add(Flag::bool("verbose", Some('v'), "verbose"));
///
/// let args: Vec<String> = ["-vp", "9000", "api"].iter().map(|s| s.to_string()).collect();
/// flags.parse(&args).unwrap();
///
/// assert_eq!(flags.get_int("port").unwrap(), 9000);
/// assert!(flags.get_bool("verbose").unwrap());
/// assert_eq!(flags.args(), ["api"]);
/// ```
#[derive(Clone, Default)]
pub struct FlagSet {
    name: String,
    flags: Vec<Flag>,
    normalize: Option<NormalizeFn>,
    args: Vec<String>,
    parsed: bool,
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSet")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("normalized", &self.normalize.is_some())
            .field("args", &self.args)
            .field("parsed", &self.parsed)
            .finish()
    }
}

impl FlagSet {
    pub(crate) const fn empty() -> Self {
        Self {
            name: String::new(),
            flags: Vec::new(),
            normalize: None,
            args: Vec::new(),
            parsed: false,
        }
    }

    /// Creates an empty set named after its command.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::empty()
        }
    }

    /// Name of the owning command.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs (or clears) the normalization function and re-adds the
    /// flags already present under their new spellings. Of two flags that
    /// now share a spelling, the first one is kept.
    pub fn set_normalize(&mut self, normalize: Option<NormalizeFn>) {
        self.normalize = normalize;
        if self.normalize.is_some() {
            for flag in std::mem::take(&mut self.flags) {
                self.add(flag);
            }
        }
    }

    /// Current normalization function.
    pub fn normalize_fn(&self) -> Option<&NormalizeFn> {
        self.normalize.as_ref()
    }

    /// Canonical spelling of `name` under this set's normalizer.
    pub fn normalize_name(&self, name: &str) -> String {
        match &self.normalize {
            Some(normalize) => normalize(name),
            None => name.to_string(),
        }
    }

    /// Adds a flag unless one with the same normalized name exists.
    ///
    /// Returns `false` when the name was taken or cannot be spelled on a
    /// command line. A shorthand already claimed by an earlier flag is
    /// dropped from the incoming one.
    pub fn add(&mut self, mut flag: Flag) -> bool {
        flag.name = self.normalize_name(&flag.name);
        if !is_flag_name(&flag.name) {
            trace!(flag = %flag.name, "unusable flag name");
            return false;
        }
        if self.lookup(&flag.name).is_some() {
            return false;
        }
        if let Some(c) = flag.shorthand {
            if c == '-' || self.shorthand_lookup(c).is_some() {
                trace!(flag = %flag.name, shorthand = %c, "shorthand already taken");
                flag.shorthand = None;
            }
        }
        self.flags.push(flag);
        true
    }

    /// Adds every flag of `other` that this set does not already define.
    pub fn add_set(&mut self, other: &FlagSet) {
        for flag in &other.flags {
            self.add(flag.clone());
        }
    }

    /// Finds a flag by long name.
    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        let name = self.normalize_name(name);
        self.flags.iter().find(|f| f.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = self.normalize_name(name);
        self.flags.iter().position(|f| f.name == name)
    }

    /// Finds a flag by shorthand.
    pub fn shorthand_lookup(&self, shorthand: char) -> Option<&Flag> {
        self.flags.iter().find(|f| f.shorthand == Some(shorthand))
    }

    /// Flags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Whether any flag is visible (not hidden).
    pub fn has_available_flags(&self) -> bool {
        self.flags.iter().any(|f| !f.hidden)
    }

    /// Sets a flag's value by name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), FlagError> {
        let idx = self
            .position(name)
            .ok_or_else(|| FlagError::NotDefined(name.to_string()))?;
        self.flags[idx].set(value)
    }

    /// Whether the named flag was set on the command line.
    pub fn changed(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|f| f.changed)
    }

    /// Replaces an annotation on the named flag.
    pub fn set_annotation(
        &mut self,
        name: &str,
        key: &str,
        values: &[&str],
    ) -> Result<(), FlagError> {
        let idx = self
            .position(name)
            .ok_or_else(|| FlagError::NotDefined(name.to_string()))?;
        self.flags[idx].annotations.insert(
            key.to_string(),
            values.iter().map(|s| s.to_string()).collect(),
        );
        Ok(())
    }

    /// Marks the named flag as required.
    pub fn mark_required(&mut self, name: &str) -> Result<(), FlagError> {
        self.set_annotation(name, crate::flag::ANNOTATION_REQUIRED, &["true"])
    }

    /// Whether [`parse`](Self::parse) has run.
    pub fn parsed(&self) -> bool {
        self.parsed
    }

    /// Positional leftovers of the last parse.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Restores every flag to its default and clears the leftovers.
    pub fn reset(&mut self) {
        for flag in &mut self.flags {
            flag.reset();
        }
        self.args.clear();
        self.parsed = false;
    }

    /// Parses `args`, assigning flag values and collecting positionals.
    ///
    /// Every flag starts from its default, so nothing carries over from an
    /// earlier parse. Flags and positionals may be interleaved. A bare `--`
    /// ends flag parsing; a lone `-` is positional.
    pub fn parse(&mut self, args: &[String]) -> Result<(), FlagError> {
        self.reset();
        self.parsed = true;

        let tokens = match &self.normalize {
            Some(normalize) => normalize_long_tokens(args, normalize),
            None => args.to_vec(),
        };
        let matches = self
            .parser()
            .try_get_matches_from(tokens)
            .map_err(flag_error)?;

        for flag in &mut self.flags {
            if matches.value_source(&flag.name) != Some(ValueSource::CommandLine) {
                continue;
            }
            for value in matches.get_many::<String>(&flag.name).into_iter().flatten() {
                flag.set(value)?;
            }
        }
        self.args = matches
            .get_many::<String>(POSITIONALS)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        trace!(set = %self.name, args = ?self.args, "parsed flags");
        Ok(())
    }

    /// Builds the clap parser for the flags currently in the set.
    ///
    /// Flags with a no-opt default only take a value through `=`; every
    /// other flag consumes the next token, even one starting with `-`.
    fn parser(&self) -> Command {
        let mut command = Command::new(self.name.clone())
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .disable_help_subcommand(true);
        for flag in &self.flags {
            let mut arg = Arg::new(flag.name.clone())
                .long(flag.name.clone())
                .action(ArgAction::Append)
                .value_parser(value_parser!(String));
            if let Some(c) = flag.shorthand {
                arg = arg.short(c);
            }
            arg = match &flag.no_opt_default {
                Some(no_opt) => arg
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value(no_opt.clone()),
                None => arg.num_args(1).allow_hyphen_values(true),
            };
            command = command.arg(arg);
        }
        command.arg(
            Arg::new(POSITIONALS)
                .num_args(0..)
                .action(ArgAction::Append)
                .value_parser(value_parser!(String)),
        )
    }

    fn typed(&self, name: &str) -> Result<&FlagValue, FlagError> {
        self.lookup(name)
            .map(Flag::value)
            .ok_or_else(|| FlagError::NotDefined(name.to_string()))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, FlagError> {
        match self.typed(name)? {
            FlagValue::Bool(b) => Ok(*b),
            other => Err(wrong_kind("bool", other)),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<String, FlagError> {
        match self.typed(name)? {
            FlagValue::String(s) => Ok(s.clone()),
            other => Err(wrong_kind("string", other)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64, FlagError> {
        match self.typed(name)? {
            FlagValue::Int(n) => Ok(*n),
            other => Err(wrong_kind("int", other)),
        }
    }

    pub fn get_strings(&self, name: &str) -> Result<Vec<String>, FlagError> {
        match self.typed(name)? {
            FlagValue::StringList(items) => Ok(items.clone()),
            other => Err(wrong_kind("stringSlice", other)),
        }
    }
}

fn wrong_kind(expected: &'static str, actual: &FlagValue) -> FlagError {
    let actual = match actual {
        FlagValue::Bool(_) => "bool",
        FlagValue::String(_) => "string",
        FlagValue::Int(_) => "int",
        FlagValue::StringList(_) => "stringSlice",
    };
    FlagError::WrongKind { expected, actual }
}

/// Whether `name` can follow `--` on a command line.
pub(crate) fn is_flag_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.contains('=')
        && !name.chars().any(char::is_whitespace)
}

/// Rewrites the name part of `--name` and `--name=value` tokens up to `--`.
fn normalize_long_tokens(args: &[String], normalize: &NormalizeFn) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut escaped = false;
    for token in args {
        match token.strip_prefix("--") {
            Some(long) if !escaped && !long.is_empty() => match long.split_once('=') {
                Some((name, value)) => out.push(format!("--{}={value}", normalize(name))),
                None => out.push(format!("--{}", normalize(long))),
            },
            _ => {
                escaped |= token == "--";
                out.push(token.clone());
            }
        }
    }
    out
}

/// Maps a clap parse failure onto the flag error it stands for.
fn flag_error(err: clap::Error) -> FlagError {
    let arg = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => arg.clone(),
        _ => String::new(),
    };
    // clap renders value-taking flags as `--name <NAME>`
    let spelling = arg.split_whitespace().next().unwrap_or_default();

    match err.kind() {
        ErrorKind::UnknownArgument => match spelling.strip_prefix("--") {
            Some(long) => {
                let name = long.split_once('=').map_or(long, |(name, _)| name);
                FlagError::UnknownFlag(name.to_string())
            }
            None => match spelling.trim_start_matches('-').chars().next() {
                Some(c) => FlagError::UnknownShorthand(c),
                None => FlagError::BadSyntax(arg),
            },
        },
        ErrorKind::InvalidValue
        | ErrorKind::NoEquals
        | ErrorKind::TooFewValues
        | ErrorKind::WrongNumberOfValues => FlagError::MissingValue(spelling.to_string()),
        kind => FlagError::BadSyntax(if arg.is_empty() {
            kind.as_str().unwrap_or("invalid flag syntax").to_string()
        } else {
            arg
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> FlagSet {
        let mut set = FlagSet::new("test");
        set.add(Flag::bool("verbose", Some('v'), ""));
        set.add(Flag::bool("all", Some('a'), ""));
        set.add(Flag::string("output", Some('o'), "", ""));
        set.add(Flag::int("port", None, 80, ""));
        set.add(Flag::string_list("tag", Some('t'), &[], ""));
        set
    }

    #[test]
    fn test_parse_long_forms() {
        let mut set = sample();
        set.parse(&argv(&["--port", "9000", "--output=out.txt", "--verbose", "x"]))
            .unwrap();
        assert_eq!(set.get_int("port").unwrap(), 9000);
        assert_eq!(set.get_string("output").unwrap(), "out.txt");
        assert!(set.get_bool("verbose").unwrap());
        assert_eq!(set.args(), ["x"]);
    }

    #[test]
    fn test_parse_short_clusters() {
        let mut set = sample();
        set.parse(&argv(&["-va", "-oout", "-t", "a,b", "-t=c"])).unwrap();
        assert!(set.get_bool("verbose").unwrap());
        assert!(set.get_bool("all").unwrap());
        assert_eq!(set.get_string("output").unwrap(), "out");
        assert_eq!(set.get_strings("tag").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_double_dash_terminates() {
        let mut set = sample();
        set.parse(&argv(&["a", "--", "--verbose", "-"])).unwrap();
        assert!(!set.changed("verbose"));
        assert_eq!(set.args(), ["a", "--verbose", "-"]);
    }

    #[test]
    fn test_lone_dash_is_positional() {
        let mut set = sample();
        set.parse(&argv(&["-", "-v"])).unwrap();
        assert_eq!(set.args(), ["-"]);
    }

    #[test]
    fn test_bool_accepts_explicit_false() {
        let mut set = sample();
        set.parse(&argv(&["--verbose=false"])).unwrap();
        assert!(set.changed("verbose"));
        assert!(!set.get_bool("verbose").unwrap());
    }

    #[test]
    fn test_errors() {
        let mut set = sample();
        assert_eq!(
            set.parse(&argv(&["--nope"])).unwrap_err(),
            FlagError::UnknownFlag("nope".into())
        );
        assert_eq!(
            set.parse(&argv(&["--nope=1"])).unwrap_err(),
            FlagError::UnknownFlag("nope".into())
        );
        assert_eq!(
            set.parse(&argv(&["-vx"])).unwrap_err(),
            FlagError::UnknownShorthand('x')
        );
        assert_eq!(
            set.parse(&argv(&["--output"])).unwrap_err(),
            FlagError::MissingValue("--output".into())
        );
        assert!(matches!(
            set.parse(&argv(&["--port", "many"])).unwrap_err(),
            FlagError::InvalidValue { ref flag, .. } if flag == "port"
        ));
    }

    #[test]
    fn test_value_flag_takes_dash_value() {
        let mut set = sample();
        set.parse(&argv(&["--output", "-v", "rest"])).unwrap();
        assert_eq!(set.get_string("output").unwrap(), "-v");
        assert!(!set.changed("verbose"));
        assert_eq!(set.args(), ["rest"]);
    }

    #[test]
    fn test_interleaved_positionals() {
        let mut set = sample();
        set.parse(&argv(&["one", "-v", "two", "--port=1", "three"])).unwrap();
        assert!(set.get_bool("verbose").unwrap());
        assert_eq!(set.get_int("port").unwrap(), 1);
        assert_eq!(set.args(), ["one", "two", "three"]);
    }

    #[test]
    fn test_parse_starts_from_defaults() {
        let mut set = sample();
        set.parse(&argv(&["-v", "--port", "9000", "-t", "a", "x"])).unwrap();
        assert!(set.changed("verbose"));

        set.parse(&argv(&["-t", "b"])).unwrap();
        assert!(!set.changed("verbose"));
        assert!(!set.get_bool("verbose").unwrap());
        assert_eq!(set.get_int("port").unwrap(), 80);
        assert_eq!(set.get_strings("tag").unwrap(), vec!["b"]);
        assert!(set.args().is_empty());
    }

    #[test]
    fn test_unusable_names_rejected() {
        let mut set = FlagSet::new("x");
        assert!(!set.add(Flag::bool("--dashed", None, "")));
        assert!(!set.add(Flag::bool("a=b", None, "")));
        assert!(set.add(Flag::bool("ok", Some('-'), "")));
        assert_eq!(set.lookup("ok").unwrap().shorthand, None);
    }

    #[test]
    fn test_add_keeps_first_and_drops_taken_shorthand() {
        let mut set = FlagSet::new("x");
        assert!(set.add(Flag::string("name", Some('n'), "first", "")));
        assert!(!set.add(Flag::string("name", None, "second", "")));
        assert!(set.add(Flag::bool("dry-run", Some('n'), "")));

        assert_eq!(set.get_string("name").unwrap(), "first");
        assert_eq!(set.lookup("dry-run").unwrap().shorthand, None);
        assert_eq!(set.shorthand_lookup('n').unwrap().name, "name");
    }

    #[test]
    fn test_normalizer_applies_on_add_and_lookup() {
        let mut set = FlagSet::new("x");
        set.add(Flag::bool("dry_run", None, ""));
        set.set_normalize(Some(word_separator_normalizer()));

        assert_eq!(set.iter().next().unwrap().name, "dry-run");
        set.parse(&argv(&["--dry.run"])).unwrap();
        assert!(set.get_bool("dry_run").unwrap());
    }

    #[test]
    fn test_normalizer_merges_colliding_spellings() {
        let mut set = FlagSet::new("x");
        set.add(Flag::string("dry_run", None, "first", ""));
        set.add(Flag::string("dry.run", None, "second", ""));
        set.set_normalize(Some(word_separator_normalizer()));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get_string("dry-run").unwrap(), "first");
        set.parse(&argv(&["--dry_run=x", "--", "--dry_run"])).unwrap();
        assert_eq!(set.get_string("dry-run").unwrap(), "x");
        assert_eq!(set.args(), ["--dry_run"]);
    }

    #[test]
    fn test_wrong_kind_getter() {
        let set = sample();
        assert_eq!(
            set.get_int("verbose").unwrap_err(),
            FlagError::WrongKind {
                expected: "int",
                actual: "bool"
            }
        );
        assert!(matches!(
            set.get_bool("missing").unwrap_err(),
            FlagError::NotDefined(_)
        ));
    }

    #[test]
    fn test_mark_required() {
        let mut set = sample();
        set.mark_required("output").unwrap();
        assert!(set.lookup("output").unwrap().is_required());
        assert!(set.mark_required("missing").is_err());
    }
}
