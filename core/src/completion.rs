//! Shell completion candidates.
//!
//! Shell scripts call the program with a hidden request command
//! ([`SHELL_COMP_REQUEST_CMD`]) followed by the words typed so far and the
//! word being completed. The answer is one candidate per line followed by
//! `:<directive>`, where the directive tells the shell what to do with the
//! candidates (see [`CompletionDirective`]).

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::flag::{ANNOTATION_FILENAME_EXT, ANNOTATION_SUBDIRS_IN_DIR, Flag};
use crate::flagset::FlagSet;
use crate::node::CommandId;
use crate::tree::CommandTree;

/// Hidden command that asks for completions with descriptions.
pub const SHELL_COMP_REQUEST_CMD: &str = "__complete";
/// Hidden command that asks for completions without descriptions.
pub const SHELL_COMP_NO_DESC_REQUEST_CMD: &str = "__completeNoDesc";

bitflags::bitflags! {
    /// What the shell should do with the returned candidates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompletionDirective: u32 {
        /// An error occurred; candidates should be ignored.
        const ERROR           = 1 << 0;
        /// Do not add a space after the completion.
        const NO_SPACE        = 1 << 1;
        /// Do not fall back to file completion.
        const NO_FILE_COMP    = 1 << 2;
        /// Candidates are file extensions to filter on.
        const FILTER_FILE_EXT = 1 << 3;
        /// Complete directory names only; a candidate names the base dir.
        const FILTER_DIRS     = 1 << 4;
        /// Keep the candidate order instead of letting the shell sort.
        const KEEP_ORDER      = 1 << 5;
    }
}

impl CompletionDirective {
    /// No special behavior: the shell may fall back to file completion.
    pub const DEFAULT: Self = Self::empty();
}

impl Default for CompletionDirective {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CompletionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("DEFAULT");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        f.write_str(&names.join("|"))
    }
}

impl Serialize for CompletionDirective {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

/// Dynamic provider of positional completions: receives the tree, the
/// resolved command, the positionals typed so far and the partial word.
pub type ValidArgsFn =
    Box<dyn Fn(&CommandTree, CommandId, &[String], &str) -> (Vec<String>, CompletionDirective)>;

/// Completion settings of a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionOptions {
    /// Strip descriptions from every candidate.
    pub disable_descriptions: bool,
}

/// Completion answer for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Completions {
    /// `value` or `value\tdescription` entries.
    pub candidates: Vec<String>,
    pub directive: CompletionDirective,
}

impl Completions {
    fn new(candidates: Vec<String>, directive: CompletionDirective) -> Self {
        Self {
            candidates,
            directive,
        }
    }

    /// Drops the `\tdescription` part of every candidate.
    pub fn without_descriptions(mut self) -> Self {
        for candidate in &mut self.candidates {
            if let Some(pos) = candidate.find('\t') {
                candidate.truncate(pos);
            }
        }
        self
    }

    /// Wire format read by the shell scripts.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdtree_core::{CompletionDirective, Completions};
    ///
    /// let answer = Completions {
    ///     candidates: vec!["serve\tStart the server".into()],
    ///     directive: CompletionDirective::NO_FILE_COMP,
    /// };
    /// assert_eq!(answer.to_shell_output(), "serve\tStart the server\n:4\n");
    /// ```
    pub fn to_shell_output(&self) -> String {
        let mut out = String::new();
        for candidate in &self.candidates {
            out.push_str(candidate);
            out.push('\n');
        }
        out.push(':');
        out.push_str(&self.directive.bits().to_string());
        out.push('\n');
        out
    }
}

fn with_description(value: &str, description: &str) -> String {
    if description.is_empty() {
        value.to_string()
    } else {
        format!("{value}\t{description}")
    }
}

fn flag_candidates(flags: &FlagSet, to_complete: &str) -> Vec<String> {
    let mut out = Vec::new();
    for flag in flags.iter().filter(|f| !f.hidden && f.deprecated.is_none()) {
        let long = format!("--{}", flag.name);
        if long.starts_with(to_complete) {
            out.push(with_description(&long, &flag.usage));
        }
        if let Some(c) = flag.shorthand {
            let short = format!("-{c}");
            if !to_complete.starts_with("--") && short.starts_with(to_complete) {
                out.push(with_description(&short, &flag.usage));
            }
        }
    }
    out
}

/// The flag awaiting a value when `last` is the final completed word.
fn pending_flag<'f>(flags: &'f FlagSet, last: &str) -> Option<&'f Flag> {
    if last.contains('=') {
        return None;
    }
    let flag = if let Some(name) = last.strip_prefix("--") {
        flags.lookup(name)?
    } else {
        let rest = last.strip_prefix('-')?;
        let mut chars = rest.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        flags.shorthand_lookup(c)?
    };
    (!flag.has_no_opt_default()).then_some(flag)
}

fn flag_value_completions(flag: &Flag) -> Completions {
    if let Some(extensions) = flag.annotations.get(ANNOTATION_FILENAME_EXT) {
        return Completions::new(extensions.clone(), CompletionDirective::FILTER_FILE_EXT);
    }
    if let Some(dirs) = flag.annotations.get(ANNOTATION_SUBDIRS_IN_DIR) {
        return Completions::new(dirs.clone(), CompletionDirective::FILTER_DIRS);
    }
    Completions::default()
}

impl CommandTree {
    pub fn completion_options(&self) -> &CompletionOptions {
        &self.completion_options
    }

    pub fn set_completion_options(&mut self, options: CompletionOptions) {
        self.completion_options = options;
    }

    /// Candidates for `to_complete` after the already typed `args`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdtree_core::{CommandNode, CommandTree, CompletionDirective};
    ///
    /// let mut tree = CommandTree::new();
    /// let root = tree.insert(CommandNode::new("app"));
    /// tree.add_command(root, CommandNode::new("serve").short("Start the server")).unwrap();
    /// tree.add_command(root, CommandNode::new("status")).unwrap();
    ///
    /// let answer = tree.complete(root, &[], "se");
    /// assert_eq!(answer.candidates, ["serve\tStart the server"]);
    /// assert_eq!(answer.directive, CompletionDirective::NO_FILE_COMP);
    /// ```
    pub fn complete(&mut self, root: CommandId, args: &[String], to_complete: &str) -> Completions {
        let resolution = self.descend(root, args);
        let id = resolution.command;
        debug!(command = %self.path(id), to_complete, "completing");

        let answer = self.complete_at(id, &resolution.args, &resolution.positionals, to_complete);
        if self.completion_options.disable_descriptions {
            answer.without_descriptions()
        } else {
            answer
        }
    }

    fn complete_at(
        &mut self,
        id: CommandId,
        args: &[String],
        positionals: &[String],
        to_complete: &str,
    ) -> Completions {
        self.init_default_help_flag(id);
        self.init_default_version_flag(id);
        let flags = self.cached_flags(id);

        if !self.node(id).disable_flag_parsing {
            if to_complete.starts_with('-') {
                return Completions::new(
                    flag_candidates(flags, to_complete),
                    CompletionDirective::NO_FILE_COMP,
                );
            }
            if let Some(flag) = args.last().and_then(|last| pending_flag(flags, last)) {
                return flag_value_completions(flag);
            }
        }

        let node = self.node(id);
        if let Some(provider) = &node.valid_args_fn {
            let (candidates, directive) = provider(self, id, positionals, to_complete);
            return Completions::new(candidates, directive);
        }

        if !node.valid_arg_list().is_empty() {
            let candidates = node
                .valid_arg_list()
                .iter()
                .filter(|v| v.starts_with(to_complete))
                .cloned()
                .collect();
            return Completions::new(candidates, CompletionDirective::NO_FILE_COMP);
        }

        if !positionals.is_empty() || !node.has_subcommands() {
            return Completions::default();
        }

        let mut candidates = Vec::new();
        for &child in self.declared_children(id) {
            let child = self.node(child);
            if !child.is_available() {
                continue;
            }
            let spellings = std::iter::once(child.name()).chain(child.aliases().iter().map(String::as_str));
            for spelling in spellings.filter(|s| s.starts_with(to_complete)) {
                candidates.push(with_description(spelling, child.short_text()));
            }
        }
        let directive = if candidates.is_empty() {
            CompletionDirective::DEFAULT
        } else {
            CompletionDirective::NO_FILE_COMP
        };
        Completions::new(candidates, directive)
    }

    /// Answers a hidden completion request if `args` starts with one.
    ///
    /// The last word is the one being completed. Returns `None` when `args`
    /// is not a completion request or the root declares a command with the
    /// request name itself.
    pub fn completion_request(&mut self, root: CommandId, args: &[String]) -> Option<Completions> {
        let (first, rest) = args.split_first()?;
        let no_desc = match first.as_str() {
            SHELL_COMP_REQUEST_CMD => false,
            SHELL_COMP_NO_DESC_REQUEST_CMD => true,
            _ => return None,
        };
        if self
            .declared_children(root)
            .iter()
            .any(|c| self.node(*c).name() == first)
        {
            return None;
        }

        let (to_complete, typed) = match rest.split_last() {
            Some((last, typed)) => (last.as_str(), typed),
            None => ("", rest),
        };
        let answer = self.complete(root, typed, to_complete);
        Some(if no_desc {
            answer.without_descriptions()
        } else {
            answer
        })
    }
}
