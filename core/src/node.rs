//! Command node definitions.
//!
//! A [`CommandNode`] holds everything declared for one command: its use
//! line, aliases, help text, flags, hooks and validators. Nodes are built
//! with chained builder methods and then moved into a
//! [`CommandTree`](crate::CommandTree), which owns the structure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::args::PositionalArgs;
use crate::compose::FlagBundle;
use crate::completion::ValidArgsFn;
use crate::flag::Flag;
use crate::flagset::NormalizeFn;
use crate::lifecycle::{FlagErrorFn, HookResult, Lifecycle, RunContext};

/// Stable handle of a node inside a [`CommandTree`](crate::CommandTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandId(pub(crate) usize);

impl CommandId {
    /// Arena index of the node.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Longest use line, path and name among a node's children; used to pad
/// help listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaxLengths {
    pub use_line: usize,
    pub path: usize,
    pub name: usize,
}

impl MaxLengths {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn update(&mut self, use_line: usize, path: usize, name: usize) {
        self.use_line = self.use_line.max(use_line);
        self.path = self.path.max(path);
        self.name = self.name.max(name);
    }
}

/// A command: one vertex of the command tree.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{CommandNode, Flag};
///
/// let serve = CommandNode::new("serve [flags] <addr>")
///     .alias("s")
///     .short("Start the server")
///     .flag(Flag::int("port", Some('p'), 8080, "port to listen on"))
///     .run(|ctx, _args| {
///         ctx.streams().println("serving")?;
///         Ok(())
///     });
///
/// assert_eq!(serve.name(), "serve");
/// assert!(serve.has_alias("s"));
/// assert!(serve.is_runnable());
/// ```
pub struct CommandNode {
    use_line: String,
    aliases: Vec<String>,
    suggest_for: Vec<String>,
    short: String,
    long: String,
    example: String,
    deprecated: String,
    version: String,
    version_template: Option<String>,
    valid_args: Vec<String>,
    arg_aliases: Vec<String>,
    pub(crate) args: Option<Box<dyn PositionalArgs>>,
    pub(crate) valid_args_fn: Option<ValidArgsFn>,

    pub hidden: bool,
    pub silence_errors: bool,
    pub silence_usage: bool,
    pub disable_flag_parsing: bool,
    pub disable_suggestions: bool,
    pub disable_flags_in_use_line: bool,
    /// Suggestion threshold; `None` uses
    /// [`DEFAULT_SUGGESTION_DISTANCE`](crate::DEFAULT_SUGGESTION_DISTANCE).
    pub suggestions_min_distance: Option<usize>,

    pub(crate) hooks: Lifecycle,
    pub(crate) flag_error_fn: Option<FlagErrorFn>,
    pub(crate) flags: FlagBundle,

    pub(crate) parent: Option<CommandId>,
    pub(crate) children: Vec<CommandId>,
    pub(crate) sorted_children: Option<Vec<CommandId>>,
    pub(crate) max_lengths: MaxLengths,
    pub(crate) called_as: Option<String>,
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("use_line", &self.use_line)
            .field("aliases", &self.aliases)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("runnable", &self.is_runnable())
            .finish_non_exhaustive()
    }
}

impl CommandNode {
    /// Creates a node from its use line, e.g. `"add [flags] <name>"`.
    pub fn new(use_line: &str) -> Self {
        let name = use_line.split_whitespace().next().unwrap_or_default();
        Self {
            use_line: use_line.to_string(),
            aliases: Vec::new(),
            suggest_for: Vec::new(),
            short: String::new(),
            long: String::new(),
            example: String::new(),
            deprecated: String::new(),
            version: String::new(),
            version_template: None,
            valid_args: Vec::new(),
            arg_aliases: Vec::new(),
            args: None,
            valid_args_fn: None,
            hidden: false,
            silence_errors: false,
            silence_usage: false,
            disable_flag_parsing: false,
            disable_suggestions: false,
            disable_flags_in_use_line: false,
            suggestions_min_distance: None,
            hooks: Lifecycle::default(),
            flag_error_fn: None,
            flags: FlagBundle::new(name),
            parent: None,
            children: Vec::new(),
            sorted_children: None,
            max_lengths: MaxLengths::default(),
            called_as: None,
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Names for which this command is suggested without being an alias.
    pub fn suggest_for(mut self, token: &str) -> Self {
        self.suggest_for.push(token.to_string());
        self
    }

    pub fn short(mut self, text: &str) -> Self {
        self.short = text.to_string();
        self
    }

    pub fn long(mut self, text: &str) -> Self {
        self.long = text.to_string();
        self
    }

    pub fn example(mut self, text: &str) -> Self {
        self.example = text.to_string();
        self
    }

    /// Marks the command deprecated; `message` is printed on every run.
    pub fn deprecated(mut self, message: &str) -> Self {
        self.deprecated = message.to_string();
        self
    }

    /// Declares a version, enabling the default `--version` flag.
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Template for the version line; see
    /// [`render_template`](crate::render_template).
    pub fn version_template(mut self, template: &str) -> Self {
        self.version_template = Some(template.to_string());
        self
    }

    /// Positional-argument validator.
    pub fn args(mut self, validator: impl PositionalArgs + 'static) -> Self {
        self.args = Some(Box::new(validator));
        self
    }

    /// Static list of valid positional arguments, offered by completion.
    pub fn valid_args(mut self, args: &[&str]) -> Self {
        self.valid_args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Accepted spellings that are never offered by completion.
    pub fn arg_aliases(mut self, args: &[&str]) -> Self {
        self.arg_aliases = args.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Dynamic provider of valid positional arguments.
    pub fn valid_args_fn(
        mut self,
        provider: impl Fn(
            &crate::CommandTree,
            CommandId,
            &[String],
            &str,
        ) -> (Vec<String>, crate::CompletionDirective)
        + 'static,
    ) -> Self {
        self.valid_args_fn = Some(Box::new(provider));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn silence_errors(mut self) -> Self {
        self.silence_errors = true;
        self
    }

    pub fn silence_usage(mut self) -> Self {
        self.silence_usage = true;
        self
    }

    /// Passes every token, flags included, to the hooks as positionals.
    pub fn disable_flag_parsing(mut self) -> Self {
        self.disable_flag_parsing = true;
        self
    }

    pub fn disable_suggestions(mut self) -> Self {
        self.disable_suggestions = true;
        self
    }

    pub fn suggestions_min_distance(mut self, distance: usize) -> Self {
        self.suggestions_min_distance = Some(distance);
        self
    }

    /// Declares a flag visible only to this command.
    pub fn flag(mut self, flag: Flag) -> Self {
        self.flags.local.add(flag);
        self
    }

    /// Declares a flag inherited by every descendant.
    pub fn global_flag(mut self, flag: Flag) -> Self {
        self.flags.global.add(flag);
        self
    }

    /// Flag-name normalizer for this command and its descendants.
    pub fn normalize(mut self, normalize: NormalizeFn) -> Self {
        self.flags.set_normalize(Some(normalize));
        self
    }

    pub fn global_pre_run(
        mut self,
        hook: impl Fn(&RunContext<'_>, &[String]) -> HookResult + 'static,
    ) -> Self {
        self.hooks.global_pre_run = Some(Box::new(hook));
        self
    }

    pub fn pre_run(
        mut self,
        hook: impl Fn(&RunContext<'_>, &[String]) -> HookResult + 'static,
    ) -> Self {
        self.hooks.pre_run = Some(Box::new(hook));
        self
    }

    pub fn run(mut self, hook: impl Fn(&RunContext<'_>, &[String]) -> HookResult + 'static) -> Self {
        self.hooks.run = Some(Box::new(hook));
        self
    }

    pub fn post_run(
        mut self,
        hook: impl Fn(&RunContext<'_>, &[String]) -> HookResult + 'static,
    ) -> Self {
        self.hooks.post_run = Some(Box::new(hook));
        self
    }

    pub fn global_post_run(
        mut self,
        hook: impl Fn(&RunContext<'_>, &[String]) -> HookResult + 'static,
    ) -> Self {
        self.hooks.global_post_run = Some(Box::new(hook));
        self
    }

    /// Hook consulted when flag parsing fails here or in a descendant
    /// without its own hook. Returning `Ok(())` suppresses the error.
    pub fn flag_error_fn(
        mut self,
        hook: impl Fn(&RunContext<'_>, crate::FlagError) -> crate::Result<()> + 'static,
    ) -> Self {
        self.flag_error_fn = Some(Box::new(hook));
        self
    }

    /// First word of the use line.
    pub fn name(&self) -> &str {
        self.use_line.split_whitespace().next().unwrap_or_default()
    }

    pub fn use_line(&self) -> &str {
        &self.use_line
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn suggest_for_tokens(&self) -> &[String] {
        &self.suggest_for
    }

    /// Exact-match scan of the aliases.
    pub fn has_alias(&self, token: &str) -> bool {
        self.aliases.iter().any(|a| a == token)
    }

    /// Name followed by aliases, comma separated.
    pub fn name_and_aliases(&self) -> String {
        std::iter::once(self.name())
            .chain(self.aliases.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn short_text(&self) -> &str {
        &self.short
    }

    pub fn long_text(&self) -> &str {
        &self.long
    }

    pub fn example_text(&self) -> &str {
        &self.example
    }

    pub fn has_example(&self) -> bool {
        !self.example.is_empty()
    }

    pub fn deprecation(&self) -> Option<&str> {
        (!self.deprecated.is_empty()).then_some(self.deprecated.as_str())
    }

    pub fn version_string(&self) -> &str {
        &self.version
    }

    pub(crate) fn own_version_template(&self) -> Option<&str> {
        self.version_template.as_deref()
    }

    pub fn valid_arg_list(&self) -> &[String] {
        &self.valid_args
    }

    pub fn arg_alias_list(&self) -> &[String] {
        &self.arg_aliases
    }

    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn has_subcommands(&self) -> bool {
        !self.children.is_empty()
    }

    /// Cached max-length metrics of the children.
    pub fn max_lengths(&self) -> MaxLengths {
        self.max_lengths
    }

    /// Name or alias this command was invoked under, once resolved.
    pub fn called_as(&self) -> Option<&str> {
        self.called_as.as_deref()
    }

    /// Commands without a run hook only print help.
    pub fn is_runnable(&self) -> bool {
        self.hooks.is_runnable()
    }

    pub fn hooks(&self) -> &Lifecycle {
        &self.hooks
    }

    /// Mutable hooks, for installing callbacks after the node joined a tree.
    pub fn hooks_mut(&mut self) -> &mut Lifecycle {
        &mut self.hooks
    }

    /// Whether the command should appear in listings and suggestions.
    pub fn is_available(&self) -> bool {
        !self.hidden && self.deprecated.is_empty()
    }
}
