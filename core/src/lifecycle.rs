//! Command execution lifecycle.
//!
//! Executing a resolved command walks a fixed sequence of phases:
//!
//! ```text
//! Idle -> FlagsParsed -> Validated -> GlobalPreRun -> PreRun
//!      -> Running -> PostRun -> GlobalPostRun -> Done
//! ```
//!
//! The help flag, the version flag and non-runnable commands end the run
//! right after flag parsing with a non-error [`Outcome`]. Any failure ends
//! it with an [`Error`]. Global hooks bubble: only the nearest command
//! (self or ancestor) that declares one has it invoked.

use std::fmt;
use std::sync::atomic::Ordering;

use tracing::{debug, trace};

use crate::error::{BoxError, Error, FlagError, Result};
use crate::flag::Flag;
use crate::flagset::FlagSet;
use crate::node::{CommandId, CommandNode};
use crate::streams::Streams;
use crate::tree::CommandTree;

/// Result returned by lifecycle hooks.
pub type HookResult = std::result::Result<(), BoxError>;

/// A lifecycle hook.
pub type HookFn = Box<dyn Fn(&RunContext<'_>, &[String]) -> HookResult>;

/// Hook that may rewrite (`Err`) or suppress (`Ok`) a flag parse error.
pub type FlagErrorFn = Box<dyn Fn(&RunContext<'_>, FlagError) -> Result<()>>;

/// Execution phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    FlagsParsed,
    Validated,
    GlobalPreRun,
    PreRun,
    Running,
    PostRun,
    GlobalPostRun,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::FlagsParsed => "flags-parsed",
            Phase::Validated => "validated",
            Phase::GlobalPreRun => "global-pre-run",
            Phase::PreRun => "pre-run",
            Phase::Running => "running",
            Phase::PostRun => "post-run",
            Phase::GlobalPostRun => "global-post-run",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a successful execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every declared hook ran.
    Completed,
    /// Help was asked for, or the command is not runnable. Rendering help is
    /// up to the caller.
    HelpRequested,
    /// The version line was written to the output stream.
    VersionShown,
    /// A flag-error hook swallowed a parse failure.
    FlagErrorSuppressed,
}

/// The five optional lifecycle hooks of a command.
#[derive(Default)]
pub struct Lifecycle {
    pub global_pre_run: Option<HookFn>,
    pub pre_run: Option<HookFn>,
    pub run: Option<HookFn>,
    pub post_run: Option<HookFn>,
    pub global_post_run: Option<HookFn>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("global_pre_run", &self.global_pre_run.is_some())
            .field("pre_run", &self.pre_run.is_some())
            .field("run", &self.run.is_some())
            .field("post_run", &self.post_run.is_some())
            .field("global_post_run", &self.global_post_run.is_some())
            .finish()
    }
}

impl Lifecycle {
    pub fn is_runnable(&self) -> bool {
        self.run.is_some()
    }

    pub fn set_run(&mut self, hook: impl Fn(&RunContext<'_>, &[String]) -> HookResult + 'static) {
        self.run = Some(Box::new(hook));
    }
}

/// What a hook sees of the running command.
pub struct RunContext<'a> {
    tree: &'a CommandTree,
    id: CommandId,
}

impl<'a> RunContext<'a> {
    /// The whole tree, for walking ancestors or children.
    pub fn tree(&self) -> &'a CommandTree {
        self.tree
    }

    /// The command being executed (not the one owning a bubbled hook).
    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn command(&self) -> &'a CommandNode {
        self.tree.node(self.id)
    }

    /// Parsed full flag set of the running command.
    pub fn flags(&self) -> &'a FlagSet {
        self.tree.cached_flags(self.id)
    }

    pub fn path(&self) -> String {
        self.tree.path(self.id)
    }

    pub fn streams(&self) -> &'a Streams {
        &self.tree.streams
    }

    /// Whether the embedding caller raised the tree's cancellation flag.
    pub fn is_cancelled(&self) -> bool {
        self.tree
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Result of [`CommandTree::execute_c`]: the command that ran (or failed
/// to resolve) and how it ended.
#[derive(Debug)]
pub struct Execution {
    pub command: CommandId,
    pub result: Result<Outcome>,
}

/// Substitutes `{name}`, `{version}`, `{use}` and `{path}` in `template`.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{CommandNode, CommandTree, render_template};
///
/// let mut tree = CommandTree::new();
/// let root = tree.insert(CommandNode::new("app").version("1.2.0"));
/// assert_eq!(render_template("{path} v{version}", &tree, root), "app v1.2.0");
/// ```
pub fn render_template(template: &str, tree: &CommandTree, id: CommandId) -> String {
    let node = tree.node(id);
    template
        .replace("{name}", node.name())
        .replace("{version}", node.version_string())
        .replace("{use}", node.use_line())
        .replace("{path}", &tree.path(id))
}

impl CommandTree {
    /// Nearest of `id` and its ancestors for which `pick` yields a value.
    pub(crate) fn nearest<'s, T: ?Sized>(
        &'s self,
        id: CommandId,
        pick: impl Fn(&'s CommandNode) -> Option<&'s T>,
    ) -> Option<&'s T> {
        self.ancestors(id).find_map(|a| pick(self.node(a)))
    }

    /// Version line for `id`, using the nearest version template.
    pub fn version_text(&self, id: CommandId) -> String {
        match self.nearest(id, CommandNode::own_version_template) {
            Some(template) => render_template(template, self, id),
            None if self.node(id).name().is_empty() => {
                format!("version {}\n", self.node(id).version_string())
            }
            None => render_template("{name} version {version}\n", self, id),
        }
    }

    /// Registers `--help`/`-h` on the full set of `id` unless present.
    pub fn init_default_help_flag(&mut self, id: CommandId) {
        let usage = match self.node(id).name() {
            "" => "help for this command".to_string(),
            name => format!("help for {name}"),
        };
        let flags = self.flags_mut(id);
        if flags.lookup("help").is_none() {
            flags.add(Flag::bool("help", Some('h'), &usage));
        }
    }

    /// Registers `--version` (with `-v` when free) on commands that
    /// declare a version.
    pub fn init_default_version_flag(&mut self, id: CommandId) {
        if self.node(id).version_string().is_empty() {
            return;
        }
        let usage = match self.node(id).name() {
            "" => "version for this command".to_string(),
            name => format!("version for {name}"),
        };
        let flags = self.flags_mut(id);
        if flags.lookup("version").is_none() {
            let shorthand = flags.shorthand_lookup('v').is_none().then_some('v');
            flags.add(Flag::bool("version", shorthand, &usage));
        }
    }

    /// Runs the lifecycle of an already resolved command.
    ///
    /// `args` are the tokens left for `id` after resolution (flags
    /// included).
    pub fn execute_command(&mut self, id: CommandId, args: &[String]) -> Result<Outcome> {
        trace!(command = %self.path(id), phase = %Phase::Idle, "executing");

        if let Some(message) = self.node(id).deprecation() {
            self.streams.println(format!(
                "Command {:?} is deprecated, {message}",
                self.node(id).name()
            ))?;
        }

        self.init_default_help_flag(id);
        self.init_default_version_flag(id);

        let parse_flags = !self.node(id).disable_flag_parsing;
        let positional = if parse_flags {
            let flags = self.flags_mut(id);
            match flags.parse(args) {
                Ok(()) => flags.args().to_vec(),
                Err(err) => return self.handle_flag_error(id, err),
            }
        } else {
            self.flags_mut(id).reset();
            args.to_vec()
        };
        trace!(phase = %Phase::FlagsParsed, positional = ?positional);

        let flags = self.cached_flags(id);
        if flags.get_bool("help").unwrap_or(false) {
            return Ok(Outcome::HelpRequested);
        }
        if !self.node(id).version_string().is_empty() && flags.get_bool("version").unwrap_or(false)
        {
            self.streams.print(self.version_text(id))?;
            return Ok(Outcome::VersionShown);
        }
        if !self.node(id).is_runnable() {
            return Ok(Outcome::HelpRequested);
        }

        self.validate_args(id, &positional)?;
        trace!(phase = %Phase::Validated);

        let ctx = RunContext { tree: &*self, id };

        if let Some(hook) = self.nearest(id, |n| n.hooks.global_pre_run.as_ref()) {
            invoke(hook, &ctx, &positional, Phase::GlobalPreRun)?;
        }
        if let Some(hook) = &self.node(id).hooks.pre_run {
            invoke(hook, &ctx, &positional, Phase::PreRun)?;
        }
        if parse_flags {
            self.validate_required_flags(id)?;
        }
        if let Some(hook) = &self.node(id).hooks.run {
            invoke(hook, &ctx, &positional, Phase::Running)?;
        }
        if let Some(hook) = &self.node(id).hooks.post_run {
            invoke(hook, &ctx, &positional, Phase::PostRun)?;
        }
        if let Some(hook) = self.nearest(id, |n| n.hooks.global_post_run.as_ref()) {
            invoke(hook, &ctx, &positional, Phase::GlobalPostRun)?;
        }

        debug!(command = %self.path(id), phase = %Phase::Done, "command finished");
        Ok(Outcome::Completed)
    }

    fn handle_flag_error(&self, id: CommandId, err: FlagError) -> Result<Outcome> {
        debug!(command = %self.path(id), error = %err, "flag parsing failed");
        let ctx = RunContext { tree: &*self, id };
        match self.nearest(id, |n| n.flag_error_fn.as_ref()) {
            Some(hook) => hook(&ctx, err).map(|()| Outcome::FlagErrorSuppressed),
            None => Err(Error::Flag(err)),
        }
    }

    /// Fails with every required flag of the full set that was not set.
    pub fn validate_required_flags(&self, id: CommandId) -> Result<()> {
        let missing: Vec<String> = self
            .cached_flags(id)
            .iter()
            .filter(|f| f.is_required() && !f.changed)
            .map(|f| f.name.clone())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingRequiredFlags(missing))
        }
    }

    /// Resolves the configured arguments from the root of `id` and runs the
    /// matched command.
    ///
    /// Uses [`set_args`](Self::set_args) when given, the process arguments
    /// otherwise. A leading hidden completion request is answered on the
    /// output stream instead. Errors are printed to the error stream as `Error: ...`
    /// unless the command or the root silences errors.
    pub fn execute_c(&mut self, id: CommandId) -> Execution {
        let root = self.root(id);
        let args = match &self.args {
            Some(args) => args.clone(),
            None => std::env::args().skip(1).collect(),
        };

        if let Some(answer) = self.completion_request(root, &args) {
            let result = self
                .streams
                .print(answer.to_shell_output())
                .map(|()| Outcome::Completed)
                .map_err(Error::from);
            return Execution {
                command: root,
                result,
            };
        }

        let resolution = self.descend(root, &args);
        let command = resolution.command;
        if self.node(command).called_as.is_none() {
            let name = self.node(command).name().to_string();
            self.node_mut(command).called_as = Some(name);
        }

        let result = match self.validate_args(command, &resolution.positionals) {
            Ok(()) => self.execute_command(command, &resolution.args),
            Err(err) => Err(Error::Args(err)),
        };

        if let Err(err) = &result {
            self.report(root, command, err);
        }
        Execution { command, result }
    }

    /// Like [`execute_c`](Self::execute_c), returning only the outcome.
    pub fn execute(&mut self, id: CommandId) -> Result<Outcome> {
        self.execute_c(id).result
    }

    fn report(&self, root: CommandId, command: CommandId, err: &Error) {
        let silenced = |id: CommandId| self.node(id).silence_errors;
        if !silenced(root) && !silenced(command) {
            let _ = self.streams.eprintln(format!("Error: {err}"));
        }
        let quiet = |id: CommandId| self.node(id).silence_usage;
        if !quiet(root) && !quiet(command) {
            let _ = self
                .streams
                .eprintln(format!("Run '{} --help' for usage.", self.path(command)));
        }
    }
}

fn invoke(hook: &HookFn, ctx: &RunContext<'_>, args: &[String], phase: Phase) -> Result<()> {
    trace!(%phase, command = %ctx.path(), "invoking hook");
    hook(ctx, args).map_err(|source| Error::Hook { phase, source })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::args::ExactArgs;
    use crate::streams::SharedBuffer;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder(
        log: &Log,
        label: &'static str,
    ) -> impl Fn(&RunContext<'_>, &[String]) -> HookResult + 'static {
        let log = Rc::clone(log);
        move |ctx, args| {
            log.borrow_mut()
                .push(format!("{label}:{}:{}", ctx.command().name(), args.join(",")));
            Ok(())
        }
    }

    #[test]
    fn test_hooks_run_in_order() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new();
        let root = tree.insert(
            CommandNode::new("app")
                .global_pre_run(recorder(&log, "gpre"))
                .global_post_run(recorder(&log, "gpost")),
        );
        let leaf = tree
            .add_command(
                root,
                CommandNode::new("leaf")
                    .pre_run(recorder(&log, "pre"))
                    .run(recorder(&log, "run"))
                    .post_run(recorder(&log, "post")),
            )
            .unwrap();

        let outcome = tree.execute_command(leaf, &argv(&["x"])).unwrap();
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(
            *log.borrow(),
            vec!["gpre:leaf:x", "pre:leaf:x", "run:leaf:x", "post:leaf:x", "gpost:leaf:x"]
        );
    }

    #[test]
    fn test_only_nearest_global_hook_fires() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new();
        let a = tree.insert(CommandNode::new("a").global_pre_run(recorder(&log, "a")));
        let b = tree
            .add_command(a, CommandNode::new("b").global_pre_run(recorder(&log, "b")))
            .unwrap();
        let c = tree
            .add_command(
                b,
                CommandNode::new("c")
                    .global_pre_run(recorder(&log, "c"))
                    .run(|_, _| Ok(())),
            )
            .unwrap();
        let d = tree
            .add_command(c, CommandNode::new("d").run(|_, _| Ok(())))
            .unwrap();

        tree.execute_command(d, &[]).unwrap();
        assert_eq!(*log.borrow(), vec!["c:d:"]);

        log.borrow_mut().clear();
        tree.execute_command(c, &[]).unwrap();
        assert_eq!(*log.borrow(), vec!["c:c:"]);
    }

    #[test]
    fn test_help_flag_short_circuits() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app").run(recorder(&log, "run")));

        let outcome = tree.execute_command(root, &argv(&["-h"])).unwrap();
        assert_eq!(outcome, Outcome::HelpRequested);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_non_runnable_requests_help() {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("group"));
        assert_eq!(
            tree.execute_command(root, &[]).unwrap(),
            Outcome::HelpRequested
        );
    }

    #[test]
    fn test_version_flag_prints_version() {
        let out = SharedBuffer::default();
        let mut tree = CommandTree::new();
        tree.streams_mut().set_output(out.clone());
        let root = tree.insert(CommandNode::new("app").version("2.0.1").run(|_, _| Ok(())));

        let outcome = tree.execute_command(root, &argv(&["-v"])).unwrap();
        assert_eq!(outcome, Outcome::VersionShown);
        assert_eq!(out.contents(), "app version 2.0.1\n");
    }

    #[test]
    fn test_version_flag_skips_taken_shorthand() {
        let mut tree = CommandTree::new();
        let root = tree.insert(
            CommandNode::new("app")
                .version("1.0")
                .flag(Flag::bool("verbose", Some('v'), "")),
        );
        tree.init_default_version_flag(root);
        assert_eq!(tree.flags(root).lookup("version").unwrap().shorthand, None);
    }

    #[test]
    fn test_version_template_inherited() {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app").version_template("{path}@{version}\n"));
        let child = tree
            .add_command(root, CommandNode::new("sub").version("3"))
            .unwrap();
        assert_eq!(tree.version_text(child), "app sub@3\n");
    }

    #[test]
    fn test_missing_required_flags_aggregate() {
        fn deploy() -> (CommandTree, CommandId) {
            let mut tree = CommandTree::new();
            let root = tree.insert(
                CommandNode::new("deploy")
                    .flag(Flag::string("env", None, "", "").required())
                    .flag(Flag::string("region", None, "", "").required())
                    .run(|_, _| Ok(())),
            );
            (tree, root)
        }

        let (mut tree, root) = deploy();
        let err = tree
            .execute_command(root, &argv(&["--env", "prod"]))
            .unwrap_err();
        assert!(matches!(err, Error::MissingRequiredFlags(ref names) if names == &["region"]));

        let (mut tree, root) = deploy();
        let err = tree.execute_command(root, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "required flag(s) \"env\", \"region\" not set"
        );
    }

    #[test]
    fn test_help_does_not_stick_across_runs() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app").run(recorder(&log, "run")));

        assert_eq!(
            tree.execute_command(root, &argv(&["-h"])).unwrap(),
            Outcome::HelpRequested
        );
        assert_eq!(tree.execute_command(root, &[]).unwrap(), Outcome::Completed);
        assert_eq!(*log.borrow(), vec!["run:app:"]);
    }

    #[test]
    fn test_required_flag_checked_on_every_run() {
        let mut tree = CommandTree::new();
        let root = tree.insert(
            CommandNode::new("deploy")
                .flag(Flag::string("env", None, "", "").required())
                .run(|ctx, _| {
                    ctx.streams().println(ctx.flags().get_string("env")?)?;
                    Ok(())
                }),
        );

        assert_eq!(
            tree.execute_command(root, &argv(&["--env", "x"])).unwrap(),
            Outcome::Completed
        );
        let err = tree.execute_command(root, &[]).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredFlags(ref names) if names == &["env"]));
        assert_eq!(tree.cached_flags(root).get_string("env").unwrap(), "");
    }

    #[test]
    fn test_execute_c_passes_tokens_after_double_dash() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app"));
        tree.add_command(
            root,
            CommandNode::new("cat <file>")
                .args(ExactArgs(1))
                .run(recorder(&log, "run")),
        )
        .unwrap();

        tree.set_args(["cat", "--", "-weird"]);
        assert_eq!(tree.execute(root).unwrap(), Outcome::Completed);
        tree.set_args(["cat", "--", "file"]);
        assert_eq!(tree.execute(root).unwrap(), Outcome::Completed);
        assert_eq!(*log.borrow(), vec!["run:cat:-weird", "run:cat:file"]);
    }

    #[test]
    fn test_hook_error_aborts_remaining_hooks() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new();
        let root = tree.insert(
            CommandNode::new("app")
                .pre_run(|_, _| Err("pre failed".into()))
                .run(recorder(&log, "run")),
        );

        let err = tree.execute_command(root, &[]).unwrap_err();
        assert_eq!(err.to_string(), "pre failed");
        assert_eq!(err.phase(), Some(Phase::PreRun));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_positional_validation_failure() {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("get").args(ExactArgs(1)).run(|_, _| Ok(())));
        let err = tree.execute_command(root, &argv(&["a", "b"])).unwrap_err();
        assert!(matches!(err, Error::Args(_)));
    }

    #[test]
    fn test_flag_error_hook_nearest_ancestor() {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app").flag_error_fn(|ctx, err| {
            Err(Error::InvalidConfig(format!("{}: {err}", ctx.path())))
        }));
        let child = tree
            .add_command(root, CommandNode::new("child").run(|_, _| Ok(())))
            .unwrap();

        let err = tree
            .execute_command(child, &argv(&["--nope"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: app child: unknown flag: --nope"
        );
    }

    #[test]
    fn test_flag_error_hook_can_suppress() {
        let mut tree = CommandTree::new();
        let root = tree.insert(
            CommandNode::new("app")
                .flag_error_fn(|_, _| Ok(()))
                .run(|_, _| Err("should not run".into())),
        );
        assert_eq!(
            tree.execute_command(root, &argv(&["--nope"])).unwrap(),
            Outcome::FlagErrorSuppressed
        );
    }

    #[test]
    fn test_disable_flag_parsing_passes_flags_through() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new();
        let root = tree.insert(
            CommandNode::new("exec")
                .disable_flag_parsing()
                .run(recorder(&log, "run")),
        );
        tree.execute_command(root, &argv(&["--raw", "-x"])).unwrap();
        assert_eq!(*log.borrow(), vec!["run:exec:--raw,-x"]);
    }

    #[test]
    fn test_deprecation_notice() {
        let out = SharedBuffer::default();
        let mut tree = CommandTree::new();
        tree.streams_mut().set_output(out.clone());
        let root = tree.insert(CommandNode::new("old").deprecated("use new").run(|_, _| Ok(())));
        tree.execute_command(root, &[]).unwrap();
        assert_eq!(out.contents(), "Command \"old\" is deprecated, use new\n");
    }

    #[test]
    fn test_execute_c_reports_unknown_command() {
        let err_out = SharedBuffer::default();
        let mut tree = CommandTree::new();
        tree.streams_mut().set_error(err_out.clone());
        let root = tree.insert(CommandNode::new("app").silence_usage());
        tree.add_command(root, CommandNode::new("serve").run(|_, _| Ok(())))
            .unwrap();
        tree.set_args(["serv"]);

        let execution = tree.execute_c(root);
        assert_eq!(execution.command, root);
        assert!(matches!(execution.result, Err(Error::Args(_))));
        assert!(err_out.contents().starts_with("Error: unknown command \"serv\" for \"app\""));
        assert!(err_out.contents().contains("\tserve\n"));
    }

    #[test]
    fn test_execute_c_runs_from_root_and_records_called_as() {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app"));
        let serve = tree
            .add_command(root, CommandNode::new("serve").alias("s").run(|_, _| Ok(())))
            .unwrap();
        tree.set_args(["s"]);

        let execution = tree.execute_c(serve);
        assert_eq!(execution.command, serve);
        assert_eq!(execution.result.unwrap(), Outcome::Completed);
        assert_eq!(tree.node(serve).called_as(), Some("s"));
    }

    #[test]
    fn test_cancellation_visible_to_hooks() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicBool;

        let flag = Arc::new(AtomicBool::new(true));
        let mut tree = CommandTree::new();
        tree.set_cancellation(Arc::clone(&flag));
        let root = tree.insert(CommandNode::new("app").run(|ctx, _| {
            if ctx.is_cancelled() {
                return Err("cancelled".into());
            }
            Ok(())
        }));
        assert_eq!(tree.execute_command(root, &[]).unwrap_err().to_string(), "cancelled");

        flag.store(false, Ordering::SeqCst);
        assert!(tree.execute_command(root, &[]).is_ok());
    }
}
