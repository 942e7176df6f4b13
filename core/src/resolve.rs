//! Argument-vector resolution.
//!
//! Resolution walks down from a root, peeling off the first bare token that
//! names a child at each level. Flag-like tokens are skipped using the flag
//! set of the node being examined, so a value such as `8080` in
//! `--port 8080` is never mistaken for a subcommand.

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Result;
use crate::flagset::FlagSet;
use crate::node::CommandId;
use crate::tree::CommandTree;

/// The command an argument vector targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub command: CommandId,
    /// Tokens left for the command after removing the subcommand names,
    /// flags included.
    pub args: Vec<String>,
    /// `args` without flags and flag values; tokens after `--` are kept.
    pub positionals: Vec<String>,
}

/// Removes the first token equal to `token`.
///
/// # Examples
///
/// ```
/// use cmdtree_core::args_minus_first;
///
/// let args: Vec<String> = ["a", "b", "a"].iter().map(|s| s.to_string()).collect();
/// assert_eq!(args_minus_first(&args, "a"), ["b", "a"]);
/// assert_eq!(args_minus_first(&args, "z"), args);
/// ```
pub fn args_minus_first(args: &[String], token: &str) -> Vec<String> {
    let mut out = args.to_vec();
    if let Some(pos) = out.iter().position(|a| a == token) {
        out.remove(pos);
    }
    out
}

/// Bare tokens of `args` under the flag declarations of `flags`, plus the
/// tokens following a terminating `--`.
fn bare_tokens<'a>(args: &'a [String], flags: &FlagSet) -> (Vec<String>, &'a [String]) {
    let takes_value_long = |name: &str| !flags.lookup(name).is_some_and(|f| f.has_no_opt_default());
    let takes_value_short = |s: &str| {
        let shorthand = s.chars().nth(1);
        !shorthand
            .and_then(|c| flags.shorthand_lookup(c))
            .is_some_and(|f| f.has_no_opt_default())
    };

    let mut commands = Vec::new();
    let mut escaped: &[String] = &[];
    let mut rest = args;
    while let Some((token, tail)) = rest.split_first() {
        rest = tail;
        let consumes = if token == "--" {
            escaped = rest;
            break;
        } else if let Some(name) = token.strip_prefix("--") {
            !token.contains('=') && takes_value_long(name)
        } else {
            token.starts_with('-')
                && !token.contains('=')
                && token.chars().count() == 2
                && takes_value_short(token)
        };

        if consumes {
            if rest.len() <= 1 {
                break;
            }
            rest = &rest[1..];
        } else if !token.is_empty() && !token.starts_with('-') {
            commands.push(token.clone());
        }
    }
    (commands, escaped)
}

impl CommandTree {
    /// Bare (non-flag) tokens of `args` as seen by `id`'s full flag set.
    ///
    /// `--name` and `-x` consume the next token unless the flag is declared
    /// to take no value; `--` stops the scan.
    pub fn strip_flags(&mut self, id: CommandId, args: &[String]) -> Vec<String> {
        if args.is_empty() {
            return Vec::new();
        }
        bare_tokens(args, self.flags(id)).0
    }

    /// Positional arguments `id` receives from `args`: the bare tokens
    /// before `--` followed by everything after it. With flag parsing
    /// disabled every token is positional.
    pub fn positional_args(&mut self, id: CommandId, args: &[String]) -> Vec<String> {
        if self.node(id).disable_flag_parsing {
            return args.to_vec();
        }
        let (mut positionals, escaped) = bare_tokens(args, self.flags(id));
        positionals.extend(escaped.iter().cloned());
        positionals
    }

    /// Descends from `root` to the deepest command named by `args`, without
    /// validating positionals.
    pub fn descend(&mut self, root: CommandId, args: &[String]) -> Resolution {
        let mut current = root;
        let mut remaining = args.to_vec();
        loop {
            let bare = self.strip_flags(current, &remaining);
            let Some(next) = bare.first() else {
                break;
            };
            match self.find_next(current, next) {
                Some(child) => {
                    trace!(parent = %self.path(current), token = %next, "descending");
                    remaining = args_minus_first(&remaining, next);
                    current = child;
                }
                None => break,
            }
        }

        let positionals = self.positional_args(current, &remaining);
        debug!(command = %self.path(current), args = ?remaining, "resolved command");
        Resolution {
            command: current,
            args: remaining,
            positionals,
        }
    }

    /// Resolves `args` from `root` and validates the positional leftovers
    /// of the matched command.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdtree_core::{CommandNode, CommandTree, Flag};
    ///
    /// let mut tree = CommandTree::new();
    /// let root = tree.insert(CommandNode::new("app"));
    /// let serve = tree
    ///     .add_command(
    ///         root,
    ///         CommandNode::new("serve")
    ///             .alias("s")
    ///             .flag(Flag::int("port", Some('p'), 80, "")),
    ///     )
    ///     .unwrap();
    ///
    /// let args: Vec<String> = ["s", "--port", "8080", "extra"]
    ///     .iter()
    ///     .map(|s| s.to_string())
    ///     .collect();
    /// let found = tree.find(root, &args).unwrap();
    /// assert_eq!(found.command, serve);
    /// assert_eq!(found.args, ["--port", "8080", "extra"]);
    /// assert_eq!(found.positionals, ["extra"]);
    /// ```
    pub fn find(&mut self, root: CommandId, args: &[String]) -> Result<Resolution> {
        let resolution = self.descend(root, args);
        self.validate_args(resolution.command, &resolution.positionals)?;
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ExactArgs;
    use crate::error::{ArgsError, Error};
    use crate::flag::Flag;
    use crate::node::CommandNode;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn server_tree() -> (CommandTree, CommandId, CommandId) {
        let mut tree = CommandTree::new();
        let root = tree.insert(
            CommandNode::new("app")
                .global_flag(Flag::bool("verbose", Some('v'), ""))
                .global_flag(Flag::string("config", Some('c'), "", "")),
        );
        let serve = tree
            .add_command(
                root,
                CommandNode::new("serve")
                    .alias("s")
                    .flag(Flag::int("port", Some('p'), 80, "")),
            )
            .unwrap();
        (tree, root, serve)
    }

    #[test]
    fn test_alias_consumed_and_leftovers_kept() {
        let (mut tree, root, serve) = server_tree();
        let found = tree
            .find(root, &argv(&["s", "--port", "8080", "extra"]))
            .unwrap();
        assert_eq!(found.command, serve);
        assert_eq!(found.positionals, ["extra"]);
        assert_eq!(tree.node(serve).called_as(), Some("s"));
    }

    #[test]
    fn test_flag_value_not_taken_for_subcommand() {
        let (mut tree, root, serve) = server_tree();
        tree.add_command(root, CommandNode::new("prod")).unwrap();

        let found = tree
            .descend(root, &argv(&["--config", "prod", "serve"]))
            .command;
        assert_eq!(found, serve);
    }

    #[test]
    fn test_no_value_flag_does_not_consume() {
        let (mut tree, root, serve) = server_tree();
        assert_eq!(tree.descend(root, &argv(&["--verbose", "serve"])).command, serve);
        assert_eq!(tree.descend(root, &argv(&["-v", "serve"])).command, serve);
    }

    #[test]
    fn test_double_dash_stops_descent() {
        let (mut tree, root, _) = server_tree();
        let found = tree.descend(root, &argv(&["--", "serve"]));
        assert_eq!(found.command, root);
        assert_eq!(found.args, ["--", "serve"]);
        assert_eq!(found.positionals, ["serve"]);
    }

    #[test]
    fn test_tokens_after_double_dash_reach_validator() {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app"));
        let cat = tree
            .add_command(root, CommandNode::new("cat <file>").args(ExactArgs(1)))
            .unwrap();

        let found = tree.find(root, &argv(&["cat", "--", "-weird"])).unwrap();
        assert_eq!(found.command, cat);
        assert_eq!(found.positionals, ["-weird"]);

        let found = tree.find(root, &argv(&["cat", "--", "file"])).unwrap();
        assert_eq!(found.positionals, ["file"]);
        assert!(tree.find(root, &argv(&["cat", "a", "--", "b"])).is_err());
    }

    #[test]
    fn test_flag_value_double_dash_not_duplicated() {
        let (mut tree, root, _) = server_tree();
        let found = tree.descend(root, &argv(&["--config", "--", "x"]));
        assert_eq!(found.positionals, ["x"]);
    }

    #[test]
    fn test_disabled_flag_parsing_keeps_every_token() {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app"));
        tree.add_command(root, CommandNode::new("exec").disable_flag_parsing())
            .unwrap();
        let found = tree.descend(root, &argv(&["exec", "--raw", "x"]));
        assert_eq!(found.positionals, ["--raw", "x"]);
    }

    #[test]
    fn test_no_bare_tokens_matches_current() {
        let (mut tree, root, _) = server_tree();
        let args = argv(&["-v", "--config=x"]);
        let found = tree.descend(root, &args);
        assert_eq!(found.command, root);
        assert_eq!(found.args, args);
    }

    #[test]
    fn test_lone_dash_and_empty_ignored() {
        let (mut tree, root, serve) = server_tree();
        assert_eq!(tree.descend(root, &argv(&["-", "", "serve"])).command, serve);
    }

    #[test]
    fn test_value_flag_at_end_stops_scan() {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app").flag(Flag::string("name", None, "", "")));
        assert!(tree.strip_flags(root, &argv(&["--name", "x"])).is_empty());
        assert_eq!(tree.strip_flags(root, &argv(&["a", "--name", "x", "b"])), ["a", "b"]);
    }

    #[test]
    fn test_unknown_command_at_root() {
        let (mut tree, root, _) = server_tree();
        let err = tree.find(root, &argv(&["serv"])).unwrap_err();
        match err {
            Error::Args(ArgsError::UnknownCommand { suggestions, .. }) => {
                assert_eq!(suggestions, ["serve"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_removal_is_by_first_occurrence() {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app"));
        let run = tree
            .add_command(root, CommandNode::new("run").run(|_, _| Ok(())))
            .unwrap();
        let found = tree.descend(root, &argv(&["run", "run"]));
        assert_eq!(found.command, run);
        assert_eq!(found.args, ["run"]);
    }
}
