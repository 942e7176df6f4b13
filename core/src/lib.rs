//! Command tree engine for command-line applications.
//!
//! This crate models a CLI as a tree of nested commands and drives it:
//!
//! - [`CommandTree`] owns every [`CommandNode`] in an arena addressed by
//!   [`CommandId`], with attach/detach, sorted children and path helpers.
//! - Flags are declared locally or globally; each node's full
//!   [`FlagSet`] (local, own global, every ancestor's global) is composed
//!   lazily and rebuilt after any change.
//! - [`CommandTree::find`] resolves an argument vector to the deepest
//!   matching command, skipping flags and their values.
//! - [`CommandTree::execute`] runs the resolved command's lifecycle hooks,
//!   handling help, version and required flags.
//! - Unknown commands get "did you mean" suggestions
//!   ([`rank_suggestions`]); shell completion candidates come from
//!   [`CommandTree::complete`].
//! - Trees can be declared as data ([`CommandSpec`], JSON or YAML) and
//!   linted with [`validate_spec`].
//!
//! # Example
//!
//! ```
//! use cmdtree_core::*;
//!
//! let out = SharedBuffer::default();
//! let mut tree = CommandTree::new();
//! tree.streams_mut().set_output(out.clone());
//!
//! let root = tree.insert(
//!     CommandNode::new("app").global_flag(Flag::bool("verbose", Some('v'), "verbose output")),
//! );
//! tree.add_command(
//!     root,
//!     CommandNode::new("greet <name>")
//!         .args(ExactArgs(1))
//!         .run(|ctx, args| {
//!             let loud = ctx.flags().get_bool("verbose")?;
//!             let greeting = if loud { "HELLO" } else { "hello" };
//!             ctx.streams().println(format!("{greeting} {}", args[0]))?;
//!             Ok(())
//!         }),
//! )
//! .unwrap();
//!
//! tree.set_args(["greet", "-v", "world"]);
//! assert_eq!(tree.execute(root).unwrap(), Outcome::Completed);
//! assert_eq!(out.contents(), "HELLO world\n");
//! ```

mod args;
mod completion;
mod compose;
mod error;
mod flag;
mod flagset;
mod lifecycle;
mod node;
mod resolve;
mod spec;
mod streams;
mod suggest;
mod tree;
mod validate;

pub use args::{
    ArbitraryArgs, ExactArgs, MatchAll, MaximumNArgs, MinimumNArgs, NoArgs, OnlyValidArgs,
    PositionalArgs, RangeArgs, default_policy,
};
pub use completion::{
    CompletionDirective, CompletionOptions, Completions, SHELL_COMP_NO_DESC_REQUEST_CMD,
    SHELL_COMP_REQUEST_CMD, ValidArgsFn,
};
pub use compose::FlagOrigin;
pub use error::{ArgsError, BoxError, Error, FlagError, Result};
pub use flag::{
    ANNOTATION_FILENAME_EXT, ANNOTATION_REQUIRED, ANNOTATION_SUBDIRS_IN_DIR, Flag, FlagKind,
    FlagValue,
};
pub use flagset::{FlagSet, NormalizeFn, word_separator_normalizer};
pub use lifecycle::{
    Execution, FlagErrorFn, HookFn, HookResult, Lifecycle, Outcome, Phase, RunContext,
    render_template,
};
pub use node::{CommandId, CommandNode, MaxLengths};
pub use resolve::{Resolution, args_minus_first};
pub use spec::{ArgsSpec, CommandSpec, FlagSpec, SpecError};
pub use streams::{SharedBuffer, Streams};
pub use suggest::{Candidate, DEFAULT_SUGGESTION_DISTANCE, levenshtein, rank_suggestions};
pub use tree::CommandTree;
pub use validate::{SpecIssue, validate_spec};
