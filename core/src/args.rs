//! Positional-argument validators.
//!
//! A validator sees the tree, the resolved command and the positional
//! arguments left after flag stripping. Any closure with that signature is
//! a validator; the structs here cover the common arity rules.

use tracing::warn;

use crate::error::ArgsError;
use crate::node::CommandId;
use crate::tree::CommandTree;

/// Validates the positional arguments of a resolved command.
pub trait PositionalArgs {
    fn validate(&self, tree: &CommandTree, id: CommandId, args: &[String]) -> Result<(), ArgsError>;
}

impl<F> PositionalArgs for F
where
    F: Fn(&CommandTree, CommandId, &[String]) -> Result<(), ArgsError>,
{
    fn validate(&self, tree: &CommandTree, id: CommandId, args: &[String]) -> Result<(), ArgsError> {
        self(tree, id, args)
    }
}

/// Rejects any positional argument.
#[derive(Debug, Clone, Copy)]
pub struct NoArgs;

impl PositionalArgs for NoArgs {
    fn validate(&self, tree: &CommandTree, id: CommandId, args: &[String]) -> Result<(), ArgsError> {
        match args.first() {
            Some(first) => Err(ArgsError::UnknownCommand {
                command: first.clone(),
                path: tree.path(id),
                suggestions: Vec::new(),
            }),
            None => Ok(()),
        }
    }
}

/// Accepts anything.
#[derive(Debug, Clone, Copy)]
pub struct ArbitraryArgs;

impl PositionalArgs for ArbitraryArgs {
    fn validate(&self, _: &CommandTree, _: CommandId, _: &[String]) -> Result<(), ArgsError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MinimumNArgs(pub usize);

impl PositionalArgs for MinimumNArgs {
    fn validate(&self, _: &CommandTree, _: CommandId, args: &[String]) -> Result<(), ArgsError> {
        if args.len() < self.0 {
            return Err(ArgsError::TooFew {
                min: self.0,
                received: args.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MaximumNArgs(pub usize);

impl PositionalArgs for MaximumNArgs {
    fn validate(&self, _: &CommandTree, _: CommandId, args: &[String]) -> Result<(), ArgsError> {
        if args.len() > self.0 {
            return Err(ArgsError::TooMany {
                max: self.0,
                received: args.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExactArgs(pub usize);

impl PositionalArgs for ExactArgs {
    fn validate(&self, _: &CommandTree, _: CommandId, args: &[String]) -> Result<(), ArgsError> {
        if args.len() != self.0 {
            return Err(ArgsError::WrongCount {
                expected: self.0,
                received: args.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RangeArgs(pub usize, pub usize);

impl PositionalArgs for RangeArgs {
    fn validate(&self, _: &CommandTree, _: CommandId, args: &[String]) -> Result<(), ArgsError> {
        let RangeArgs(min, max) = *self;
        if args.len() < min || args.len() > max {
            return Err(ArgsError::OutOfRange {
                min,
                max,
                received: args.len(),
            });
        }
        Ok(())
    }
}

/// Accepts only arguments from the command's valid-args list or its arg
/// aliases. Commands without a valid-args list accept anything.
#[derive(Debug, Clone, Copy)]
pub struct OnlyValidArgs;

impl PositionalArgs for OnlyValidArgs {
    fn validate(&self, tree: &CommandTree, id: CommandId, args: &[String]) -> Result<(), ArgsError> {
        let node = tree.node(id);
        if node.valid_arg_list().is_empty() {
            return Ok(());
        }
        let allowed = |arg: &String| {
            node.valid_arg_list()
                .iter()
                .chain(node.arg_alias_list())
                .any(|valid| valid.split('\t').next() == Some(arg.as_str()))
        };
        match args.iter().find(|arg| !allowed(arg)) {
            Some(arg) => Err(ArgsError::InvalidArg {
                arg: arg.clone(),
                path: tree.path(id),
            }),
            None => Ok(()),
        }
    }
}

/// Runs every validator in order, stopping at the first failure.
pub struct MatchAll(pub Vec<Box<dyn PositionalArgs>>);

impl PositionalArgs for MatchAll {
    fn validate(&self, tree: &CommandTree, id: CommandId, args: &[String]) -> Result<(), ArgsError> {
        self.0
            .iter()
            .try_for_each(|validator| validator.validate(tree, id, args))
    }
}

/// Policy applied when a command declares no validator.
///
/// Leaf commands accept anything. A root with subcommands treats a
/// leftover as an unknown command and attaches suggestions. Other
/// commands accept.
pub fn default_policy(tree: &CommandTree, id: CommandId, args: &[String]) -> Result<(), ArgsError> {
    let node = tree.node(id);
    if !node.has_subcommands() || node.has_parent() {
        return Ok(());
    }
    let Some(first) = args.first() else {
        return Ok(());
    };

    let suggestions = if node.disable_suggestions {
        Vec::new()
    } else {
        tree.suggestions_for(id, first).unwrap_or_else(|err| {
            warn!(command = %tree.path(id), error = %err, "suggestions disabled");
            Vec::new()
        })
    };
    Err(ArgsError::UnknownCommand {
        command: first.clone(),
        path: tree.path(id),
        suggestions,
    })
}

impl CommandTree {
    /// Validates `args` with the command's declared validator, or with
    /// [`default_policy`] when it declares none.
    pub fn validate_args(&self, id: CommandId, args: &[String]) -> Result<(), ArgsError> {
        match &self.node(id).args {
            Some(validator) => validator.validate(self, id, args),
            None => default_policy(self, id, args),
        }
    }
}
