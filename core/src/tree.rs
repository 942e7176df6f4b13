//! The command tree arena.
//!
//! [`CommandTree`] owns every [`CommandNode`] and addresses them by
//! [`CommandId`]. Parents own their child lists; children keep a plain
//! parent id. Detached nodes stay in the arena as separate roots.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::debug;

use crate::error::{Error, Result};
use crate::node::{CommandId, CommandNode, MaxLengths};
use crate::streams::Streams;

/// Arena of command nodes plus the per-tree execution settings.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{CommandNode, CommandTree};
///
/// let mut tree = CommandTree::new();
/// let root = tree.insert(CommandNode::new("app"));
/// let zeta = tree.add_command(root, CommandNode::new("zeta")).unwrap();
/// let alpha = tree.add_command(root, CommandNode::new("alpha")).unwrap();
///
/// assert_eq!(tree.children(root), [alpha, zeta]);
/// assert_eq!(tree.path(alpha), "app alpha");
/// assert_eq!(tree.root(alpha), root);
/// ```
#[derive(Debug, Default)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
    pub(crate) args: Option<Vec<String>>,
    pub(crate) streams: Streams,
    pub(crate) cancel: Option<Arc<AtomicBool>>,
    pub(crate) completion_options: crate::completion::CompletionOptions,
}

impl CommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a node into the arena as a parentless root.
    pub fn insert(&mut self, node: CommandNode) -> CommandId {
        let id = CommandId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Inserts `node` and attaches it beneath `parent`.
    pub fn add_command(&mut self, parent: CommandId, node: CommandNode) -> Result<CommandId> {
        let id = self.insert(node);
        self.add_children(parent, &[id])?;
        Ok(id)
    }

    pub fn node(&self, id: CommandId) -> &CommandNode {
        &self.nodes[id.0]
    }

    /// Mutable access to a node's declarations.
    ///
    /// Flags are changed through the tree so cached flag sets stay valid.
    pub fn node_mut(&mut self, id: CommandId) -> &mut CommandNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every id in the arena, attached or not.
    pub fn ids(&self) -> impl Iterator<Item = CommandId> + '_ {
        (0..self.nodes.len()).map(CommandId)
    }

    /// Attaches `children` beneath `parent`.
    ///
    /// A child already attached elsewhere is moved. Attaching a node
    /// beneath itself or one of its own descendants is a structural error;
    /// children processed before the offending one stay attached.
    pub fn add_children(&mut self, parent: CommandId, children: &[CommandId]) -> Result<()> {
        for &child in children {
            if self.ancestors(parent).any(|a| a == child) {
                return Err(Error::Structural(self.node(child).name().to_string()));
            }

            if let Some(old) = self.node(child).parent {
                self.detach_one(old, child);
                self.recompute_max_lengths(old);
            }

            self.node_mut(child).parent = Some(parent);
            let child_node = self.node(child);
            let use_len = child_node.use_line().len();
            let name_len = child_node.name().len();
            let path_len = self.path(child).len();
            self.node_mut(parent)
                .max_lengths
                .update(use_len, path_len, name_len);

            if let Some(normalize) = self.node(parent).flags.normalize.clone() {
                self.set_global_normalization(child, normalize);
            }
            self.invalidate_flags(child);

            let parent_node = self.node_mut(parent);
            parent_node.children.push(child);
            parent_node.sorted_children = None;
            debug!(parent = %parent, child = %child, "attached command");
        }
        Ok(())
    }

    /// Detaches `children` from `parent` by identity and recomputes the
    /// parent's max-length metrics.
    pub fn remove_children(&mut self, parent: CommandId, children: &[CommandId]) {
        for &child in children {
            if self.node(child).parent == Some(parent) {
                self.detach_one(parent, child);
            }
        }
        self.recompute_max_lengths(parent);
    }

    fn detach_one(&mut self, parent: CommandId, child: CommandId) {
        let parent_node = self.node_mut(parent);
        parent_node.children.retain(|c| *c != child);
        parent_node.sorted_children = None;
        self.node_mut(child).parent = None;
        self.invalidate_flags(child);
        debug!(parent = %parent, child = %child, "detached command");
    }

    /// Recomputes the max-length metrics of `id` from its current children.
    pub fn recompute_max_lengths(&mut self, id: CommandId) {
        let mut lengths = MaxLengths::default();
        for &child in &self.node(id).children {
            let node = self.node(child);
            lengths.update(node.use_line().len(), self.path(child).len(), node.name().len());
        }
        self.node_mut(id).max_lengths = lengths;
    }

    /// Children sorted by name; the order is cached until the next change.
    pub fn children(&mut self, id: CommandId) -> &[CommandId] {
        if self.node(id).sorted_children.is_none() {
            let mut sorted = self.node(id).children.clone();
            sorted.sort_by(|a, b| self.node(*a).name().cmp(self.node(*b).name()));
            self.node_mut(id).sorted_children = Some(sorted);
        }
        self.node(id).sorted_children.as_deref().unwrap_or_default()
    }

    /// Children in the order they were attached.
    pub fn declared_children(&self, id: CommandId) -> &[CommandId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: CommandId) -> Option<CommandId> {
        self.node(id).parent
    }

    /// `id` followed by each ancestor up to the root.
    pub fn ancestors(&self, id: CommandId) -> impl Iterator<Item = CommandId> + '_ {
        std::iter::successors(Some(id), move |current| self.node(*current).parent)
    }

    /// Calls `visit` on every ancestor of `id`, nearest first.
    pub fn visit_parents(&self, id: CommandId, mut visit: impl FnMut(&CommandNode)) {
        for ancestor in self.ancestors(id).skip(1) {
            visit(self.node(ancestor));
        }
    }

    /// `id` and all nodes beneath it, depth first.
    pub fn descendants(&self, id: CommandId) -> Vec<CommandId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.node(current).children.iter().rev().copied());
        }
        out
    }

    /// Parentless ancestor of `id`.
    pub fn root(&self, id: CommandId) -> CommandId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Names from the root down to `id`, space separated.
    pub fn path(&self, id: CommandId) -> String {
        let mut names: Vec<&str> = self.ancestors(id).map(|a| self.node(a).name()).collect();
        names.reverse();
        names.join(" ")
    }

    /// Parent path plus the use line, with `[flags]` appended when the
    /// command has visible flags.
    pub fn use_line(&mut self, id: CommandId) -> String {
        let node = self.node(id);
        let mut line = match node.parent {
            Some(parent) => format!("{} {}", self.path(parent), node.use_line()),
            None => node.use_line().to_string(),
        };
        if self.node(id).disable_flags_in_use_line {
            return line;
        }
        if self.flags(id).has_available_flags() && !line.contains("[flags]") {
            line.push_str(" [flags]");
        }
        line
    }

    /// Child of `id` whose name or alias is `token`; first declared match
    /// wins. Records the token as the child's called-as name.
    pub fn find_next(&mut self, id: CommandId, token: &str) -> Option<CommandId> {
        let found = self
            .node(id)
            .children
            .iter()
            .copied()
            .find(|c| self.node(*c).name() == token || self.node(*c).has_alias(token))?;
        self.node_mut(found).called_as = Some(token.to_string());
        Some(found)
    }

    /// Detaches all children of `id` and clears its parent link.
    pub fn reset_commands(&mut self, id: CommandId) {
        if let Some(parent) = self.node(id).parent {
            self.remove_children(parent, &[id]);
        }
        let children = self.node(id).children.clone();
        self.remove_children(id, &children);
    }

    /// Arguments used by [`execute`](Self::execute) instead of the
    /// process arguments.
    pub fn set_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
    }

    pub fn streams(&self) -> &Streams {
        &self.streams
    }

    pub fn streams_mut(&mut self) -> &mut Streams {
        &mut self.streams
    }

    /// Cancellation flag made visible to hooks through
    /// [`RunContext::is_cancelled`](crate::RunContext::is_cancelled).
    pub fn set_cancellation(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }
}
