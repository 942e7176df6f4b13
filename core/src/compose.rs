//! Flag composition across the command tree.
//!
//! Every node owns a [`FlagBundle`]: local flags, global (inherited)
//! flags, and a lazily built *full* set that also carries every ancestor's
//! global flags. The full set is the one parsed when the node runs. It is
//! dropped whenever something it was built from changes and rebuilt on the
//! next read.
//!
//! On a name collision the nearest declaration wins: the node's local
//! flags, then its own global flags, then the parent's global flags, and
//! so on up to the root.

use std::fmt;

use tracing::debug;

use crate::flag::Flag;
use crate::flagset::{EMPTY_FLAGS, FlagSet, NormalizeFn};
use crate::node::CommandId;
use crate::tree::CommandTree;

/// Per-node flag collections.
#[derive(Default)]
pub struct FlagBundle {
    pub(crate) local: FlagSet,
    pub(crate) global: FlagSet,
    /// `None` until built, and again after any invalidation.
    pub(crate) full: Option<FlagSet>,
    pub(crate) normalize: Option<NormalizeFn>,
}

impl fmt::Debug for FlagBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagBundle")
            .field("local", &self.local)
            .field("global", &self.global)
            .field("full", &self.full)
            .field("normalized", &self.normalize.is_some())
            .finish()
    }
}

impl FlagBundle {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            local: FlagSet::new(name),
            global: FlagSet::new(name),
            full: None,
            normalize: None,
        }
    }

    pub(crate) fn set_normalize(&mut self, normalize: Option<NormalizeFn>) {
        self.local.set_normalize(normalize.clone());
        self.global.set_normalize(normalize.clone());
        self.normalize = normalize;
        self.full = None;
    }
}

/// Where a flag in a node's full set was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagOrigin {
    Local,
    Global,
    /// Global flag of the given ancestor.
    Inherited(CommandId),
    /// Registered by the executor (`help`, `version`).
    Default,
}

impl CommandTree {
    /// Declares a local flag on `id`.
    pub fn add_local_flag(&mut self, id: CommandId, flag: Flag) -> bool {
        let added = self.node_mut(id).flags.local.add(flag);
        self.node_mut(id).flags.full = None;
        added
    }

    /// Declares a global flag on `id`; visible to all its descendants.
    pub fn add_global_flag(&mut self, id: CommandId, flag: Flag) -> bool {
        let added = self.node_mut(id).flags.global.add(flag);
        self.invalidate_flags(id);
        added
    }

    /// Flags declared locally on `id`.
    pub fn local_flags(&self, id: CommandId) -> &FlagSet {
        &self.node(id).flags.local
    }

    /// Global flags declared on `id` itself.
    pub fn global_flags(&self, id: CommandId) -> &FlagSet {
        &self.node(id).flags.global
    }

    /// Global flags of every ancestor, nearest first.
    pub fn inherited_flags(&self, id: CommandId) -> FlagSet {
        let node = self.node(id);
        let mut inherited = FlagSet::new(node.name());
        inherited.set_normalize(node.flags.normalize.clone());
        for ancestor in self.ancestors(id).skip(1) {
            inherited.add_set(&self.node(ancestor).flags.global);
        }
        inherited
    }

    /// The full flag set of `id`, building it if needed.
    pub fn flags(&mut self, id: CommandId) -> &FlagSet {
        self.flags_mut(id)
    }

    /// Mutable full flag set of `id`, building it if needed.
    pub fn flags_mut(&mut self, id: CommandId) -> &mut FlagSet {
        if self.node(id).flags.full.is_none() {
            let full = self.compose_full(id);
            self.node_mut(id).flags.full = Some(full);
        }
        self.node_mut(id)
            .flags
            .full
            .get_or_insert_with(FlagSet::default)
    }

    /// Full flag set as last built; empty if it has not been built.
    pub fn cached_flags(&self, id: CommandId) -> &FlagSet {
        self.node(id).flags.full.as_ref().unwrap_or(&EMPTY_FLAGS)
    }

    /// Whether the full set of `id` is currently cached.
    pub fn is_flags_cached(&self, id: CommandId) -> bool {
        self.node(id).flags.full.is_some()
    }

    /// Which declaration a flag in the full set of `id` comes from.
    pub fn flag_origin(&self, id: CommandId, name: &str) -> Option<FlagOrigin> {
        let node = self.node(id);
        if node.flags.local.lookup(name).is_some() {
            return Some(FlagOrigin::Local);
        }
        if node.flags.global.lookup(name).is_some() {
            return Some(FlagOrigin::Global);
        }
        if let Some(ancestor) = self
            .ancestors(id)
            .skip(1)
            .find(|a| self.node(*a).flags.global.lookup(name).is_some())
        {
            return Some(FlagOrigin::Inherited(ancestor));
        }
        self.cached_flags(id)
            .lookup(name)
            .map(|_| FlagOrigin::Default)
    }

    /// Marks a flag declared on `id` (locally or globally) as required.
    pub fn mark_flag_required(&mut self, id: CommandId, name: &str) -> crate::Result<()> {
        let bundle = &mut self.node_mut(id).flags;
        let global = match bundle.local.mark_required(name) {
            Ok(()) => false,
            Err(_) => {
                bundle.global.mark_required(name)?;
                true
            }
        };
        if global {
            self.invalidate_flags(id);
        } else {
            self.node_mut(id).flags.full = None;
        }
        Ok(())
    }

    /// Sets the normalization function on `id` and every descendant.
    pub fn set_global_normalization(&mut self, id: CommandId, normalize: NormalizeFn) {
        for node in self.descendants(id) {
            self.node_mut(node)
                .flags
                .set_normalize(Some(normalize.clone()));
        }
    }

    /// Normalization function in effect on `id`.
    pub fn global_normalization(&self, id: CommandId) -> Option<&NormalizeFn> {
        self.node(id).flags.normalize.as_ref()
    }

    /// Drops the cached full sets of `id` and all its descendants.
    pub(crate) fn invalidate_flags(&mut self, id: CommandId) {
        for node in self.descendants(id) {
            self.node_mut(node).flags.full = None;
        }
    }

    fn compose_full(&self, id: CommandId) -> FlagSet {
        let node = self.node(id);
        let mut full = FlagSet::new(node.name());
        full.set_normalize(node.flags.normalize.clone());
        full.add_set(&node.flags.local);
        full.add_set(&node.flags.global);
        for ancestor in self.ancestors(id).skip(1) {
            full.add_set(&self.node(ancestor).flags.global);
        }
        debug!(command = %self.path(id), flags = full.len(), "composed full flag set");
        full
    }
}
