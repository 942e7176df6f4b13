//! "Did you mean" suggestions for unknown subcommands.

use crate::error::{Error, Result};
use crate::node::CommandId;
use crate::tree::CommandTree;

/// Threshold used when a command does not configure one.
pub const DEFAULT_SUGGESTION_DISTANCE: usize = 2;

/// Levenshtein distance between `a` and `b`, optionally ignoring case.
///
/// # Examples
///
/// ```
/// use cmdtree_core::levenshtein;
///
/// assert_eq!(levenshtein("kitten", "sitting", false), 3);
/// assert_eq!(levenshtein("Stat", "stats", true), 1);
/// ```
pub fn levenshtein(a: &str, b: &str, ignore_case: bool) -> usize {
    let (a, b) = if ignore_case {
        (a.to_lowercase(), b.to_lowercase())
    } else {
        (a.to_string(), b.to_string())
    };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// A command considered for suggestion.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub aliases: &'a [String],
    pub suggest_for: &'a [String],
}

/// Ranks `candidates` against an unmatched `token`.
///
/// A candidate qualifies when its name or an alias is closer than
/// `min_distance`, when its name starts with the token, or when it lists
/// the token in its suggest-for names (all case-insensitive). Results are
/// ordered by distance, then prefix matches first, then input order.
///
/// # Errors
///
/// [`Error::InvalidConfig`] when `min_distance` is zero.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{rank_suggestions, Candidate};
///
/// let names = ["start", "stats", "stop"];
/// let candidates = names.iter().map(|name| Candidate {
///     name,
///     aliases: &[],
///     suggest_for: &[],
/// });
/// assert_eq!(rank_suggestions("stat", candidates, 2).unwrap(), ["stats", "start"]);
/// ```
pub fn rank_suggestions<'a>(
    token: &str,
    candidates: impl IntoIterator<Item = Candidate<'a>>,
    min_distance: usize,
) -> Result<Vec<String>> {
    if min_distance == 0 {
        return Err(Error::InvalidConfig(
            "suggestion minimum distance must be positive".to_string(),
        ));
    }
    let lowered = token.to_lowercase();

    let mut ranked: Vec<(usize, bool, usize, &str)> = Vec::new();
    for (order, candidate) in candidates.into_iter().enumerate() {
        let distance = std::iter::once(candidate.name)
            .chain(candidate.aliases.iter().map(String::as_str))
            .map(|spelling| levenshtein(token, spelling, true))
            .min()
            .unwrap_or(usize::MAX);
        let prefix = candidate.name.to_lowercase().starts_with(&lowered);
        let listed = candidate
            .suggest_for
            .iter()
            .any(|s| s.eq_ignore_ascii_case(token));

        if distance < min_distance || prefix || listed {
            ranked.push((distance, !prefix, order, candidate.name));
        }
    }

    ranked.sort();
    let mut out: Vec<String> = Vec::with_capacity(ranked.len());
    for (_, _, _, name) in ranked {
        if !out.iter().any(|existing| existing == name) {
            out.push(name.to_string());
        }
    }
    Ok(out)
}

impl CommandTree {
    /// Suggestions for `token` among the visible children of `id`, using
    /// the command's configured threshold.
    pub fn suggestions_for(&self, id: CommandId, token: &str) -> Result<Vec<String>> {
        let min_distance = self
            .node(id)
            .suggestions_min_distance
            .unwrap_or(DEFAULT_SUGGESTION_DISTANCE);
        let candidates = self
            .declared_children(id)
            .iter()
            .map(|child| self.node(*child))
            .filter(|node| node.is_available())
            .map(|node| Candidate {
                name: node.name(),
                aliases: node.aliases(),
                suggest_for: node.suggest_for_tokens(),
            });
        rank_suggestions(token, candidates, min_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CommandNode;

    fn tree_with(children: Vec<CommandNode>) -> (CommandTree, CommandId) {
        let mut tree = CommandTree::new();
        let root = tree.insert(CommandNode::new("app"));
        for child in children {
            tree.add_command(root, child).unwrap();
        }
        (tree, root)
    }

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("", "abc", false), 3);
        assert_eq!(levenshtein("abc", "", false), 3);
        assert_eq!(levenshtein("stat", "stop", false), 2);
        assert_eq!(levenshtein("STAT", "stat", false), 4);
        assert_eq!(levenshtein("STAT", "stat", true), 0);
    }

    #[test]
    fn test_ordering_by_distance_then_prefix_then_declaration() {
        let (tree, root) = tree_with(vec![
            CommandNode::new("start"),
            CommandNode::new("stats"),
            CommandNode::new("stop"),
        ]);
        assert_eq!(tree.suggestions_for(root, "stat").unwrap(), ["stats", "start"]);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let (mut tree, root) = tree_with(vec![CommandNode::new("start")]);
        tree.node_mut(root).suggestions_min_distance = Some(0);
        assert!(matches!(
            tree.suggestions_for(root, "stat"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_hidden_and_deprecated_children_skipped() {
        let (tree, root) = tree_with(vec![
            CommandNode::new("secret").hidden(),
            CommandNode::new("sacred").deprecated("gone"),
            CommandNode::new("second"),
        ]);
        assert_eq!(tree.suggestions_for(root, "sec").unwrap(), ["second"]);
    }

    #[test]
    fn test_aliases_and_suggest_for() {
        let (tree, root) = tree_with(vec![
            CommandNode::new("remove").alias("rm"),
            CommandNode::new("delete").suggest_for("erase"),
        ]);
        assert_eq!(tree.suggestions_for(root, "rn").unwrap(), ["remove"]);
        assert_eq!(tree.suggestions_for(root, "ERASE").unwrap(), ["delete"]);
    }

    #[test]
    fn test_larger_threshold_widens_results() {
        let (mut tree, root) = tree_with(vec![
            CommandNode::new("start"),
            CommandNode::new("stats"),
            CommandNode::new("stop"),
        ]);
        tree.node_mut(root).suggestions_min_distance = Some(3);
        assert_eq!(
            tree.suggestions_for(root, "stat").unwrap(),
            ["stats", "start", "stop"]
        );
    }
}
