use std::fmt;

use itertools::Itertools;

use super::node::{min_keys, Node};
use super::{NodeId, Tree};
use crate::entity;

/// A broken structural invariant reported by [`Tree::check`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// A handle in the tree points to a node that has been released.
    #[error("node {node:?} is reachable but vacant")]
    Vacant { node: NodeId },
    /// The root exists but holds nothing.
    #[error("root {node:?} is empty")]
    EmptyRoot { node: NodeId },
    /// A node has more keys than the order allows.
    #[error("node {node:?} has {keys} keys, more than {max}")]
    Overfull { node: NodeId, keys: usize, max: usize },
    /// A non-root node has fewer keys than half the order.
    #[error("node {node:?} has {keys} keys, fewer than {min}")]
    Underfull { node: NodeId, keys: usize, min: usize },
    /// The number of children or values does not match the number of keys.
    #[error("node {node:?} has {keys} keys but {links} children or values")]
    Arity { node: NodeId, keys: usize, links: usize },
    /// Keys in a node are not strictly ascending.
    #[error("keys in node {node:?} are not strictly ascending")]
    Unsorted { node: NodeId },
    /// A key lies outside the range assigned to its subtree by the separators above.
    #[error("node {node:?} has a key outside the range of its parent separators")]
    OutOfBounds { node: NodeId },
    /// Leaves are found at different depths.
    #[error("leaf {node:?} is at depth {depth}, but other leaves are at depth {expected}")]
    UnevenDepth { node: NodeId, depth: usize, expected: usize },
    /// The leaf chain does not visit the leaves in key order.
    #[error("leaf chain reaches {actual:?} where {expected:?} was expected")]
    LeafChain { expected: Option<NodeId>, actual: Option<NodeId> },
    /// The cached entry count is wrong.
    #[error("tree caches {cached} entries but holds {counted}")]
    Length { cached: usize, counted: usize },
}

impl<K: entity::Raw, V: Copy> Tree<K, V> {
    /// Verifies every structural invariant of the tree.
    ///
    /// This visits every node, so it is intended for tests and diagnostics.
    pub fn check(&self) -> Result<(), Violation> {
        let root = match self.root {
            Some(root) => root,
            None if self.len == 0 => return Ok(()),
            None => return Err(Violation::Length { cached: self.len, counted: 0 }),
        };

        let mut leaves = Vec::new();
        let mut leaf_depth = None;
        self.check_node(root, (None, None), 1, &mut leaf_depth, &mut leaves)?;

        let mut chain = self.leftmost_leaf();
        for &expected in &leaves {
            if chain != Some(expected) {
                return Err(Violation::LeafChain { expected: Some(expected), actual: chain });
            }
            chain = self.leaf(expected).next;
        }
        if chain.is_some() {
            return Err(Violation::LeafChain { expected: None, actual: chain });
        }

        let counted = leaves.iter().map(|&leaf| self.leaf(leaf).len()).sum();
        if counted != self.len {
            return Err(Violation::Length { cached: self.len, counted });
        }

        Ok(())
    }

    /// Checks the subtree at `id`, whose keys must lie in `lower..upper`.
    ///
    /// Leaves are appended to `leaves` in key order.
    fn check_node(
        &self,
        id: NodeId,
        (lower, upper): (Option<K>, Option<K>),
        depth: usize,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<NodeId>,
    ) -> Result<(), Violation> {
        let is_root = self.root == Some(id);
        let node = self.node(id);

        let keys = match node {
            Node::Internal(node) => &node.keys[..],
            Node::Leaf(leaf) => &leaf.keys[..],
            Node::Vacant => return Err(Violation::Vacant { node: id }),
        };

        let max = self.order - 1;
        if keys.len() > max {
            return Err(Violation::Overfull { node: id, keys: keys.len(), max });
        }
        let min = min_keys(self.order);
        if !is_root && keys.len() < min {
            return Err(Violation::Underfull { node: id, keys: keys.len(), min });
        }
        if is_root && keys.is_empty() {
            return Err(Violation::EmptyRoot { node: id });
        }
        if !keys.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(Violation::Unsorted { node: id });
        }
        let in_bounds = |key: &K| {
            lower.map_or(true, |lower| *key >= lower) && upper.map_or(true, |upper| *key < upper)
        };
        if !keys.iter().all(in_bounds) {
            return Err(Violation::OutOfBounds { node: id });
        }

        match node {
            Node::Internal(node) => {
                if node.children.len() != keys.len() + 1 {
                    return Err(Violation::Arity {
                        node:  id,
                        keys:  keys.len(),
                        links: node.children.len(),
                    });
                }

                for (index, &child) in node.children.iter().enumerate() {
                    let child_lower = match index {
                        0 => lower,
                        _ => Some(keys[index - 1]),
                    };
                    let child_upper = keys.get(index).copied().or(upper);
                    let bounds = (child_lower, child_upper);
                    self.check_node(child, bounds, depth + 1, leaf_depth, leaves)?;
                }
            }
            Node::Leaf(leaf) => {
                if leaf.values.len() != keys.len() {
                    return Err(Violation::Arity {
                        node:  id,
                        keys:  keys.len(),
                        links: leaf.values.len(),
                    });
                }

                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(Violation::UnevenDepth { node: id, depth, expected })
                    }
                    Some(_) => {}
                }
                leaves.push(id);
            }
            Node::Vacant => unreachable!("checked above"),
        }

        Ok(())
    }
}

/// Return value of [`Tree::leaves`].
///
/// Formats as the key lists of each leaf joined along the leaf chain,
/// e.g. `[1, 2] -> [3, 4]`.
/// This is meant for inspection and has no stable format.
pub struct Leaves<'t, K, V> {
    tree: &'t Tree<K, V>,
}

impl<'t, K, V> Leaves<'t, K, V> {
    pub(super) fn new(tree: &'t Tree<K, V>) -> Self { Self { tree } }
}

impl<'t, K: entity::Raw, V: Copy> fmt::Display for Leaves<'t, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current = match self.tree.leftmost_leaf() {
            Some(leaf) => Some(leaf),
            None => return write!(f, "(empty)"),
        };

        let mut first = true;
        while let Some(id) = current {
            if !first {
                write!(f, " -> ")?;
            }
            first = false;

            let leaf = self.tree.leaf(id);
            write!(f, "[{:?}]", leaf.keys.iter().format(", "))?;
            current = leaf.next;
        }

        Ok(())
    }
}
