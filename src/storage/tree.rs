//! A B+ tree index over entity IDs.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`].
//! Leaves are chained in ascending key order,
//! so ordered scans walk the chain without descending again.

use std::iter::FusedIterator;
use std::mem;
use std::ops::{Bound, RangeBounds};

use crate::config::MIN_ORDER;
use crate::entity;

mod node;
pub use node::NodeId;
use node::{cut, min_keys, Internal, Leaf, Node};

mod check;
pub use check::{Leaves, Violation};

mod remove;

#[cfg(test)]
mod tests;

/// A step of a descent: an internal node and the index of the child taken.
type Step = (NodeId, usize);

/// A B+ tree mapping keys to small copyable values.
pub struct Tree<K, V> {
    order:  usize,
    nodes:  Vec<Node<K, V>>,
    /// Arena positions freed by merges, reused by later splits.
    vacant: Vec<NodeId>,
    root:   Option<NodeId>,
    len:    usize,
}

impl<K: entity::Raw, V: Copy> Tree<K, V> {
    /// Creates an empty tree where each internal node has at most `order` children.
    ///
    /// # Panics
    /// Panics if `order` is less than [`MIN_ORDER`].
    pub fn new(order: usize) -> Self {
        assert!(order >= MIN_ORDER, "Tree order {order} is smaller than {MIN_ORDER}");
        Self { order, nodes: Vec::new(), vacant: Vec::new(), root: None, len: 0 }
    }

    /// The maximum number of children of an internal node.
    pub fn order(&self) -> usize { self.order }

    /// The number of entries in the tree.
    pub fn len(&self) -> usize { self.len }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// The number of levels in the tree, counting the leaves.
    ///
    /// An empty tree has height 0.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Some(id) = current {
            height += 1;
            current = match self.node(id) {
                Node::Internal(node) => Some(node.children[0]),
                Node::Leaf(_) => None,
                Node::Vacant => panic!("Dangling node {id:?}"),
            };
        }
        height
    }

    /// The leaf holding the smallest keys, found by descending from the root.
    pub fn leftmost_leaf(&self) -> Option<NodeId> {
        let mut current = self.root?;
        loop {
            match self.node(current) {
                Node::Internal(node) => current = node.children[0],
                Node::Leaf(_) => return Some(current),
                Node::Vacant => panic!("Dangling node {current:?}"),
            }
        }
    }

    fn rightmost_leaf(&self) -> Option<NodeId> {
        let mut current = self.root?;
        loop {
            match self.node(current) {
                Node::Internal(node) => {
                    current = *node.children.last().expect("internal nodes have children")
                }
                Node::Leaf(_) => return Some(current),
                Node::Vacant => panic!("Dangling node {current:?}"),
            }
        }
    }

    /// The smallest key in the tree.
    pub fn first_key(&self) -> Option<K> {
        self.leftmost_leaf().and_then(|leaf| self.leaf(leaf).keys.first().copied())
    }

    /// The largest key in the tree.
    pub fn last_key(&self) -> Option<K> {
        self.rightmost_leaf().and_then(|leaf| self.leaf(leaf).keys.last().copied())
    }

    /// Returns `true` if the tree has an entry for `key`.
    pub fn contains_key(&self, key: &K) -> bool { self.get(key).is_some() }

    /// Gets the value for `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        let leaf = self.leaf(self.find_leaf(key)?);
        let index = leaf.search(key).ok()?;
        Some(leaf.values[index])
    }

    /// Gets the value for `key` mutably.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let leaf_id = self.find_leaf(key)?;
        let leaf = self.leaf_mut(leaf_id);
        let index = leaf.search(key).ok()?;
        Some(&mut leaf.values[index])
    }

    /// Inserts an entry, or overwrites the value if `key` is already present.
    ///
    /// Returns the overwritten value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let root = match self.root {
            Some(root) => root,
            None => {
                let mut leaf = Leaf::with_capacity(self.order);
                leaf.keys.push(key);
                leaf.values.push(value);
                self.root = Some(self.alloc(Node::Leaf(leaf)));
                self.len = 1;
                return None;
            }
        };

        let mut path = Vec::new();
        let leaf_id = self.descend(root, &key, &mut path);

        let max = self.order - 1;
        let leaf = self.leaf_mut(leaf_id);
        let index = match leaf.search(&key) {
            Ok(index) => return Some(mem::replace(&mut leaf.values[index], value)),
            Err(index) => index,
        };

        if leaf.len() < max {
            leaf.keys.insert(index, key);
            leaf.values.insert(index, value);
        } else {
            self.split_leaf(leaf_id, index, key, value, path);
        }
        self.len += 1;

        self.debug_check();
        None
    }

    /// Inserts an entry into a full leaf at `index` and splits it in two.
    fn split_leaf(&mut self, leaf_id: NodeId, index: usize, key: K, value: V, path: Vec<Step>) {
        let split = cut(self.order);

        let leaf = self.leaf_mut(leaf_id);
        leaf.keys.insert(index, key);
        leaf.values.insert(index, value);

        let right = Leaf {
            keys:   leaf.keys.split_off(split),
            values: leaf.values.split_off(split),
            next:   leaf.next,
        };
        let separator = right.keys[0];
        let right_id = self.alloc(Node::Leaf(right));
        self.leaf_mut(leaf_id).next = Some(right_id);

        log::trace!("Split leaf {leaf_id:?} at {separator:?} into {right_id:?}");

        self.insert_into_parent(path, leaf_id, separator, right_id);
    }

    /// Registers `right` as the sibling after `left`, separated by `separator`.
    ///
    /// `path` is the descent that reached `left`.
    fn insert_into_parent(
        &mut self,
        mut path: Vec<Step>,
        left: NodeId,
        separator: K,
        right: NodeId,
    ) {
        let (parent_id, child_index) = match path.pop() {
            Some(step) => step,
            None => {
                let root = Internal { keys: vec![separator], children: vec![left, right] };
                let root = self.alloc(Node::Internal(root));
                self.root = Some(root);
                log::trace!("New root {root:?} over {left:?} and {right:?}");
                return;
            }
        };

        let order = self.order;
        let parent = self.internal_mut(parent_id);
        parent.keys.insert(child_index, separator);
        parent.children.insert(child_index + 1, right);

        if parent.children.len() <= order {
            return;
        }

        // `order + 1` children: the left half keeps `cut(order)` of them,
        // and the key between the halves moves up.
        let split = cut(order);
        let right_children = parent.children.split_off(split);
        let mut right_keys = parent.keys.split_off(split - 1);
        let promoted = right_keys.remove(0);

        let right_id =
            self.alloc(Node::Internal(Internal { keys: right_keys, children: right_children }));
        log::trace!("Split internal node {parent_id:?} at {promoted:?} into {right_id:?}");

        self.insert_into_parent(path, parent_id, promoted, right_id);
    }

    /// Returns the leaf where `key` is or would be stored.
    fn find_leaf(&self, key: &K) -> Option<NodeId> {
        let mut current = self.root?;
        loop {
            match self.node(current) {
                Node::Internal(node) => current = node.children[node.route(key)],
                Node::Leaf(_) => return Some(current),
                Node::Vacant => panic!("Dangling node {current:?}"),
            }
        }
    }

    /// Same as [`find_leaf`](Self::find_leaf), but records the internal nodes visited.
    fn descend(&self, root: NodeId, key: &K, path: &mut Vec<Step>) -> NodeId {
        let mut current = root;
        loop {
            match self.node(current) {
                Node::Internal(node) => {
                    let index = node.route(key);
                    path.push((current, index));
                    current = node.children[index];
                }
                Node::Leaf(_) => return current,
                Node::Vacant => panic!("Dangling node {current:?}"),
            }
        }
    }

    /// Iterates over all entries in ascending key order.
    pub fn iter(&self) -> Range<'_, K, V> {
        Range { tree: self, leaf: self.leftmost_leaf(), index: 0, end: Bound::Unbounded }
    }

    /// Iterates over the entries with keys in `range`, in ascending key order.
    pub fn range(&self, range: impl RangeBounds<K>) -> Range<'_, K, V> {
        let (leaf, index) = match range.start_bound() {
            Bound::Unbounded => (self.leftmost_leaf(), 0),
            Bound::Included(start) => match self.find_leaf(start) {
                Some(leaf) => (Some(leaf), self.leaf(leaf).keys.partition_point(|k| k < start)),
                None => (None, 0),
            },
            Bound::Excluded(start) => match self.find_leaf(start) {
                Some(leaf) => (Some(leaf), self.leaf(leaf).keys.partition_point(|k| k <= start)),
                None => (None, 0),
            },
        };

        Range { tree: self, leaf, index, end: range.end_bound().cloned() }
    }

    /// Formats the keys of each leaf along the leaf chain.
    pub fn leaves(&self) -> Leaves<'_, K, V> { Leaves::new(self) }

    fn debug_check(&self) {
        if cfg!(feature = "check-invariants") {
            if let Err(err) = self.check() {
                panic!("B+ tree invariant violated: {err}; leaves: {}", self.leaves());
            }
        }
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        match self.vacant.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                let id = NodeId::new(self.nodes.len());
                self.nodes.push(node);
                id
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node<K, V> {
        let node = mem::replace(self.node_mut(id), Node::Vacant);
        self.vacant.push(id);
        node
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        self.nodes.get(id.index()).expect("node id out of bounds")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        self.nodes.get_mut(id.index()).expect("node id out of bounds")
    }

    fn leaf(&self, id: NodeId) -> &Leaf<K, V> {
        match self.node(id) {
            Node::Leaf(leaf) => leaf,
            _ => panic!("Node {id:?} is not a leaf"),
        }
    }

    fn leaf_mut(&mut self, id: NodeId) -> &mut Leaf<K, V> {
        match self.node_mut(id) {
            Node::Leaf(leaf) => leaf,
            _ => panic!("Node {id:?} is not a leaf"),
        }
    }

    fn internal(&self, id: NodeId) -> &Internal<K> {
        match self.node(id) {
            Node::Internal(node) => node,
            _ => panic!("Node {id:?} is not an internal node"),
        }
    }

    fn internal_mut(&mut self, id: NodeId) -> &mut Internal<K> {
        match self.node_mut(id) {
            Node::Internal(node) => node,
            _ => panic!("Node {id:?} is not an internal node"),
        }
    }
}

/// Return value of [`Tree::iter`] and [`Tree::range`].
pub struct Range<'t, K, V> {
    tree:  &'t Tree<K, V>,
    /// The leaf containing the next entry, or `None` when exhausted.
    leaf:  Option<NodeId>,
    index: usize,
    end:   Bound<K>,
}

impl<'t, K: entity::Raw, V: Copy> Iterator for Range<'t, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let leaf = tree.leaf(self.leaf?);

            if self.index >= leaf.len() {
                self.leaf = leaf.next;
                self.index = 0;
                continue;
            }

            let key = leaf.keys[self.index];
            let in_range = match self.end {
                Bound::Included(end) => key <= end,
                Bound::Excluded(end) => key < end,
                Bound::Unbounded => true,
            };
            if !in_range {
                self.leaf = None;
                return None;
            }

            let value = leaf.values[self.index];
            self.index += 1;
            return Some((key, value));
        }
    }
}

impl<'t, K: entity::Raw, V: Copy> FusedIterator for Range<'t, K, V> {}
