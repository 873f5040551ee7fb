use std::mem;

use super::node::{min_keys, Node};
use super::{NodeId, Step, Tree};
use crate::entity;

impl<K: entity::Raw, V: Copy> Tree<K, V> {
    /// Removes the entry for `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let root = self.root?;

        let mut path = Vec::new();
        let leaf_id = self.descend(root, key, &mut path);

        let leaf = self.leaf_mut(leaf_id);
        let index = leaf.search(key).ok()?;
        leaf.keys.remove(index);
        let value = leaf.values.remove(index);
        let remaining = leaf.len();
        self.len -= 1;

        if path.is_empty() {
            if remaining == 0 {
                self.release(leaf_id);
                self.root = None;
                log::trace!("Removed the last entry, tree is empty");
            }
        } else if remaining < min_keys(self.order) {
            self.rebalance(leaf_id, path);
        }

        self.debug_check();
        Some(value)
    }

    /// Restores the fill of an underfull non-root node.
    ///
    /// `path` is the descent that reached `node`.
    fn rebalance(&mut self, node: NodeId, mut path: Vec<Step>) {
        let (parent_id, index) = path.pop().expect("the root cannot underflow");
        let min = min_keys(self.order);

        let parent = self.internal(parent_id);
        let left = index.checked_sub(1).map(|sibling| parent.children[sibling]);
        let right = parent.children.get(index + 1).copied();

        if let Some(left) = left {
            if self.key_count(left) > min {
                self.borrow_from_left(parent_id, index, left, node);
                return;
            }
        }
        if let Some(right) = right {
            if self.key_count(right) > min {
                self.borrow_from_right(parent_id, index, node, right);
                return;
            }
        }

        match (left, right) {
            (Some(left), _) => self.merge(parent_id, index - 1, left, node),
            (None, Some(right)) => self.merge(parent_id, index, node, right),
            (None, None) => panic!("Internal node {parent_id:?} has a single child"),
        }

        let parent = self.internal(parent_id);
        if path.is_empty() {
            if parent.keys.is_empty() {
                let child = parent.children[0];
                self.release(parent_id);
                self.root = Some(child);
                log::trace!("Collapsed root {parent_id:?} into {child:?}");
            }
        } else if parent.keys.len() < min {
            self.rebalance(parent_id, path);
        }
    }

    fn key_count(&self, id: NodeId) -> usize {
        match self.node(id) {
            Node::Internal(node) => node.keys.len(),
            Node::Leaf(leaf) => leaf.len(),
            Node::Vacant => panic!("Dangling node {id:?}"),
        }
    }

    /// Moves the last entry of `left` to the front of `node`,
    /// where `node` is `children[index]` of `parent`.
    fn borrow_from_left(&mut self, parent: NodeId, index: usize, left: NodeId, node: NodeId) {
        match self.node_mut(left) {
            Node::Leaf(sibling) => {
                let key = sibling.keys.pop().expect("sibling has spare entries");
                let value = sibling.values.pop().expect("sibling has spare entries");

                let leaf = self.leaf_mut(node);
                leaf.keys.insert(0, key);
                leaf.values.insert(0, value);

                self.internal_mut(parent).keys[index - 1] = key;
            }
            Node::Internal(sibling) => {
                let key = sibling.keys.pop().expect("sibling has spare keys");
                let child = sibling.children.pop().expect("sibling has spare children");

                let separator = mem::replace(&mut self.internal_mut(parent).keys[index - 1], key);

                let internal = self.internal_mut(node);
                internal.keys.insert(0, separator);
                internal.children.insert(0, child);
            }
            Node::Vacant => panic!("Dangling node {left:?}"),
        }

        log::trace!("Node {node:?} borrowed from left sibling {left:?}");
    }

    /// Moves the first entry of `right` to the back of `node`,
    /// where `node` is `children[index]` of `parent`.
    fn borrow_from_right(&mut self, parent: NodeId, index: usize, node: NodeId, right: NodeId) {
        match self.node_mut(right) {
            Node::Leaf(sibling) => {
                let key = sibling.keys.remove(0);
                let value = sibling.values.remove(0);
                let new_first = sibling.keys[0];

                let leaf = self.leaf_mut(node);
                leaf.keys.push(key);
                leaf.values.push(value);

                self.internal_mut(parent).keys[index] = new_first;
            }
            Node::Internal(sibling) => {
                let key = sibling.keys.remove(0);
                let child = sibling.children.remove(0);

                let separator = mem::replace(&mut self.internal_mut(parent).keys[index], key);

                let internal = self.internal_mut(node);
                internal.keys.push(separator);
                internal.children.push(child);
            }
            Node::Vacant => panic!("Dangling node {right:?}"),
        }

        log::trace!("Node {node:?} borrowed from right sibling {right:?}");
    }

    /// Merges `right` into `left`,
    /// where they are `children[index]` and `children[index + 1]` of `parent`.
    fn merge(&mut self, parent: NodeId, index: usize, left: NodeId, right: NodeId) {
        let parent_node = self.internal_mut(parent);
        let removed = parent_node.children.remove(index + 1);
        debug_assert_eq!(removed, right, "merged nodes must be adjacent siblings");
        let separator = parent_node.keys.remove(index);

        match self.release(right) {
            Node::Leaf(sibling) => {
                let leaf = self.leaf_mut(left);
                leaf.keys.extend(sibling.keys);
                leaf.values.extend(sibling.values);
                leaf.next = sibling.next;
            }
            Node::Internal(sibling) => {
                let internal = self.internal_mut(left);
                internal.keys.push(separator);
                internal.keys.extend(sibling.keys);
                internal.children.extend(sibling.children);
            }
            Node::Vacant => panic!("Dangling node {right:?}"),
        }

        log::trace!("Merged node {right:?} into {left:?}");
    }
}
