/// A handle to a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(super) fn new(index: usize) -> Self {
        Self(index.try_into().expect("Too many tree nodes"))
    }

    pub(super) fn index(self) -> usize { self.0.try_into().expect("usize >= u32") }
}

pub(super) enum Node<K, V> {
    Internal(Internal<K>),
    Leaf(Leaf<K, V>),
    /// A node that has been merged away and awaits reuse.
    Vacant,
}

/// An internal node.
///
/// `children.len() == keys.len() + 1`.
/// All keys under `children[i]` are less than `keys[i]`
/// and not less than `keys[i - 1]`.
pub(super) struct Internal<K> {
    pub(super) keys:     Vec<K>,
    pub(super) children: Vec<NodeId>,
}

impl<K: Ord> Internal<K> {
    /// The child to descend into for `key`.
    ///
    /// Equal keys go right.
    pub(super) fn route(&self, key: &K) -> usize { self.keys.partition_point(|k| k <= key) }
}

/// A leaf node.
///
/// `keys` and `values` are parallel and sorted by key.
pub(super) struct Leaf<K, V> {
    pub(super) keys:   Vec<K>,
    pub(super) values: Vec<V>,
    /// The leaf holding the next higher keys.
    pub(super) next:   Option<NodeId>,
}

impl<K: Ord, V> Leaf<K, V> {
    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            keys:   Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            next:   None,
        }
    }

    pub(super) fn len(&self) -> usize { self.keys.len() }

    pub(super) fn search(&self, key: &K) -> Result<usize, usize> { self.keys.binary_search(key) }
}

/// The number of entries kept on the left side when splitting `n` entries.
///
/// Odd counts keep the extra entry on the left.
pub(super) fn cut(n: usize) -> usize {
    if n % 2 == 0 {
        n / 2
    } else {
        n / 2 + 1
    }
}

/// The minimum number of keys in a non-root node of the given order.
pub(super) fn min_keys(order: usize) -> usize { (order + 1) / 2 - 1 }
