//! Construction parameters of a component store.

/// The smallest supported tree order.
///
/// With fewer than three children per node a split cannot leave both halves non-empty.
pub const MIN_ORDER: usize = 3;

/// The tree order used by [`Config::default`].
pub const DEFAULT_ORDER: usize = 16;

/// The initial packed array capacity used by [`Config::default`].
pub const DEFAULT_CAPACITY: usize = 16;

/// The factor by which the packed array capacity grows when it is full.
pub const GROWTH_FACTOR: usize = 2;

/// Parameters for creating a [`Store`](crate::storage::Store).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// The maximum number of children of an internal node.
    ///
    /// Leaves hold at most `order - 1` entries,
    /// internal nodes hold at most `order - 1` separator keys.
    pub order:            usize,
    /// The number of component slots reserved upfront.
    pub initial_capacity: usize,
}

impl Default for Config {
    fn default() -> Self { Self { order: DEFAULT_ORDER, initial_capacity: DEFAULT_CAPACITY } }
}

impl Config {
    /// Replaces the tree order.
    pub fn with_order(self, order: usize) -> Self { Self { order, ..self } }

    /// Replaces the initial capacity of the packed array.
    pub fn with_initial_capacity(self, initial_capacity: usize) -> Self {
        Self { initial_capacity, ..self }
    }

    /// Checks that the parameters describe a usable store.
    pub fn validate(&self) -> Result<(), Error> {
        if self.order < MIN_ORDER {
            return Err(Error::OrderTooSmall { order: self.order });
        }

        if self.initial_capacity.checked_mul(GROWTH_FACTOR).is_none() {
            return Err(Error::CapacityOverflow { capacity: self.initial_capacity });
        }

        Ok(())
    }
}

/// Errors from [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The tree order cannot hold a split.
    #[error("tree order {order} is smaller than the minimum order {MIN_ORDER}")]
    OrderTooSmall {
        /// The rejected order.
        order: usize,
    },
    /// The initial capacity cannot grow even once.
    #[error("initial capacity {capacity} overflows when grown")]
    CapacityOverflow {
        /// The rejected capacity.
        capacity: usize,
    },
}
