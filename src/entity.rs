//! Entity identifiers as seen by a component store.
//!
//! Allocation of identifiers is the job of the world layer.
//! A store only needs them to be totally ordered.

use std::fmt;
use std::num::{NonZeroU32, NonZeroU64};

/// A raw entity ID.
///
/// Types implementing this trait are only used as ordered keys in storage internals.
/// [`Eq`] and [`Ord`] must be consistent and total,
/// otherwise lookups may return the component of another entity.
pub trait Raw: Sized + Send + Sync + Copy + fmt::Debug + Eq + Ord + 'static {}

macro_rules! impl_raw {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Raw for $ty {}
        )*
    }
}

impl_raw!(NonZeroU32, NonZeroU64, u32, u64, usize);
