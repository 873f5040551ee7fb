//! A storage is the data structure where components of the same type for all entities are stored.
//!
//! [`Store`] keeps the components in a [`Packed`] array
//! and maps entity IDs to their [`Slot`]s with a B+ [`Tree`].

use std::{any, mem};

use crate::entity;

mod packed;
pub use packed::{Packed, Slot};

pub mod tree;
pub use tree::Tree;

mod store;
pub use store::{Iter, IterMut, Store};


/// A storage for storing component data.
///
/// This is the interface consumed by the layers that own stores,
/// such as the entity world and system schedulers.
pub trait Storage: Default + Send + Sync + 'static {
    /// The type of entity ID used for identification.
    type RawEntity: entity::Raw;
    /// The component type stored.
    type Comp;

    /// Gets a shared reference to the component for a specific entity if it is present.
    fn get(&self, id: Self::RawEntity) -> Option<&Self::Comp>;

    /// Gets a mutable reference to the component for a specific entity if it is present.
    fn get_mut(&mut self, id: Self::RawEntity) -> Option<&mut Self::Comp>;

    /// Sets or removes the component for a specific entity,
    /// returning the original value if it was present.
    fn set(&mut self, id: Self::RawEntity, value: Option<Self::Comp>) -> Option<Self::Comp>;

    /// Returns the number of components that exist in this storage.
    fn cardinality(&self) -> usize;

    /// Return value of [`iter`](Self::iter).
    type Iter<'t>: Iterator<Item = (Self::RawEntity, &'t Self::Comp)> + 't
    where
        Self: 't;
    /// Returns an immutable iterator over the storage, ordered by entity ID.
    fn iter(&self) -> Self::Iter<'_>;

    /// Return value of [`iter_mut`](Self::iter_mut).
    type IterMut<'t>: Iterator<Item = (Self::RawEntity, &'t mut Self::Comp)> + 't
    where
        Self: 't;
    /// Returns a mutable iterator over the storage, ordered by entity ID.
    fn iter_mut(&mut self) -> Self::IterMut<'_>;
}

/// The identity of a component type as seen by layers that only know stores by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Meta {
    /// The type name of the component.
    pub name: &'static str,
    /// The size of one component in bytes.
    pub size: usize,
}

impl Meta {
    /// Returns the identity of `C`.
    pub fn of<C: 'static>() -> Self {
        Self { name: any::type_name::<C>(), size: mem::size_of::<C>() }
    }
}
