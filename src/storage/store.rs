use std::any;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ops::RangeBounds;

use super::tree::{self, Leaves, Tree};
use super::{Meta, Packed, Slot, Storage};
use crate::{config, entity};

/// Storage for one component type,
/// with components packed in an array and indexed by a B+ tree.
///
/// References into the store borrow it,
/// so they cannot be held across [`upsert`](Self::upsert) or [`remove`](Self::remove),
/// which may move components to a new buffer.
/// Code that needs to remember where a component is should keep the entity ID
/// (or the [`Slot`]) and look it up again.
pub struct Store<K: entity::Raw, C> {
    packed: Packed<C>,
    index:  Tree<K, Slot>,
}

static_assertions::assert_impl_all!(Store<std::num::NonZeroU32, [u8; 16]>: Send, Sync);

impl<K: entity::Raw, C: 'static> Default for Store<K, C> {
    fn default() -> Self {
        match Self::new(config::Config::default()) {
            Ok(store) => store,
            Err(err) => panic!("Default config is invalid: {err}"),
        }
    }
}

impl<K: entity::Raw, C: 'static> Store<K, C> {
    /// Creates an empty store.
    pub fn new(config: config::Config) -> Result<Self, config::Error> {
        config.validate()?;

        log::debug!("Create store for `{}` with {config:?}", any::type_name::<C>());

        Ok(Self {
            packed: Packed::with_capacity(config.initial_capacity),
            index:  Tree::new(config.order),
        })
    }

    /// The identity of the stored component type.
    pub fn meta(&self) -> Meta { Meta::of::<C>() }
}

impl<K: entity::Raw, C> Store<K, C> {
    fn resolve(&self, slot: Slot) -> &C {
        match self.packed.get(slot) {
            Some(value) => value,
            None => panic!("Index refers to free slot {slot:?}"),
        }
    }

    /// Sets the component for an entity, returning the previous component if any.
    ///
    /// An existing component is overwritten in its slot.
    /// Otherwise, the component is stored in a free or new slot and the entity is indexed.
    pub fn upsert(&mut self, key: K, value: C) -> Option<C> {
        match self.index.get(&key) {
            Some(slot) => Some(self.packed.replace(slot, value)),
            None => {
                let slot = self.packed.allocate(value);
                self.index.insert(key, slot);
                None
            }
        }
    }

    /// Removes the component of an entity, returning it if it was present.
    ///
    /// The slot is reused by a later insertion.
    pub fn remove(&mut self, key: K) -> Option<C> {
        let slot = self.index.remove(&key)?;
        match self.packed.free(slot) {
            Some(value) => Some(value),
            None => panic!("Index refers to free slot {slot:?}"),
        }
    }

    /// Gets the component of an entity.
    pub fn get(&self, key: K) -> Option<&C> {
        let slot = self.index.get(&key)?;
        Some(self.resolve(slot))
    }

    /// Gets the component of an entity mutably.
    pub fn get_mut(&mut self, key: K) -> Option<&mut C> {
        let slot = self.index.get(&key)?;
        match self.packed.get_mut(slot) {
            Some(value) => Some(value),
            None => panic!("Index refers to free slot {slot:?}"),
        }
    }

    /// Returns `true` if the entity has a component in this store.
    pub fn contains_key(&self, key: K) -> bool { self.index.contains_key(&key) }

    /// Returns the slot holding the component of an entity.
    pub fn slot_of(&self, key: K) -> Option<Slot> { self.index.get(&key) }

    /// The number of entities with a component in this store.
    pub fn len(&self) -> usize { self.index.len() }

    /// Returns `true` if no entity has a component in this store.
    pub fn is_empty(&self) -> bool { self.index.is_empty() }

    /// Iterates over all components in ascending entity order.
    pub fn iter(&self) -> Iter<'_, K, C> {
        Iter { entries: self.index.iter(), packed: &self.packed }
    }

    /// Iterates over the components of entities in `range`, in ascending entity order.
    pub fn range(&self, range: impl RangeBounds<K>) -> Iter<'_, K, C> {
        Iter { entries: self.index.range(range), packed: &self.packed }
    }

    /// Iterates over all components mutably in ascending entity order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, C> {
        IterMut {
            entries: self.index.iter(),
            base:    self.packed.base_ptr_mut(),
            _ph:     PhantomData,
        }
    }

    /// The packed array behind this store.
    pub fn packed(&self) -> &Packed<C> { &self.packed }

    /// The index behind this store.
    pub fn index(&self) -> &Tree<K, Slot> { &self.index }

    /// Formats the entity IDs in each leaf of the index.
    pub fn leaves(&self) -> Leaves<'_, K, Slot> { self.index.leaves() }
}

impl<K: entity::Raw, C: fmt::Debug> fmt::Debug for Store<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: entity::Raw, C: Send + Sync + 'static> Storage for Store<K, C> {
    type RawEntity = K;
    type Comp = C;

    fn get(&self, id: K) -> Option<&C> { Store::get(self, id) }

    fn get_mut(&mut self, id: K) -> Option<&mut C> { Store::get_mut(self, id) }

    fn set(&mut self, id: K, value: Option<C>) -> Option<C> {
        match value {
            Some(value) => self.upsert(id, value),
            None => self.remove(id),
        }
    }

    fn cardinality(&self) -> usize { self.len() }

    type Iter<'t> = Iter<'t, K, C> where Self: 't;
    fn iter(&self) -> Self::Iter<'_> { Store::iter(self) }

    type IterMut<'t> = IterMut<'t, K, C> where Self: 't;
    fn iter_mut(&mut self) -> Self::IterMut<'_> { Store::iter_mut(self) }
}

/// Return value of [`Store::iter`] and [`Store::range`].
pub struct Iter<'t, K, C> {
    entries: tree::Range<'t, K, Slot>,
    packed:  &'t Packed<C>,
}

impl<'t, K: entity::Raw, C> Iterator for Iter<'t, K, C> {
    type Item = (K, &'t C);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, slot) = self.entries.next()?;
        match self.packed.get(slot) {
            Some(value) => Some((key, value)),
            None => panic!("Index refers to free slot {slot:?}"),
        }
    }
}

impl<'t, K: entity::Raw, C> FusedIterator for Iter<'t, K, C> {}

/// Return value of [`Store::iter_mut`].
pub struct IterMut<'t, K, C> {
    entries: tree::Range<'t, K, Slot>,
    /// Points into the packed array, which is mutably borrowed for `'t`.
    base:    *mut MaybeUninit<C>,
    _ph:     PhantomData<&'t mut C>,
}

impl<'t, K: entity::Raw, C> Iterator for IterMut<'t, K, C> {
    type Item = (K, &'t mut C);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, slot) = self.entries.next()?;
        let value = unsafe {
            // Safety: every slot in the index is live and indexed by exactly one key,
            // so this reference is initialized and does not alias any other yielded reference.
            (*self.base.add(slot.index())).assume_init_mut()
        };
        Some((key, value))
    }
}

impl<'t, K: entity::Raw, C> FusedIterator for IterMut<'t, K, C> {}


#[cfg(test)]
super::tests::test_storage! {
    default: Store<std::num::NonZeroU32, i64> = Store::default();
    order_3: Store<std::num::NonZeroU32, i64> =
        Store::new(crate::config::Config::default().with_order(3)).unwrap();
    order_4: Store<std::num::NonZeroU32, i64> =
        Store::new(crate::config::Config::default().with_order(4)).unwrap();
    order_5: Store<std::num::NonZeroU32, i64> =
        Store::new(
            crate::config::Config::default().with_order(5).with_initial_capacity(0),
        )
        .unwrap();
}
