//! Stores for several component types, each behind its own lock.
//!
//! Stores are independent of each other,
//! so different threads may write to different stores at the same time.
//! Writers to the same store are serialized by the store lock.

use std::any::{self, Any, TypeId};
use std::ops;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{self, Config};
use crate::entity;
use crate::storage::{Meta, Store};


/// A set of component stores keyed by component type.
pub struct Registry<K: entity::Raw> {
    /// Ordered by registration.
    stores: IndexMap<TypeId, Entry<K>>,
}

struct Entry<K: entity::Raw> {
    meta:  Meta,
    /// Downcasts to `Store<K, C>`.
    store: RwLock<Box<dyn AnyStore<K>>>,
}

static_assertions::assert_impl_all!(Registry<std::num::NonZeroU32>: Send, Sync);

impl<K: entity::Raw> Default for Registry<K> {
    fn default() -> Self { Self { stores: IndexMap::new() } }
}

impl<K: entity::Raw> Registry<K> {
    /// Creates a store for component type `C`.
    ///
    /// # Panics
    /// Panics if `C` is already registered.
    pub fn register<C: Send + Sync + 'static>(
        &mut self,
        config: Config,
    ) -> Result<(), config::Error> {
        let meta = Meta::of::<C>();
        if self.stores.contains_key(&TypeId::of::<C>()) {
            panic!("Component type `{}` is already registered", meta.name);
        }

        let store = Store::<K, C>::new(config)?;
        self.stores.insert(
            TypeId::of::<C>(),
            Entry { meta, store: RwLock::new(Box::new(store) as Box<dyn AnyStore<K>>) },
        );

        log::debug!("Registered component type `{}` ({} bytes)", meta.name, meta.size);
        Ok(())
    }

    /// Returns `true` if `C` has a store in this registry.
    pub fn contains<C: 'static>(&self) -> bool { self.stores.contains_key(&TypeId::of::<C>()) }

    /// The number of registered component types.
    pub fn len(&self) -> usize { self.stores.len() }

    /// Returns `true` if no component type is registered.
    pub fn is_empty(&self) -> bool { self.stores.is_empty() }

    /// The identities of registered component types, in registration order.
    pub fn metas(&self) -> impl Iterator<Item = Meta> + '_ {
        self.stores.values().map(|entry| entry.meta)
    }

    fn entry<C: 'static>(&self) -> &Entry<K> {
        match self.stores.get(&TypeId::of::<C>()) {
            Some(entry) => entry,
            None => panic!("Component type `{}` is not registered", any::type_name::<C>()),
        }
    }

    /// Acquires a shared lock on the store of `C`.
    ///
    /// # Panics
    /// Panics if `C` is not registered or its store is locked exclusively.
    pub fn read<C: Send + Sync + 'static>(&self) -> impl ops::Deref<Target = Store<K, C>> + '_ {
        match self.entry::<C>().store.try_read() {
            Some(store) => RwLockReadGuard::map(store, |store| store.downcast_ref::<C>()),
            None => panic!(
                "Store for `{}` is locked exclusively. Is another writer still running?",
                any::type_name::<C>(),
            ),
        }
    }

    /// Acquires an exclusive lock on the store of `C`.
    ///
    /// # Panics
    /// Panics if `C` is not registered or its store is already locked.
    pub fn write<C: Send + Sync + 'static>(&self) -> impl ops::DerefMut<Target = Store<K, C>> + '_ {
        match self.entry::<C>().store.try_write() {
            Some(store) => RwLockWriteGuard::map(store, |store| store.downcast_mut::<C>()),
            None => panic!(
                "Store for `{}` is already locked. Is another reader or writer still running?",
                any::type_name::<C>(),
            ),
        }
    }

    /// Gets the store of `C` without locking, since the registry is borrowed exclusively.
    ///
    /// # Panics
    /// Panics if `C` is not registered.
    pub fn get_mut<C: Send + Sync + 'static>(&mut self) -> &mut Store<K, C> {
        let entry = match self.stores.get_mut(&TypeId::of::<C>()) {
            Some(entry) => entry,
            None => panic!("Component type `{}` is not registered", any::type_name::<C>()),
        };
        entry.store.get_mut().downcast_mut::<C>()
    }

    /// Removes the components of an entity from every store.
    ///
    /// Returns the number of components removed.
    pub fn remove_entity(&mut self, key: K) -> usize {
        let removed = self
            .stores
            .values_mut()
            .map(|entry| entry.store.get_mut().remove_entity(key))
            .filter(|&removed| removed)
            .count();
        log::trace!("Removed {removed} components of entity {key:?}");
        removed
    }
}

trait AnyStore<K: entity::Raw>: Send + Sync {
    fn as_any(&self) -> &(dyn Any + Send + Sync);

    fn as_any_mut(&mut self) -> &mut (dyn Any + Send + Sync);

    /// Removes the component of an entity, returning whether it existed.
    fn remove_entity(&mut self, key: K) -> bool;
}

impl<K: entity::Raw> dyn AnyStore<K> {
    fn downcast_ref<C: Send + Sync + 'static>(&self) -> &Store<K, C> {
        self.as_any().downcast_ref::<Store<K, C>>().expect("TypeId mismatch")
    }

    fn downcast_mut<C: Send + Sync + 'static>(&mut self) -> &mut Store<K, C> {
        self.as_any_mut().downcast_mut::<Store<K, C>>().expect("TypeId mismatch")
    }
}

impl<K: entity::Raw, C: Send + Sync + 'static> AnyStore<K> for Store<K, C> {
    fn as_any(&self) -> &(dyn Any + Send + Sync) { self }

    fn as_any_mut(&mut self) -> &mut (dyn Any + Send + Sync) { self }

    fn remove_entity(&mut self, key: K) -> bool { self.remove(key).is_some() }
}
